//! Admin registry and change-list queries
//!
//! Architectural Principle: Service Layer - The admin site describes how each kind is presented
//! - One `ModelAdmin` descriptor per registered kind: columns, filters, search, form layout
//! - Change lists evaluate search terms and filters against name-based field access
//! - Form submissions are handled in `forms`, which shares the store's cardinality rule

pub mod forms;

use crate::config::AdminConfig;
use crate::domain::models::{EntityId, EntityKind, FieldAccess, FieldValue};
use crate::domain::violations::{PortfolioError, PortfolioResult};
use crate::store::PortfolioStore;
use serde::Serialize;
use std::collections::BTreeMap;

/// Shown for empty cells
pub const EMPTY_VALUE_DISPLAY: &str = "-";

/// Computed column holding the shortened note body
pub const NOTE_BODY_EXCERPT: &str = "note_body_excerpt";

/// A titled group of form fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fieldset {
    pub title: &'static str,
    pub description: Option<&'static str>,
    pub fields: &'static [&'static str],
}

/// Child records edited on the parent's page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InlineAdmin {
    pub kind: EntityKind,
    /// Reference on the child pointing back to the parent
    pub fk_name: &'static str,
    /// Form keys of a row read `<prefix>-<index>-<field>`
    pub prefix: &'static str,
    /// Blank rows offered for new children
    pub extra: usize,
    pub fields: &'static [&'static str],
}

/// How one record kind is presented and edited
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelAdmin {
    pub kind: EntityKind,
    pub list_display: &'static [&'static str],
    pub list_filter: &'static [&'static str],
    pub search_fields: &'static [&'static str],
    /// Many-to-many fields edited with the side-by-side selector
    pub filter_horizontal: &'static [&'static str],
    pub fieldsets: &'static [Fieldset],
    pub inlines: &'static [InlineAdmin],
    /// Whether the form itself enforces the cardinality constraints
    pub cardinality_form: bool,
    /// Wording of a binding in form messages, when it is not the binding name
    pub choice_labels: &'static [(&'static str, &'static str)],
}

impl ModelAdmin {
    /// Plain descriptor listing the record's label
    pub fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            list_display: &["__str__"],
            list_filter: &[],
            search_fields: &[],
            filter_horizontal: &[],
            fieldsets: &[],
            inlines: &[],
            cardinality_form: false,
            choice_labels: &[],
        }
    }

    /// How a binding is named in form messages
    pub fn choice_label<'a>(&self, binding: &'a str) -> &'a str {
        self.choice_labels
            .iter()
            .find(|(name, _)| *name == binding)
            .map_or(binding, |(_, label)| *label)
    }

    /// Editable fields in form order
    pub fn form_fields(&self) -> Vec<&'static str> {
        if self.fieldsets.is_empty() {
            return default_form_fields(self.kind).to_vec();
        }
        self.fieldsets.iter().flat_map(|set| set.fields.iter().copied()).collect()
    }

    /// Column headers for the change list
    pub fn column_labels(&self) -> Vec<String> {
        self.list_display.iter().map(|column| column_label(self.kind, column)).collect()
    }
}

fn default_form_fields(kind: EntityKind) -> &'static [&'static str] {
    match kind {
        EntityKind::Tag | EntityKind::Category => &["name"],
        EntityKind::Certificate => &["name", "category", "tags"],
        EntityKind::Blog => {
            &["name", "short_description", "read_date", "categories", "tags", "self_blog", "blog_url"]
        }
        EntityKind::Note => &["blog", "note_body", "tag"],
        EntityKind::Project => &[
            "name",
            "short_description",
            "technologies",
            "fields",
            "start_date",
            "in_development",
            "end_date",
            "repo_url",
        ],
    }
}

/// Header text of one list column
pub fn column_label(kind: EntityKind, column: &str) -> String {
    match column {
        "__str__" => capitalize(kind.as_str()),
        NOTE_BODY_EXCERPT => "Note Content".to_string(),
        field => capitalize(&field.replace('_', " ")),
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// First `length` characters of `text`, with "..." appended when anything was cut
pub fn excerpt(text: &str, length: usize) -> String {
    if text.chars().count() > length {
        let mut short: String = text.chars().take(length).collect();
        short.push_str("...");
        short
    } else {
        text.to_string()
    }
}

/// Search, filter and paging parameters of a change list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeListQuery {
    /// Whitespace-separated terms; every term must match some search field
    pub search: Option<String>,
    /// `(field, value)` pairs, all of which must match
    pub filters: Vec<(String, String)>,
    /// 1-based page number
    pub page: usize,
}

impl ChangeListQuery {
    pub fn new() -> Self {
        Self { page: 1, ..Default::default() }
    }

    pub fn search(mut self, terms: impl Into<String>) -> Self {
        self.search = Some(terms.into());
        self
    }

    pub fn filter(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push((field.into(), value.into()));
        self
    }

    pub fn page(mut self, page: usize) -> Self {
        self.page = page;
        self
    }
}

/// One rendered change-list row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeListRow {
    pub id: EntityId,
    pub cells: Vec<String>,
}

/// A page of rendered records
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeList {
    pub kind: EntityKind,
    pub columns: Vec<String>,
    pub rows: Vec<ChangeListRow>,
    /// Matches across all pages
    pub total_matches: usize,
    pub page: usize,
    pub pages: usize,
}

/// One row of an inline formset; `id` is `None` for the blank extra rows
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineRow {
    pub id: Option<EntityId>,
    pub cells: Vec<String>,
}

/// Registry of `ModelAdmin`s
#[derive(Debug, Clone)]
pub struct AdminSite {
    registry: BTreeMap<EntityKind, ModelAdmin>,
    options: AdminConfig,
}

impl AdminSite {
    /// Empty site
    pub fn new(options: AdminConfig) -> Self {
        Self { registry: BTreeMap::new(), options }
    }

    /// Site with every portfolio kind registered
    pub fn default_site(options: AdminConfig) -> Self {
        let mut site = Self::new(options);
        for admin in default_admins() {
            site.register(admin).expect("default admins cover distinct kinds");
        }
        site
    }

    /// Register a descriptor; each kind can be registered once
    pub fn register(&mut self, admin: ModelAdmin) -> PortfolioResult<()> {
        if self.registry.contains_key(&admin.kind) {
            return Err(PortfolioError::config(format!(
                "The model {} is already registered",
                admin.kind
            )));
        }
        tracing::debug!(kind = %admin.kind, "Registered admin");
        self.registry.insert(admin.kind, admin);
        Ok(())
    }

    pub fn get(&self, kind: EntityKind) -> Option<&ModelAdmin> {
        self.registry.get(&kind)
    }

    pub fn is_registered(&self, kind: EntityKind) -> bool {
        self.registry.contains_key(&kind)
    }

    /// Registered descriptors in kind order
    pub fn registered(&self) -> impl Iterator<Item = &ModelAdmin> {
        self.registry.values()
    }

    pub fn options(&self) -> &AdminConfig {
        &self.options
    }

    fn admin(&self, kind: EntityKind) -> PortfolioResult<&ModelAdmin> {
        self.get(kind)
            .ok_or_else(|| PortfolioError::config(format!("The model {kind} is not registered")))
    }

    /// Run a change-list query
    pub fn changelist(
        &self,
        store: &PortfolioStore,
        kind: EntityKind,
        query: &ChangeListQuery,
    ) -> PortfolioResult<ChangeList> {
        let admin = self.admin(kind)?;

        for (field, _) in &query.filters {
            if !admin.list_filter.contains(&field.as_str()) {
                return Err(PortfolioError::form(format!(
                    "'{field}' is not a filter of {kind}; available: {}",
                    admin.list_filter.join(", ")
                )));
            }
        }

        let terms: Vec<String> = query
            .search
            .as_deref()
            .unwrap_or_default()
            .split_whitespace()
            .map(str::to_lowercase)
            .collect();
        if !terms.is_empty() && admin.search_fields.is_empty() {
            return Err(PortfolioError::form(format!("{kind} has no search fields")));
        }

        let matches: Vec<&dyn FieldAccess> = store
            .records(kind)
            .into_iter()
            .filter(|record| {
                query
                    .filters
                    .iter()
                    .all(|(field, value)| filter_matches(record.field_value(field), value))
            })
            .filter(|record| {
                terms.iter().all(|term| {
                    admin.search_fields.iter().any(|field| search_matches(store, *record, field, term))
                })
            })
            .collect();

        let per_page = self.options.list_per_page.max(1);
        let total_matches = matches.len();
        let pages = total_matches.div_ceil(per_page).max(1);
        let page = query.page.clamp(1, pages);

        let rows = matches
            .into_iter()
            .skip((page - 1) * per_page)
            .take(per_page)
            .filter_map(|record| {
                record.id().map(|id| ChangeListRow {
                    id,
                    cells: admin
                        .list_display
                        .iter()
                        .map(|column| self.render_cell(store, record, column))
                        .collect(),
                })
            })
            .collect();

        tracing::debug!(%kind, total_matches, page, "Change list built");
        Ok(ChangeList { kind, columns: admin.column_labels(), rows, total_matches, page, pages })
    }

    /// Inline formset rows for a parent record: existing children, then the extra blank rows
    pub fn inline_rows(
        &self,
        store: &PortfolioStore,
        parent: EntityKind,
        parent_id: EntityId,
    ) -> PortfolioResult<Vec<(InlineAdmin, Vec<InlineRow>)>> {
        let admin = self.admin(parent)?;
        if !store.contains(parent, parent_id) {
            return Err(PortfolioError::not_found(parent, parent_id));
        }

        let formsets = admin
            .inlines
            .iter()
            .map(|inline| {
                let mut rows: Vec<InlineRow> = store
                    .records(inline.kind)
                    .into_iter()
                    .filter(|child| refers_to(*child, inline.fk_name, parent_id))
                    .map(|child| InlineRow {
                        id: child.id(),
                        cells: inline
                            .fields
                            .iter()
                            .map(|field| self.render_cell(store, child, field))
                            .collect(),
                    })
                    .collect();
                rows.extend((0..inline.extra).map(|_| InlineRow {
                    id: None,
                    cells: vec![String::new(); inline.fields.len()],
                }));
                (*inline, rows)
            })
            .collect();

        Ok(formsets)
    }

    /// Text of one cell
    pub fn render_cell(&self, store: &PortfolioStore, record: &dyn FieldAccess, column: &str) -> String {
        match column {
            "__str__" => store.label(record),
            NOTE_BODY_EXCERPT => match record.field_value("note_body") {
                Some(FieldValue::Text(Some(body))) => excerpt(body, self.options.excerpt_length),
                _ => EMPTY_VALUE_DISPLAY.to_string(),
            },
            field => render_value(store, record.field_value(field)),
        }
    }
}

/// Whether `field` on `record` points at `target`
pub(crate) fn refers_to(record: &dyn FieldAccess, field: &str, target: EntityId) -> bool {
    matches!(record.field_value(field), Some(FieldValue::Ref(_, Some(id))) if id == target)
}

fn render_value(store: &PortfolioStore, value: Option<FieldValue<'_>>) -> String {
    let empty = || EMPTY_VALUE_DISPLAY.to_string();
    match value {
        Some(FieldValue::Text(Some(text))) if !text.is_empty() => text.to_string(),
        Some(FieldValue::Date(Some(date))) => date.format("%Y-%m-%d").to_string(),
        Some(FieldValue::Bool(flag)) => String::from(if flag { "True" } else { "False" }),
        Some(FieldValue::Ref(kind, Some(id))) => store.display_name(kind, id).unwrap_or_else(empty),
        Some(FieldValue::Refs(kind, set)) if !set.is_empty() => set
            .iter()
            .filter_map(|id| store.display_name(kind, *id))
            .collect::<Vec<_>>()
            .join(", "),
        _ => empty(),
    }
}

fn filter_matches(value: Option<FieldValue<'_>>, wanted: &str) -> bool {
    match value {
        Some(FieldValue::Bool(flag)) => forms::parse_bool(wanted) == flag,
        Some(FieldValue::Ref(_, id)) => match id {
            Some(id) => wanted.parse::<EntityId>().map(|w| w == id).unwrap_or(false),
            None => wanted.is_empty(),
        },
        Some(FieldValue::Refs(_, set)) => {
            wanted.parse::<EntityId>().map(|w| set.contains(&w)).unwrap_or(false)
        }
        Some(FieldValue::Date(date)) => {
            date.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default() == wanted
        }
        Some(FieldValue::Text(text)) => text.unwrap_or_default() == wanted,
        None => false,
    }
}

fn search_matches(store: &PortfolioStore, record: &dyn FieldAccess, field: &str, term: &str) -> bool {
    match record.field_value(field) {
        Some(FieldValue::Text(Some(text))) => text.to_lowercase().contains(term),
        Some(FieldValue::Ref(kind, Some(id))) => store
            .display_name(kind, id)
            .is_some_and(|name| name.to_lowercase().contains(term)),
        _ => false,
    }
}

/// Descriptors for every portfolio kind
pub fn default_admins() -> Vec<ModelAdmin> {
    vec![
        ModelAdmin {
            list_display: &["name"],
            search_fields: &["name"],
            ..ModelAdmin::new(EntityKind::Tag)
        },
        ModelAdmin {
            list_display: &["name"],
            search_fields: &["name"],
            ..ModelAdmin::new(EntityKind::Category)
        },
        ModelAdmin {
            list_display: &["name", "category", "upload_date"],
            list_filter: &["category", "upload_date"],
            filter_horizontal: &["tags"],
            ..ModelAdmin::new(EntityKind::Certificate)
        },
        ModelAdmin {
            list_display: &["name", "read_date", "self_blog"],
            list_filter: &["self_blog", "categories", "read_date"],
            search_fields: &["name", "short_description"],
            filter_horizontal: &["categories", "tags"],
            inlines: &[InlineAdmin {
                kind: EntityKind::Note,
                fk_name: "blog",
                prefix: "notes",
                extra: 1,
                fields: &["note_body", "tag"],
            }],
            ..ModelAdmin::new(EntityKind::Blog)
        },
        ModelAdmin {
            list_display: &["blog", "tag", NOTE_BODY_EXCERPT],
            list_filter: &["tag", "blog"],
            ..ModelAdmin::new(EntityKind::Note)
        },
        ModelAdmin {
            list_display: &["name", "start_date", "end_date", "in_development"],
            list_filter: &["in_development", "fields", "technologies"],
            search_fields: &["name", "short_description"],
            filter_horizontal: &["technologies", "fields"],
            fieldsets: &[
                Fieldset {
                    title: "Basic Information",
                    description: None,
                    fields: &["name", "short_description", "repo_url"],
                },
                Fieldset {
                    title: "Classification",
                    description: Some("Note: You can select a maximum of 3 items for each field below."),
                    fields: &["technologies", "fields"],
                },
                Fieldset {
                    title: "Timeline",
                    description: None,
                    fields: &["start_date", "end_date", "in_development"],
                },
            ],
            cardinality_form: true,
            choice_labels: &[("fields", "fields (categories)")],
            ..ModelAdmin::new(EntityKind::Project)
        },
    ]
}
