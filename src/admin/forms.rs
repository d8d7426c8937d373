//! Admin form submission
//!
//! A submission is parsed into a candidate record without touching the store. The
//! candidate's bindings are checked by the same `CardinalityValidator` the store
//! uses, with form wording, before the store's own pre-persist hook runs on save.
//! Inline child rows ride along on the parent's payload and are stored only after
//! the parent itself is saved.

use super::{refers_to, AdminSite, InlineAdmin, ModelAdmin};
use crate::domain::models::{
    Binding, Blog, Category, Certificate, EntityId, EntityKind, Note, Project, Tag,
};
use crate::domain::violations::{
    CardinalityViolation, PortfolioError, PortfolioResult, ValidationErrors,
};
use crate::store::{PortfolioStore, Stored};
use crate::validation::CardinalityValidator;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Field-keyed messages returned for an invalid submission
pub type FormErrors = ValidationErrors;

/// Submitted form payload; a field may carry several values
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    values: BTreeMap<String, Vec<String>>,
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value to a field
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.values.entry(field.into()).or_default().push(value.into());
    }

    /// Builder form of `insert`
    pub fn with(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(field, value);
        self
    }

    /// First value of a field
    pub fn get(&self, field: &str) -> Option<&str> {
        self.get_all(field).first().map(String::as_str)
    }

    /// Every value of a field
    pub fn get_all(&self, field: &str) -> &[String] {
        self.values.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, field: &str) -> bool {
        self.values.contains_key(field)
    }

    /// Checkbox semantics: absent means unchecked
    pub fn checked(&self, field: &str) -> bool {
        self.get(field).is_some_and(parse_bool)
    }

    /// Submitted field names
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Fields starting with `prefix`, with the prefix stripped
    pub fn scoped(&self, prefix: &str) -> FormData {
        let values = self
            .values
            .iter()
            .filter_map(|(field, values)| {
                field.strip_prefix(prefix).map(|rest| (rest.to_string(), values.clone()))
            })
            .collect();
        FormData { values }
    }

    /// Indices of the inline rows submitted as `<prefix>-<index>-<field>`
    pub fn row_indices(&self, prefix: &str) -> BTreeSet<usize> {
        self.fields()
            .filter_map(|field| field.strip_prefix(prefix)?.strip_prefix('-'))
            .filter_map(|rest| rest.split_once('-'))
            .filter_map(|(index, _)| index.parse().ok())
            .collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FormData {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut data = Self::new();
        for (field, value) in iter {
            data.insert(field, value);
        }
        data
    }
}

/// Whether a submitted value means "checked"
pub fn parse_bool(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "on" | "true" | "1" | "yes")
}

/// Result of a form submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum FormOutcome {
    /// The record passed every check and was stored
    Saved { id: EntityId },
    /// Nothing was stored
    Invalid(FormErrors),
}

impl FormOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, Self::Saved { .. })
    }

    pub fn errors(&self) -> Option<&FormErrors> {
        match self {
            Self::Invalid(errors) => Some(errors),
            Self::Saved { .. } => None,
        }
    }
}

/// Form wording of a cardinality violation, e.g. "You can select a maximum of 3 technologies."
pub fn form_message(admin: &ModelAdmin, violation: &CardinalityViolation) -> String {
    format!(
        "You can select a maximum of {} {}.",
        violation.max_count,
        admin.choice_label(&violation.binding_name)
    )
}

/// Typed access to a payload, collecting parse errors
pub struct FormReader<'a> {
    data: &'a FormData,
    errors: FormErrors,
}

impl<'a> FormReader<'a> {
    pub fn new(data: &'a FormData) -> Self {
        Self { data, errors: FormErrors::new() }
    }

    /// Trimmed text; blank counts as absent
    pub fn text(&self, field: &str) -> Option<String> {
        self.data
            .get(field)
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_string)
    }

    pub fn checkbox(&self, field: &str) -> bool {
        self.data.checked(field)
    }

    /// `YYYY-MM-DD` date
    pub fn date(&mut self, field: &str) -> Option<NaiveDate> {
        let text = self.text(field)?;
        match NaiveDate::parse_from_str(&text, "%Y-%m-%d") {
            Ok(date) => Some(date),
            Err(_) => {
                self.errors.add(field, "Enter a valid date.");
                None
            }
        }
    }

    /// Single selected id
    pub fn reference(&mut self, field: &str) -> Option<EntityId> {
        let text = self.text(field)?;
        match text.parse() {
            Ok(id) => Some(id),
            Err(_) => {
                self.errors.add(
                    field,
                    "Select a valid choice. That choice is not one of the available choices.",
                );
                None
            }
        }
    }

    /// Every selected id; repeats collapse
    pub fn references(&mut self, field: &str) -> Binding {
        let mut selected = Binding::new();
        for value in self.data.get_all(field) {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            match value.parse() {
                Ok(id) => {
                    selected.insert(id);
                }
                Err(_) => self.errors.add(field, format!("\"{value}\" is not a valid value.")),
            }
        }
        selected
    }

    pub fn into_errors(self) -> FormErrors {
        self.errors
    }
}

/// Records that can be edited through an admin form
pub trait FormModel: Stored {
    /// Record used for an "add" form
    fn blank() -> Self;

    /// Overwrite every form-editable field from the payload
    fn apply_form(&mut self, form: &mut FormReader<'_>);
}

impl FormModel for Tag {
    fn blank() -> Self {
        Tag::new("")
    }

    fn apply_form(&mut self, form: &mut FormReader<'_>) {
        self.name = form.text("name").unwrap_or_default();
    }
}

impl FormModel for Category {
    fn blank() -> Self {
        Category::new("")
    }

    fn apply_form(&mut self, form: &mut FormReader<'_>) {
        self.name = form.text("name").unwrap_or_default();
    }
}

impl FormModel for Certificate {
    fn blank() -> Self {
        Certificate::new("")
    }

    fn apply_form(&mut self, form: &mut FormReader<'_>) {
        self.name = form.text("name").unwrap_or_default();
        self.category = form.reference("category");
        self.tags = form.references("tags");
    }
}

impl FormModel for Blog {
    fn blank() -> Self {
        Blog { read_date: None, ..Blog::new("", NaiveDate::MIN) }
    }

    fn apply_form(&mut self, form: &mut FormReader<'_>) {
        self.name = form.text("name").unwrap_or_default();
        self.short_description = form.text("short_description");
        self.read_date = form.date("read_date");
        self.categories = form.references("categories");
        self.tags = form.references("tags");
        self.self_blog = form.checkbox("self_blog");
        self.blog_url = form.text("blog_url");
    }
}

impl FormModel for Note {
    fn blank() -> Self {
        Note { id: None, blog: None, note_body: String::new(), tag: None }
    }

    fn apply_form(&mut self, form: &mut FormReader<'_>) {
        self.blog = form.reference("blog");
        self.note_body = form.text("note_body").unwrap_or_default();
        self.tag = form.reference("tag");
    }
}

impl FormModel for Project {
    fn blank() -> Self {
        Project::default()
    }

    fn apply_form(&mut self, form: &mut FormReader<'_>) {
        self.name = form.text("name");
        self.short_description = form.text("short_description").unwrap_or_default();
        self.technologies = form.references("technologies");
        self.fields = form.references("fields");
        self.start_date = form.date("start_date");
        self.in_development = form.checkbox("in_development");
        self.end_date = form.date("end_date");
        self.repo_url = form.text("repo_url");
    }
}

/// Parse, validate and, when everything passes, store one submission
pub fn submit<R: FormModel>(
    store: &mut PortfolioStore,
    admin: &ModelAdmin,
    instance: Option<EntityId>,
    data: &FormData,
) -> PortfolioResult<FormOutcome> {
    let mut record = match instance {
        Some(id) => store
            .get::<R>(id)
            .cloned()
            .ok_or_else(|| PortfolioError::not_found(R::KIND, id))?,
        None => R::blank(),
    };

    let mut form = FormReader::new(data);
    record.apply_form(&mut form);
    let mut errors = form.into_errors();

    if admin.cardinality_form {
        let candidate = record.bindings();
        for violation in
            CardinalityValidator::violations(record.id(), &candidate, store.constraints_for(R::KIND))
        {
            errors.add(violation.binding_name.clone(), form_message(admin, &violation));
        }
    }

    // Model checks only add to fields the form has not already rejected
    for (field, messages) in store.full_clean(&record).iter() {
        if !errors.has_field(field) {
            for message in messages {
                errors.add(field, message.clone());
            }
        }
    }

    let mut inline_commits = Vec::with_capacity(admin.inlines.len());
    for inline in admin.inlines {
        inline_commits.push(inline_formset(store, inline, record.id(), data, &mut errors));
    }

    if !errors.is_empty() {
        tracing::info!(kind = %R::KIND, "Form submission rejected: {}", errors);
        return Ok(FormOutcome::Invalid(errors));
    }

    let id = match store.save(record) {
        Ok(id) => id,
        Err(PortfolioError::Validation(errors)) => return Ok(FormOutcome::Invalid(errors)),
        Err(e) => return Err(e),
    };
    for commit in inline_commits {
        commit(store, id)?;
    }
    Ok(FormOutcome::Saved { id })
}

/// Deferred write of validated inline rows, run once the parent has an id
type InlineCommit = Box<dyn FnOnce(&mut PortfolioStore, EntityId) -> PortfolioResult<()>>;

enum InlineChange<C> {
    Save(C),
    Delete(EntityId),
}

fn inline_formset(
    store: &PortfolioStore,
    inline: &InlineAdmin,
    parent: Option<EntityId>,
    data: &FormData,
    errors: &mut FormErrors,
) -> InlineCommit {
    match inline.kind {
        EntityKind::Tag => prepare_inline::<Tag>(store, inline, parent, data, errors),
        EntityKind::Category => prepare_inline::<Category>(store, inline, parent, data, errors),
        EntityKind::Certificate => {
            prepare_inline::<Certificate>(store, inline, parent, data, errors)
        }
        EntityKind::Blog => prepare_inline::<Blog>(store, inline, parent, data, errors),
        EntityKind::Note => prepare_inline::<Note>(store, inline, parent, data, errors),
        EntityKind::Project => prepare_inline::<Project>(store, inline, parent, data, errors),
    }
}

/// Parse and clean every submitted row of one inline; errors are keyed
/// `<prefix>-<index>-<field>`
fn prepare_inline<C: FormModel>(
    store: &PortfolioStore,
    inline: &InlineAdmin,
    parent: Option<EntityId>,
    data: &FormData,
    errors: &mut FormErrors,
) -> InlineCommit {
    let mut changes = Vec::new();

    for index in data.row_indices(inline.prefix) {
        let key = format!("{}-{index}-", inline.prefix);
        let row = data.scoped(&key);
        let mut form = FormReader::new(&row);

        let existing = form.reference("id");
        let mut child = match existing {
            Some(id) => match store.get::<C>(id) {
                Some(child) if parent.is_some_and(|p| refers_to(child, inline.fk_name, p)) => {
                    child.clone()
                }
                _ => {
                    errors.add(
                        format!("{key}id"),
                        "Select a valid choice. That choice is not one of the available choices.",
                    );
                    continue;
                }
            },
            // Untouched extra rows are ignored
            None if !inline.fields.iter().any(|field| form.text(field).is_some()) => continue,
            None => C::blank(),
        };

        if row.checked("DELETE") {
            if let Some(id) = existing {
                changes.push(InlineChange::Delete(id));
            }
            continue;
        }

        child.apply_form(&mut form);
        if let Some(slot) = child.reference_mut(inline.fk_name) {
            *slot = parent;
        }

        let mut row_errors = form.into_errors();
        for (field, messages) in store.full_clean(&child).iter() {
            // The parent reference is filled in on commit
            if field == inline.fk_name || row_errors.has_field(field) {
                continue;
            }
            for message in messages {
                row_errors.add(field, message.clone());
            }
        }
        for (field, messages) in row_errors.iter() {
            for message in messages {
                errors.add(format!("{key}{field}"), message.clone());
            }
        }

        changes.push(InlineChange::Save(child));
    }

    let fk_name = inline.fk_name;
    Box::new(move |store: &mut PortfolioStore, parent_id: EntityId| {
        for change in changes {
            match change {
                InlineChange::Save(mut child) => {
                    if let Some(slot) = child.reference_mut(fk_name) {
                        *slot = Some(parent_id);
                    }
                    store.save(child)?;
                }
                InlineChange::Delete(id) => {
                    store.delete(C::KIND, id)?;
                }
            }
        }
        Ok(())
    })
}

impl AdminSite {
    /// Submit a form for any registered kind
    pub fn submit(
        &self,
        store: &mut PortfolioStore,
        kind: EntityKind,
        instance: Option<EntityId>,
        data: &FormData,
    ) -> PortfolioResult<FormOutcome> {
        let admin = self.admin(kind)?;
        match kind {
            EntityKind::Tag => submit::<Tag>(store, admin, instance, data),
            EntityKind::Category => submit::<Category>(store, admin, instance, data),
            EntityKind::Certificate => submit::<Certificate>(store, admin, instance, data),
            EntityKind::Blog => submit::<Blog>(store, admin, instance, data),
            EntityKind::Note => submit::<Note>(store, admin, instance, data),
            EntityKind::Project => submit::<Project>(store, admin, instance, data),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AdminConfig, ConfigBuilder, PortfolioConfig};
    use rstest::rstest;

    struct Fixture {
        store: PortfolioStore,
        site: AdminSite,
        tags: Vec<EntityId>,
        categories: Vec<EntityId>,
    }

    fn fixture_with(config: &PortfolioConfig) -> Fixture {
        let mut store = PortfolioStore::new(config);
        let tags = (0..5).map(|i| store.save(Tag::new(format!("Tag {i}"))).unwrap()).collect();
        let categories =
            (0..5).map(|i| store.save(Category::new(format!("Cat {i}"))).unwrap()).collect();
        Fixture { store, site: AdminSite::default_site(AdminConfig::default()), tags, categories }
    }

    fn fixture() -> Fixture {
        fixture_with(&PortfolioConfig::default())
    }

    fn select(data: FormData, field: &str, ids: &[EntityId]) -> FormData {
        ids.iter().fold(data, |data, id| data.with(field, id.to_string()))
    }

    #[test]
    fn test_max_three_validation_in_admin() {
        let mut fx = fixture();
        let data = FormData::new()
            .with("name", "Overlimit Project")
            .with("short_description", "Testing admin validation")
            .with("in_development", "on")
            .with("_save", "Save");
        let data = select(data, "technologies", &fx.tags[..4]);
        let data = select(data, "fields", &fx.categories[..2]);

        let outcome = fx.site.submit(&mut fx.store, EntityKind::Project, None, &data).unwrap();

        let errors = outcome.errors().unwrap();
        assert_eq!(
            errors.field("technologies"),
            ["You can select a maximum of 3 technologies.".to_string()]
        );
        assert_eq!(fx.store.count(EntityKind::Project), 0);
    }

    #[test]
    fn test_valid_project_admin_submission() {
        let mut fx = fixture();
        let data = FormData::new()
            .with("name", "Valid Admin Project")
            .with("short_description", "This should work");
        let data = select(data, "technologies", &fx.tags[..3]);
        let data = select(data, "fields", &fx.categories[..1]);

        let outcome = fx.site.submit(&mut fx.store, EntityKind::Project, None, &data).unwrap();
        let id = match outcome {
            FormOutcome::Saved { id } => id,
            FormOutcome::Invalid(errors) => panic!("expected a saved project, got {errors}"),
        };

        let project: &Project = fx.store.get(id).unwrap();
        assert_eq!(project.name.as_deref(), Some("Valid Admin Project"));
        assert_eq!(project.technologies.len(), 3);
        assert!(!project.in_development);
    }

    #[test]
    fn test_both_bindings_reported() {
        let mut fx = fixture();
        let data = select(FormData::new().with("name", "Greedy"), "technologies", &fx.tags[..4]);
        let data = select(data, "fields", &fx.categories);

        let outcome = fx.site.submit(&mut fx.store, EntityKind::Project, None, &data).unwrap();
        let errors = outcome.errors().unwrap();
        assert_eq!(
            errors.field("fields"),
            ["You can select a maximum of 3 fields (categories).".to_string()]
        );
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_repeated_selection_collapses() {
        let mut fx = fixture();
        let tag = fx.tags[0].to_string();
        let data = FormData::new()
            .with("name", "Dupes")
            .with("technologies", &tag)
            .with("technologies", &tag)
            .with("technologies", &tag)
            .with("technologies", &tag);

        let outcome = fx.site.submit(&mut fx.store, EntityKind::Project, None, &data).unwrap();
        assert!(outcome.is_saved());
    }

    #[test]
    fn test_editing_existing_project() {
        let mut fx = fixture();
        let id = fx
            .store
            .save(Project::new("Existing").with_technologies(fx.tags[..3].iter().copied()))
            .unwrap();

        let data = select(FormData::new().with("name", "Existing"), "technologies", &fx.tags[..4]);
        let outcome = fx.site.submit(&mut fx.store, EntityKind::Project, Some(id), &data).unwrap();
        assert!(!outcome.is_saved());

        let stored: &Project = fx.store.get(id).unwrap();
        assert_eq!(stored.technologies.len(), 3);

        let missing = fx.site.submit(&mut fx.store, EntityKind::Project, Some(EntityId(99)), &data);
        assert!(matches!(missing, Err(PortfolioError::NotFound { .. })));
    }

    #[test]
    fn test_store_hook_catches_kinds_without_form_rule() {
        let config = ConfigBuilder::new().constraint(EntityKind::Blog, "tags", 1).build().unwrap();
        let mut fx = fixture_with(&config);
        let data = FormData::new().with("name", "Too tagged").with("read_date", "2024-04-01");
        let data = select(data, "tags", &fx.tags[..2]);

        let outcome = fx.site.submit(&mut fx.store, EntityKind::Blog, None, &data).unwrap();
        assert_eq!(
            outcome.errors().unwrap().field("tags"),
            ["A blog can have at most 1 tags.".to_string()]
        );
    }

    #[test]
    fn test_parse_errors_are_reported() {
        let mut fx = fixture();
        let data = FormData::new()
            .with("name", "Bad input")
            .with("start_date", "yesterday")
            .with("technologies", "abc")
            .with("repo_url", "not a url");

        let outcome = fx.site.submit(&mut fx.store, EntityKind::Project, None, &data).unwrap();
        let errors = outcome.errors().unwrap();
        assert_eq!(errors.field("start_date"), ["Enter a valid date.".to_string()]);
        assert_eq!(errors.field("technologies"), ["\"abc\" is not a valid value.".to_string()]);
        assert_eq!(errors.field("repo_url"), ["Enter a valid URL.".to_string()]);
    }

    #[test]
    fn test_note_form() {
        let mut fx = fixture();
        let blog = fx
            .store
            .save(Blog::new("Traits", NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()))
            .unwrap();

        let data = FormData::from_iter([("blog", blog.to_string()), ("note_body", String::new())]);
        let outcome = fx.site.submit(&mut fx.store, EntityKind::Note, None, &data).unwrap();
        assert_eq!(
            outcome.errors().unwrap().field("note_body"),
            ["This field is required.".to_string()]
        );

        let data = FormData::from_iter([("blog", blog.to_string()), ("note_body", "dyn vs impl".into())]);
        assert!(fx.site.submit(&mut fx.store, EntityKind::Note, None, &data).unwrap().is_saved());
    }

    fn blog_form(name: &str) -> FormData {
        FormData::new().with("name", name).with("read_date", "2024-03-01")
    }

    #[test]
    fn test_blog_form_saves_inline_notes_after_the_blog() {
        let mut fx = fixture();
        let data = blog_form("Async Rust")
            .with("notes-0-note_body", "Pin is about addresses")
            .with("notes-0-tag", fx.tags[0].to_string())
            .with("notes-1-note_body", "")
            .with("notes-1-tag", "");

        let outcome = fx.site.submit(&mut fx.store, EntityKind::Blog, None, &data).unwrap();
        let blog = match outcome {
            FormOutcome::Saved { id } => id,
            FormOutcome::Invalid(errors) => panic!("expected a saved blog, got {errors}"),
        };

        let notes: Vec<&Note> = fx.store.notes_for(blog).collect();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].note_body, "Pin is about addresses");
        assert_eq!(notes[0].tag, Some(fx.tags[0]));
    }

    #[test]
    fn test_invalid_inline_row_blocks_the_whole_submission() {
        let mut fx = fixture();
        let data = blog_form("Too long")
            .with("notes-0-note_body", "n".repeat(751))
            .with("notes-1-note_body", "fine")
            .with("notes-1-tag", "99");

        let outcome = fx.site.submit(&mut fx.store, EntityKind::Blog, None, &data).unwrap();
        let errors = outcome.errors().unwrap();
        assert_eq!(
            errors.field("notes-0-note_body"),
            ["Ensure this value has at most 750 characters (it has 751).".to_string()]
        );
        assert_eq!(
            errors.field("notes-1-tag"),
            ["tag instance with id 99 does not exist.".to_string()]
        );
        assert_eq!(fx.store.count(EntityKind::Blog), 0);
        assert_eq!(fx.store.count(EntityKind::Note), 0);
    }

    #[test]
    fn test_blog_form_edits_and_deletes_existing_notes() {
        let mut fx = fixture();
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let blog = fx.store.save(Blog::new("Lifetimes", date)).unwrap();
        let other = fx.store.save(Blog::new("Macros", date)).unwrap();
        let kept = fx.store.save(Note::new(blog, "first draft")).unwrap();
        let stale = fx.store.save(Note::new(blog, "obsolete")).unwrap();
        let foreign = fx.store.save(Note::new(other, "not yours")).unwrap();

        let data = blog_form("Lifetimes")
            .with("notes-0-id", kept.to_string())
            .with("notes-0-note_body", "second draft")
            .with("notes-1-id", stale.to_string())
            .with("notes-1-note_body", "obsolete")
            .with("notes-1-DELETE", "on");
        let outcome = fx.site.submit(&mut fx.store, EntityKind::Blog, Some(blog), &data).unwrap();
        assert!(outcome.is_saved());

        let note: &Note = fx.store.get(kept).unwrap();
        assert_eq!(note.note_body, "second draft");
        assert!(fx.store.get::<Note>(stale).is_none());

        let data = blog_form("Lifetimes")
            .with("notes-0-id", foreign.to_string())
            .with("notes-0-note_body", "hijacked");
        let outcome = fx.site.submit(&mut fx.store, EntityKind::Blog, Some(blog), &data).unwrap();
        assert_eq!(
            outcome.errors().unwrap().field("notes-0-id"),
            ["Select a valid choice. That choice is not one of the available choices.".to_string()]
        );
        let note: &Note = fx.store.get(foreign).unwrap();
        assert_eq!(note.note_body, "not yours");
    }

    #[test]
    fn test_row_indices() {
        let data = FormData::new()
            .with("notes-0-note_body", "a")
            .with("notes-2-tag", "1")
            .with("notes-TOTAL_FORMS", "3")
            .with("notesx-1-tag", "1");
        assert_eq!(data.row_indices("notes").into_iter().collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(data.scoped("notes-2-").get("tag"), Some("1"));
    }

    #[rstest]
    #[case("technologies", "You can select a maximum of 3 technologies.")]
    #[case("fields", "You can select a maximum of 3 fields (categories).")]
    fn test_form_message_wording(#[case] binding: &str, #[case] expected: &str) {
        let site = AdminSite::default_site(AdminConfig::default());
        let admin = site.get(EntityKind::Project).unwrap();
        assert_eq!(form_message(admin, &CardinalityViolation::new(binding, 3, 4)), expected);
    }

    #[rstest]
    #[case("on", true)]
    #[case("TRUE", true)]
    #[case("1", true)]
    #[case("yes", true)]
    #[case("off", false)]
    #[case("", false)]
    fn test_parse_bool(#[case] value: &str, #[case] expected: bool) {
        assert_eq!(parse_bool(value), expected);
    }
}
