//! Portfolio records and the relations between them
//!
//! Architecture: Domain Model - Records describe their own fields and relations
//! - Every record exposes its fields by name so generic layers (cleaning, admin
//!   change lists, the store) never special-case a concrete type
//! - Many-to-many relations are held locally as id sets, so a record that was
//!   never stored still carries its full bindings

use crate::validation::fields::{FieldCheck, FieldSpec};
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Opaque record identifier assigned by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EntityId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(EntityId)
    }
}

/// A set-valued relation: unordered, duplicates collapse
pub type Binding = BTreeSet<EntityId>;

/// All bindings of one record, keyed by binding name
pub type Bindings = BTreeMap<String, Binding>;

/// The kinds of records managed by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Tag,
    Category,
    Certificate,
    Blog,
    Note,
    Project,
}

impl EntityKind {
    /// Every kind, in registration order
    pub const ALL: [EntityKind; 6] = [
        Self::Tag,
        Self::Category,
        Self::Certificate,
        Self::Blog,
        Self::Note,
        Self::Project,
    ];

    /// Machine name
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tag => "tag",
            Self::Category => "category",
            Self::Certificate => "certificate",
            Self::Blog => "blog",
            Self::Note => "note",
            Self::Project => "project",
        }
    }

    /// Plural label used in messages and listings
    pub fn plural(self) -> &'static str {
        match self {
            Self::Tag => "tags",
            Self::Category => "categories",
            Self::Certificate => "certificates",
            Self::Blog => "blogs",
            Self::Note => "notes",
            Self::Project => "projects",
        }
    }

    /// Many-to-many bindings declared on this kind, with their target kind
    pub fn bindings(self) -> &'static [(&'static str, EntityKind)] {
        match self {
            Self::Certificate => &[("tags", Self::Tag)],
            Self::Blog => &[("categories", Self::Category), ("tags", Self::Tag)],
            Self::Project => &[("technologies", Self::Tag), ("fields", Self::Category)],
            Self::Tag | Self::Category | Self::Note => &[],
        }
    }

    /// Single-valued references declared on this kind, with their target kind
    /// and what happens to the referencing record when the target is deleted
    pub fn foreign_keys(self) -> &'static [(&'static str, EntityKind, OnDelete)] {
        match self {
            Self::Certificate => &[("category", Self::Category, OnDelete::SetNull)],
            Self::Note => &[
                ("blog", Self::Blog, OnDelete::Cascade),
                ("tag", Self::Tag, OnDelete::SetNull),
            ],
            _ => &[],
        }
    }

    /// Target kind of a named binding
    pub fn binding_target(self, binding_name: &str) -> Option<EntityKind> {
        self.bindings()
            .iter()
            .find(|(name, _)| *name == binding_name)
            .map(|(_, target)| *target)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == wanted || kind.plural() == wanted)
            .ok_or_else(|| {
                format!(
                    "unknown record kind '{s}', expected one of: {}",
                    Self::ALL.map(|k| k.as_str()).join(", ")
                )
            })
    }
}

/// Effect of deleting a record on the records that reference it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnDelete {
    /// Referencing records are deleted too
    Cascade,
    /// The reference is cleared
    SetNull,
}

/// Borrowed view of one field value
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue<'a> {
    Text(Option<&'a str>),
    Date(Option<NaiveDate>),
    Bool(bool),
    Ref(EntityKind, Option<EntityId>),
    Refs(EntityKind, &'a Binding),
}

/// Name-based field access shared by every record
pub trait FieldAccess: Send + Sync {
    /// Kind of this record
    fn kind(&self) -> EntityKind;

    /// Identifier, absent until the record is first stored
    fn id(&self) -> Option<EntityId>;

    /// Value of a named field
    fn field_value(&self, name: &str) -> Option<FieldValue<'_>>;

    /// Human-readable label
    fn display_name(&self) -> String;
}

/// A storable portfolio record
pub trait Record: FieldAccess + Clone + Serialize + DeserializeOwned + 'static {
    const KIND: EntityKind;

    /// Assign the identifier chosen by the store
    fn set_id(&mut self, id: EntityId);

    /// Per-field cleaning table
    fn field_specs() -> &'static [FieldSpec] {
        &[]
    }

    /// Name that must be unique among records of this kind
    fn unique_name(&self) -> Option<&str> {
        None
    }

    /// Mutable access to a named binding
    fn binding_mut(&mut self, _name: &str) -> Option<&mut Binding> {
        None
    }

    /// Mutable access to a named single-valued reference
    fn reference_mut(&mut self, _name: &str) -> Option<&mut Option<EntityId>> {
        None
    }

    /// Fill store-managed values right before a write
    fn prepare_save(&mut self, _today: NaiveDate) {}

    /// Current bindings, materialised from the declared binding names
    fn bindings(&self) -> Bindings {
        Self::KIND
            .bindings()
            .iter()
            .filter_map(|(name, _)| match self.field_value(name) {
                Some(FieldValue::Refs(_, set)) => Some((name.to_string(), set.clone())),
                _ => None,
            })
            .collect()
    }

    /// Every record this one points at, as `(field, kind, id)`
    fn references(&self) -> Vec<(&'static str, EntityKind, EntityId)> {
        let mut refs = Vec::new();
        for (name, _, _) in Self::KIND.foreign_keys() {
            if let Some(FieldValue::Ref(target, Some(id))) = self.field_value(name) {
                refs.push((*name, target, id));
            }
        }
        for (name, _) in Self::KIND.bindings() {
            if let Some(FieldValue::Refs(target, set)) = self.field_value(name) {
                refs.extend(set.iter().map(|id| (*name, target, *id)));
            }
        }
        refs
    }
}

fn default_true() -> bool {
    true
}

/// A technology or topic label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: Option<EntityId>,
    pub name: String,
}

impl Tag {
    pub fn new(name: impl Into<String>) -> Self {
        Self { id: None, name: name.into() }
    }
}

impl FieldAccess for Tag {
    fn kind(&self) -> EntityKind {
        EntityKind::Tag
    }

    fn id(&self) -> Option<EntityId> {
        self.id
    }

    fn field_value(&self, name: &str) -> Option<FieldValue<'_>> {
        match name {
            "name" => Some(FieldValue::Text(Some(&self.name))),
            _ => None,
        }
    }

    fn display_name(&self) -> String {
        self.name.clone()
    }
}

impl Record for Tag {
    const KIND: EntityKind = EntityKind::Tag;

    fn set_id(&mut self, id: EntityId) {
        self.id = Some(id);
    }

    fn field_specs() -> &'static [FieldSpec] {
        &[FieldSpec { name: "name", checks: &[FieldCheck::Required, FieldCheck::MaxLength(50)] }]
    }

    fn unique_name(&self) -> Option<&str> {
        Some(&self.name)
    }
}

/// A subject area
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: Option<EntityId>,
    pub name: String,
}

impl Category {
    pub fn new(name: impl Into<String>) -> Self {
        Self { id: None, name: name.into() }
    }
}

impl FieldAccess for Category {
    fn kind(&self) -> EntityKind {
        EntityKind::Category
    }

    fn id(&self) -> Option<EntityId> {
        self.id
    }

    fn field_value(&self, name: &str) -> Option<FieldValue<'_>> {
        match name {
            "name" => Some(FieldValue::Text(Some(&self.name))),
            _ => None,
        }
    }

    fn display_name(&self) -> String {
        self.name.clone()
    }
}

impl Record for Category {
    const KIND: EntityKind = EntityKind::Category;

    fn set_id(&mut self, id: EntityId) {
        self.id = Some(id);
    }

    fn field_specs() -> &'static [FieldSpec] {
        &[FieldSpec { name: "name", checks: &[FieldCheck::Required, FieldCheck::MaxLength(150)] }]
    }

    fn unique_name(&self) -> Option<&str> {
        Some(&self.name)
    }
}

/// An earned certificate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    pub id: Option<EntityId>,
    pub name: String,
    #[serde(default)]
    pub category: Option<EntityId>,
    /// Set by the store on first save
    #[serde(default)]
    pub upload_date: Option<NaiveDate>,
    #[serde(default)]
    pub tags: Binding,
}

impl Certificate {
    pub fn new(name: impl Into<String>) -> Self {
        Self { id: None, name: name.into(), category: None, upload_date: None, tags: Binding::new() }
    }
}

impl FieldAccess for Certificate {
    fn kind(&self) -> EntityKind {
        EntityKind::Certificate
    }

    fn id(&self) -> Option<EntityId> {
        self.id
    }

    fn field_value(&self, name: &str) -> Option<FieldValue<'_>> {
        match name {
            "name" => Some(FieldValue::Text(Some(&self.name))),
            "category" => Some(FieldValue::Ref(EntityKind::Category, self.category)),
            "upload_date" => Some(FieldValue::Date(self.upload_date)),
            "tags" => Some(FieldValue::Refs(EntityKind::Tag, &self.tags)),
            _ => None,
        }
    }

    fn display_name(&self) -> String {
        self.name.clone()
    }
}

impl Record for Certificate {
    const KIND: EntityKind = EntityKind::Certificate;

    fn set_id(&mut self, id: EntityId) {
        self.id = Some(id);
    }

    fn field_specs() -> &'static [FieldSpec] {
        &[FieldSpec { name: "name", checks: &[FieldCheck::Required, FieldCheck::MaxLength(200)] }]
    }

    fn binding_mut(&mut self, name: &str) -> Option<&mut Binding> {
        match name {
            "tags" => Some(&mut self.tags),
            _ => None,
        }
    }

    fn reference_mut(&mut self, name: &str) -> Option<&mut Option<EntityId>> {
        match name {
            "category" => Some(&mut self.category),
            _ => None,
        }
    }

    fn prepare_save(&mut self, today: NaiveDate) {
        self.upload_date.get_or_insert(today);
    }
}

/// A blog entry, written or read
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blog {
    pub id: Option<EntityId>,
    pub name: String,
    #[serde(default)]
    pub short_description: Option<String>,
    pub read_date: Option<NaiveDate>,
    #[serde(default)]
    pub categories: Binding,
    #[serde(default)]
    pub tags: Binding,
    #[serde(default)]
    pub self_blog: bool,
    #[serde(default)]
    pub blog_url: Option<String>,
}

impl Blog {
    pub fn new(name: impl Into<String>, read_date: NaiveDate) -> Self {
        Self {
            id: None,
            name: name.into(),
            short_description: None,
            read_date: Some(read_date),
            categories: Binding::new(),
            tags: Binding::new(),
            self_blog: false,
            blog_url: None,
        }
    }
}

impl FieldAccess for Blog {
    fn kind(&self) -> EntityKind {
        EntityKind::Blog
    }

    fn id(&self) -> Option<EntityId> {
        self.id
    }

    fn field_value(&self, name: &str) -> Option<FieldValue<'_>> {
        match name {
            "name" => Some(FieldValue::Text(Some(&self.name))),
            "short_description" => Some(FieldValue::Text(self.short_description.as_deref())),
            "read_date" => Some(FieldValue::Date(self.read_date)),
            "categories" => Some(FieldValue::Refs(EntityKind::Category, &self.categories)),
            "tags" => Some(FieldValue::Refs(EntityKind::Tag, &self.tags)),
            "self_blog" => Some(FieldValue::Bool(self.self_blog)),
            "blog_url" => Some(FieldValue::Text(self.blog_url.as_deref())),
            _ => None,
        }
    }

    fn display_name(&self) -> String {
        self.name.clone()
    }
}

impl Record for Blog {
    const KIND: EntityKind = EntityKind::Blog;

    fn set_id(&mut self, id: EntityId) {
        self.id = Some(id);
    }

    fn field_specs() -> &'static [FieldSpec] {
        &[
            FieldSpec { name: "name", checks: &[FieldCheck::Required, FieldCheck::MaxLength(250)] },
            FieldSpec { name: "short_description", checks: &[FieldCheck::MaxLength(500)] },
            FieldSpec { name: "read_date", checks: &[FieldCheck::Required] },
            FieldSpec { name: "blog_url", checks: &[FieldCheck::MaxLength(200), FieldCheck::Url] },
        ]
    }

    fn binding_mut(&mut self, name: &str) -> Option<&mut Binding> {
        match name {
            "categories" => Some(&mut self.categories),
            "tags" => Some(&mut self.tags),
            _ => None,
        }
    }
}

/// A note attached to a blog entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: Option<EntityId>,
    pub blog: Option<EntityId>,
    pub note_body: String,
    #[serde(default)]
    pub tag: Option<EntityId>,
}

impl Note {
    pub fn new(blog: EntityId, note_body: impl Into<String>) -> Self {
        Self { id: None, blog: Some(blog), note_body: note_body.into(), tag: None }
    }
}

impl FieldAccess for Note {
    fn kind(&self) -> EntityKind {
        EntityKind::Note
    }

    fn id(&self) -> Option<EntityId> {
        self.id
    }

    fn field_value(&self, name: &str) -> Option<FieldValue<'_>> {
        match name {
            "blog" => Some(FieldValue::Ref(EntityKind::Blog, self.blog)),
            "note_body" => Some(FieldValue::Text(Some(&self.note_body))),
            "tag" => Some(FieldValue::Ref(EntityKind::Tag, self.tag)),
            _ => None,
        }
    }

    /// Without the store at hand only the blog id is known; the store
    /// resolves the blog name (see `PortfolioStore::display_name`).
    fn display_name(&self) -> String {
        match self.blog {
            Some(blog) => format!("Note for blog #{blog}"),
            None => "Note".to_string(),
        }
    }
}

impl Record for Note {
    const KIND: EntityKind = EntityKind::Note;

    fn set_id(&mut self, id: EntityId) {
        self.id = Some(id);
    }

    fn field_specs() -> &'static [FieldSpec] {
        &[
            FieldSpec { name: "blog", checks: &[FieldCheck::Required] },
            FieldSpec {
                name: "note_body",
                checks: &[FieldCheck::Required, FieldCheck::MaxLength(750)],
            },
        ]
    }

    fn reference_mut(&mut self, name: &str) -> Option<&mut Option<EntityId>> {
        match name {
            "blog" => Some(&mut self.blog),
            "tag" => Some(&mut self.tag),
            _ => None,
        }
    }
}

/// A portfolio project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: Option<EntityId>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub short_description: String,
    #[serde(default)]
    pub technologies: Binding,
    #[serde(default)]
    pub fields: Binding,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default = "default_true")]
    pub in_development: bool,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub repo_url: Option<String>,
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: Some(name.into()), ..Default::default() }
    }

    pub fn with_technologies(mut self, ids: impl IntoIterator<Item = EntityId>) -> Self {
        self.technologies = ids.into_iter().collect();
        self
    }

    pub fn with_fields(mut self, ids: impl IntoIterator<Item = EntityId>) -> Self {
        self.fields = ids.into_iter().collect();
        self
    }
}

impl Default for Project {
    fn default() -> Self {
        Self {
            id: None,
            name: None,
            short_description: String::new(),
            technologies: Binding::new(),
            fields: Binding::new(),
            start_date: None,
            in_development: true,
            end_date: None,
            repo_url: None,
        }
    }
}

impl FieldAccess for Project {
    fn kind(&self) -> EntityKind {
        EntityKind::Project
    }

    fn id(&self) -> Option<EntityId> {
        self.id
    }

    fn field_value(&self, name: &str) -> Option<FieldValue<'_>> {
        match name {
            "name" => Some(FieldValue::Text(self.name.as_deref())),
            "short_description" => Some(FieldValue::Text(Some(&self.short_description))),
            "technologies" => Some(FieldValue::Refs(EntityKind::Tag, &self.technologies)),
            "fields" => Some(FieldValue::Refs(EntityKind::Category, &self.fields)),
            "start_date" => Some(FieldValue::Date(self.start_date)),
            "in_development" => Some(FieldValue::Bool(self.in_development)),
            "end_date" => Some(FieldValue::Date(self.end_date)),
            "repo_url" => Some(FieldValue::Text(self.repo_url.as_deref())),
            _ => None,
        }
    }

    fn display_name(&self) -> String {
        match self.name.as_deref() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => "Unnamed Project".to_string(),
        }
    }
}

impl Record for Project {
    const KIND: EntityKind = EntityKind::Project;

    fn set_id(&mut self, id: EntityId) {
        self.id = Some(id);
    }

    fn field_specs() -> &'static [FieldSpec] {
        &[
            FieldSpec { name: "name", checks: &[FieldCheck::MaxLength(50)] },
            FieldSpec { name: "short_description", checks: &[FieldCheck::MaxLength(250)] },
            FieldSpec { name: "repo_url", checks: &[FieldCheck::MaxLength(200), FieldCheck::Url] },
        ]
    }

    fn binding_mut(&mut self, name: &str) -> Option<&mut Binding> {
        match name {
            "technologies" => Some(&mut self.technologies),
            "fields" => Some(&mut self.fields),
            _ => None,
        }
    }
}
