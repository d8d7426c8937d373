//! In-memory record store with a pre-persist validation hook
//!
//! Architecture: Repository - The store owns every record and guards every write
//! - `save` cleans fields, checks references and uniqueness, then runs the
//!   shared `CardinalityValidator`; any error aborts the write untouched
//! - Deletes follow each reference's cascade or set-null rule
//! - Snapshots persist the whole store as one checksummed JSON document

pub mod snapshot;

use crate::config::PortfolioConfig;
use crate::domain::models::{
    Blog, Category, Certificate, EntityId, EntityKind, FieldAccess, FieldValue, Note, OnDelete,
    Project, Record, Tag,
};
use crate::domain::violations::{
    CardinalityViolation, PortfolioError, PortfolioResult, RecordFinding, ValidationErrors,
    ValidationReport,
};
use crate::validation::fields::clean_fields;
use crate::validation::{CardinalityValidator, ConstraintSpec};
use chrono::Utc;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;

pub use snapshot::Snapshot;

/// Every table of the store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreData {
    /// Last identifier handed out per kind
    #[serde(default)]
    pub last_ids: BTreeMap<EntityKind, u64>,
    #[serde(default)]
    pub tags: BTreeMap<EntityId, Tag>,
    #[serde(default)]
    pub categories: BTreeMap<EntityId, Category>,
    #[serde(default)]
    pub certificates: BTreeMap<EntityId, Certificate>,
    #[serde(default)]
    pub blogs: BTreeMap<EntityId, Blog>,
    #[serde(default)]
    pub notes: BTreeMap<EntityId, Note>,
    #[serde(default)]
    pub projects: BTreeMap<EntityId, Project>,
}

impl StoreData {
    /// Raise every per-kind counter to at least the largest stored id,
    /// so snapshots without counters never hand out an id twice
    pub fn reconcile_ids(&mut self) {
        fn largest<R>(table: &BTreeMap<EntityId, R>) -> u64 {
            table.keys().next_back().map_or(0, |id| id.0)
        }

        let observed = [
            (EntityKind::Tag, largest(&self.tags)),
            (EntityKind::Category, largest(&self.categories)),
            (EntityKind::Certificate, largest(&self.certificates)),
            (EntityKind::Blog, largest(&self.blogs)),
            (EntityKind::Note, largest(&self.notes)),
            (EntityKind::Project, largest(&self.projects)),
        ];
        for (kind, max) in observed {
            if max == 0 {
                continue;
            }
            let last = self.last_ids.entry(kind).or_insert(0);
            *last = (*last).max(max);
        }
    }
}

/// Records the store knows how to keep
pub trait Stored: Record {
    fn table(data: &StoreData) -> &BTreeMap<EntityId, Self>;
    fn table_mut(data: &mut StoreData) -> &mut BTreeMap<EntityId, Self>;
}

impl Stored for Tag {
    fn table(data: &StoreData) -> &BTreeMap<EntityId, Self> {
        &data.tags
    }
    fn table_mut(data: &mut StoreData) -> &mut BTreeMap<EntityId, Self> {
        &mut data.tags
    }
}

impl Stored for Category {
    fn table(data: &StoreData) -> &BTreeMap<EntityId, Self> {
        &data.categories
    }
    fn table_mut(data: &mut StoreData) -> &mut BTreeMap<EntityId, Self> {
        &mut data.categories
    }
}

impl Stored for Certificate {
    fn table(data: &StoreData) -> &BTreeMap<EntityId, Self> {
        &data.certificates
    }
    fn table_mut(data: &mut StoreData) -> &mut BTreeMap<EntityId, Self> {
        &mut data.certificates
    }
}

impl Stored for Blog {
    fn table(data: &StoreData) -> &BTreeMap<EntityId, Self> {
        &data.blogs
    }
    fn table_mut(data: &mut StoreData) -> &mut BTreeMap<EntityId, Self> {
        &mut data.blogs
    }
}

impl Stored for Note {
    fn table(data: &StoreData) -> &BTreeMap<EntityId, Self> {
        &data.notes
    }
    fn table_mut(data: &mut StoreData) -> &mut BTreeMap<EntityId, Self> {
        &mut data.notes
    }
}

impl Stored for Project {
    fn table(data: &StoreData) -> &BTreeMap<EntityId, Self> {
        &data.projects
    }
    fn table_mut(data: &mut StoreData) -> &mut BTreeMap<EntityId, Self> {
        &mut data.projects
    }
}

/// What a delete removed and touched
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletionSummary {
    /// Every removed record, the requested one first
    pub deleted: Vec<(EntityKind, EntityId)>,
    /// Number of references cleared on surviving records
    pub detached: usize,
}

/// Message used when a stored record exceeds a constraint,
/// e.g. "A project can have at most 3 technologies (tags)."
pub fn constraint_message(kind: EntityKind, violation: &CardinalityViolation) -> String {
    let subject = kind.as_str();
    let article = if subject.starts_with(['a', 'e', 'i', 'o', 'u']) { "An" } else { "A" };
    let label = match kind.binding_target(&violation.binding_name) {
        Some(target) if target.plural() != violation.binding_name => {
            format!(" ({})", target.plural())
        }
        _ => String::new(),
    };
    format!(
        "{article} {subject} can have at most {} {}{label}.",
        violation.max_count, violation.binding_name
    )
}

/// The persistence layer for portfolio records
#[derive(Debug)]
pub struct PortfolioStore {
    data: StoreData,
    constraints: BTreeMap<EntityKind, Vec<ConstraintSpec>>,
    config_fingerprint: String,
    dirty: bool,
}

impl PortfolioStore {
    /// Create an empty store enforcing the configured constraints
    pub fn new(config: &PortfolioConfig) -> Self {
        Self::from_data(StoreData::default(), config)
    }

    /// Wrap existing tables
    pub fn from_data(mut data: StoreData, config: &PortfolioConfig) -> Self {
        data.reconcile_ids();
        Self {
            data,
            constraints: config.constraints.clone(),
            config_fingerprint: config.fingerprint(),
            dirty: false,
        }
    }

    /// Open the snapshot at `path`, or start empty when it does not exist
    pub async fn open<P: AsRef<Path>>(path: P, config: &PortfolioConfig) -> PortfolioResult<Self> {
        let path = path.as_ref();
        match Snapshot::load(path).await? {
            Some(snapshot) => {
                let fingerprint = config.fingerprint();
                if snapshot.config_fingerprint.as_deref() != Some(fingerprint.as_str()) {
                    tracing::warn!(
                        "Snapshot {} was written under a different constraint table; run `check` to audit it",
                        path.display()
                    );
                }
                tracing::info!("Loaded {} records from {}", snapshot.record_count(), path.display());
                Ok(Self::from_data(snapshot.data, config))
            }
            None => {
                tracing::info!("No snapshot at {}, starting empty", path.display());
                Ok(Self::new(config))
            }
        }
    }

    /// Write the store to `path` if anything changed since the last write
    pub async fn persist<P: AsRef<Path>>(&mut self, path: P) -> PortfolioResult<()> {
        if !self.dirty {
            return Ok(());
        }
        let snapshot = Snapshot::capture(&self.data, Some(self.config_fingerprint.clone()))?;
        snapshot.write(path.as_ref()).await?;
        self.dirty = false;
        Ok(())
    }

    /// Raw tables
    pub fn data(&self) -> &StoreData {
        &self.data
    }

    /// Whether there are unsaved changes
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Constraint table enforced for one kind
    pub fn constraints_for(&self, kind: EntityKind) -> &[ConstraintSpec] {
        self.constraints.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Fetch one record
    pub fn get<R: Stored>(&self, id: EntityId) -> Option<&R> {
        R::table(&self.data).get(&id)
    }

    /// All records of one kind, by id
    pub fn all<R: Stored>(&self) -> impl Iterator<Item = &R> {
        R::table(&self.data).values()
    }

    /// Whether a record exists
    pub fn contains(&self, kind: EntityKind, id: EntityId) -> bool {
        match kind {
            EntityKind::Tag => self.data.tags.contains_key(&id),
            EntityKind::Category => self.data.categories.contains_key(&id),
            EntityKind::Certificate => self.data.certificates.contains_key(&id),
            EntityKind::Blog => self.data.blogs.contains_key(&id),
            EntityKind::Note => self.data.notes.contains_key(&id),
            EntityKind::Project => self.data.projects.contains_key(&id),
        }
    }

    /// Number of records of one kind
    pub fn count(&self, kind: EntityKind) -> usize {
        self.records(kind).len()
    }

    /// Number of records across all kinds
    pub fn total_records(&self) -> usize {
        EntityKind::ALL.iter().map(|kind| self.count(*kind)).sum()
    }

    /// Records of one kind behind the field-access interface, ordered by id
    pub fn records(&self, kind: EntityKind) -> Vec<&dyn FieldAccess> {
        fn erase<R: Record>(table: &BTreeMap<EntityId, R>) -> Vec<&dyn FieldAccess> {
            table.values().map(|r| r as &dyn FieldAccess).collect()
        }

        match kind {
            EntityKind::Tag => erase(&self.data.tags),
            EntityKind::Category => erase(&self.data.categories),
            EntityKind::Certificate => erase(&self.data.certificates),
            EntityKind::Blog => erase(&self.data.blogs),
            EntityKind::Note => erase(&self.data.notes),
            EntityKind::Project => erase(&self.data.projects),
        }
    }

    /// Fetch one record behind the field-access interface
    pub fn record(&self, kind: EntityKind, id: EntityId) -> Option<&dyn FieldAccess> {
        match kind {
            EntityKind::Tag => self.data.tags.get(&id).map(|r| r as &dyn FieldAccess),
            EntityKind::Category => self.data.categories.get(&id).map(|r| r as &dyn FieldAccess),
            EntityKind::Certificate => {
                self.data.certificates.get(&id).map(|r| r as &dyn FieldAccess)
            }
            EntityKind::Blog => self.data.blogs.get(&id).map(|r| r as &dyn FieldAccess),
            EntityKind::Note => self.data.notes.get(&id).map(|r| r as &dyn FieldAccess),
            EntityKind::Project => self.data.projects.get(&id).map(|r| r as &dyn FieldAccess),
        }
    }

    /// Label of a record, resolving the blog name for notes
    pub fn label(&self, record: &dyn FieldAccess) -> String {
        if record.kind() == EntityKind::Note {
            if let Some(FieldValue::Ref(_, Some(blog))) = record.field_value("blog") {
                if let Some(blog) = self.data.blogs.get(&blog) {
                    return format!("Note for {}", blog.name);
                }
            }
        }
        record.display_name()
    }

    /// Label of a stored record
    pub fn display_name(&self, kind: EntityKind, id: EntityId) -> Option<String> {
        self.record(kind, id).map(|record| self.label(record))
    }

    /// Notes attached to one blog
    pub fn notes_for(&self, blog: EntityId) -> impl Iterator<Item = &Note> {
        self.data.notes.values().filter(move |note| note.blog == Some(blog))
    }

    /// Cardinality violations of a record against its kind's constraint table
    pub fn check_constraints<R: Record>(&self, record: &R) -> Vec<CardinalityViolation> {
        CardinalityValidator::violations(
            record.id(),
            &record.bindings(),
            self.constraints_for(R::KIND),
        )
    }

    /// Every problem that would block saving `record`
    pub fn full_clean<R: Stored>(&self, record: &R) -> ValidationErrors {
        let mut errors = clean_fields(record, R::field_specs());

        if let Some(name) = record.unique_name() {
            let taken = R::table(&self.data)
                .values()
                .any(|other| other.id() != record.id() && other.unique_name() == Some(name));
            if taken {
                errors.add(
                    "name",
                    format!("{} with this name already exists.", capitalize(R::KIND.as_str())),
                );
            }
        }

        for (field, target, id) in record.references() {
            if self.contains(target, id) {
                continue;
            }
            if R::KIND.binding_target(field).is_some() {
                errors.add(
                    field,
                    format!("Select a valid choice. {id} is not one of the available choices."),
                );
            } else {
                errors.add(field, format!("{target} instance with id {id} does not exist."));
            }
        }

        for violation in self.check_constraints(record) {
            let message = constraint_message(R::KIND, &violation);
            errors.add(violation.binding_name, message);
        }

        errors
    }

    /// Validate and commit a record, returning its identifier
    pub fn save<R: Stored>(&mut self, mut record: R) -> PortfolioResult<EntityId> {
        let errors = self.full_clean(&record);
        if !errors.is_empty() {
            tracing::warn!(kind = %R::KIND, id = ?record.id(), "Rejected write: {}", errors);
            return Err(PortfolioError::Validation(errors));
        }

        record.prepare_save(Utc::now().date_naive());

        let id = match record.id() {
            Some(id) => id,
            None => {
                let id = self.next_id::<R>();
                if R::table(&self.data).contains_key(&id) {
                    return Err(PortfolioError::storage(format!(
                        "{} id {id} is already taken",
                        R::KIND
                    )));
                }
                id
            }
        };
        record.set_id(id);

        let last = self.data.last_ids.entry(R::KIND).or_insert(0);
        *last = (*last).max(id.0);
        R::table_mut(&mut self.data).insert(id, record);
        self.dirty = true;
        tracing::info!(kind = %R::KIND, %id, "Record saved");
        Ok(id)
    }

    /// Delete a record and apply the cascade and set-null rules of everything pointing at it
    pub fn delete(&mut self, kind: EntityKind, id: EntityId) -> PortfolioResult<DeletionSummary> {
        if !self.remove(kind, id) {
            return Err(PortfolioError::not_found(kind, id));
        }

        let mut summary = DeletionSummary { deleted: vec![(kind, id)], detached: 0 };

        for owner in EntityKind::ALL {
            for (binding, target) in owner.bindings() {
                if *target == kind {
                    summary.detached += self.detach_binding(owner, binding, id);
                }
            }
            for (field, target, on_delete) in owner.foreign_keys() {
                if *target == kind {
                    self.release_references(owner, field, *on_delete, id, &mut summary);
                }
            }
        }

        self.dirty = true;
        tracing::info!(
            %kind,
            %id,
            deleted = summary.deleted.len(),
            detached = summary.detached,
            "Record deleted"
        );
        Ok(summary)
    }

    /// Audit every stored record against the constraint table
    pub fn audit(&self) -> ValidationReport {
        let start = Instant::now();
        let mut report = ValidationReport::new();

        let findings: Vec<RecordFinding> = EntityKind::ALL
            .par_iter()
            .flat_map_iter(|kind| match kind {
                EntityKind::Tag => self.audit_table::<Tag>(),
                EntityKind::Category => self.audit_table::<Category>(),
                EntityKind::Certificate => self.audit_table::<Certificate>(),
                EntityKind::Blog => self.audit_table::<Blog>(),
                EntityKind::Note => self.audit_table::<Note>(),
                EntityKind::Project => self.audit_table::<Project>(),
            })
            .collect();

        for finding in findings {
            report.add_finding(finding);
        }
        report.set_records_checked(self.total_records());
        report.set_execution_time(start.elapsed().as_millis() as u64);
        report.set_config_fingerprint(self.config_fingerprint.clone());
        report.sort_findings();

        tracing::debug!(
            records = report.summary.total_records,
            findings = report.findings.len(),
            "Audit finished"
        );
        report
    }

    fn next_id<R: Stored>(&self) -> EntityId {
        let last = self.data.last_ids.get(&R::KIND).copied().unwrap_or(0);
        let largest = R::table(&self.data).keys().next_back().map_or(0, |id| id.0);
        EntityId(last.max(largest) + 1)
    }

    fn audit_table<R: Stored>(&self) -> Vec<RecordFinding> {
        let specs = self.constraints_for(R::KIND);
        if specs.is_empty() {
            return Vec::new();
        }

        R::table(&self.data)
            .par_iter()
            .flat_map_iter(|(id, record)| {
                CardinalityValidator::violations(Some(*id), &record.bindings(), specs)
                    .into_iter()
                    .map(move |violation| {
                        let message = constraint_message(R::KIND, &violation);
                        RecordFinding::new(R::KIND, *id, self.label(record), violation, message)
                    })
            })
            .collect()
    }

    fn remove(&mut self, kind: EntityKind, id: EntityId) -> bool {
        match kind {
            EntityKind::Tag => self.data.tags.remove(&id).is_some(),
            EntityKind::Category => self.data.categories.remove(&id).is_some(),
            EntityKind::Certificate => self.data.certificates.remove(&id).is_some(),
            EntityKind::Blog => self.data.blogs.remove(&id).is_some(),
            EntityKind::Note => self.data.notes.remove(&id).is_some(),
            EntityKind::Project => self.data.projects.remove(&id).is_some(),
        }
    }

    fn detach_binding(&mut self, owner: EntityKind, binding: &str, id: EntityId) -> usize {
        fn detach<R: Stored>(data: &mut StoreData, binding: &str, id: EntityId) -> usize {
            R::table_mut(data)
                .values_mut()
                .filter_map(|record| record.binding_mut(binding))
                .map(|set| set.remove(&id))
                .filter(|removed| *removed)
                .count()
        }

        match owner {
            EntityKind::Certificate => detach::<Certificate>(&mut self.data, binding, id),
            EntityKind::Blog => detach::<Blog>(&mut self.data, binding, id),
            EntityKind::Project => detach::<Project>(&mut self.data, binding, id),
            EntityKind::Tag | EntityKind::Category | EntityKind::Note => 0,
        }
    }

    fn release_references(
        &mut self,
        owner: EntityKind,
        field: &str,
        on_delete: OnDelete,
        id: EntityId,
        summary: &mut DeletionSummary,
    ) {
        fn release<R: Stored>(
            data: &mut StoreData,
            field: &str,
            on_delete: OnDelete,
            id: EntityId,
            summary: &mut DeletionSummary,
        ) {
            let table = R::table_mut(data);
            match on_delete {
                OnDelete::Cascade => {
                    let doomed: Vec<EntityId> = table
                        .iter()
                        .filter(|(_, record)| {
                            matches!(record.field_value(field), Some(FieldValue::Ref(_, Some(target))) if target == id)
                        })
                        .map(|(key, _)| *key)
                        .collect();
                    for key in doomed {
                        table.remove(&key);
                        summary.deleted.push((R::KIND, key));
                    }
                }
                OnDelete::SetNull => {
                    for record in table.values_mut() {
                        if let Some(slot) = record.reference_mut(field) {
                            if *slot == Some(id) {
                                *slot = None;
                                summary.detached += 1;
                            }
                        }
                    }
                }
            }
        }

        match owner {
            EntityKind::Certificate => {
                release::<Certificate>(&mut self.data, field, on_delete, id, summary)
            }
            EntityKind::Note => release::<Note>(&mut self.data, field, on_delete, id, summary),
            _ => {}
        }
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigBuilder;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    struct Fixture {
        store: PortfolioStore,
        tags: Vec<EntityId>,
        categories: Vec<EntityId>,
    }

    fn fixture() -> Fixture {
        let mut store = PortfolioStore::new(&PortfolioConfig::default());
        let tags = ["Python", "Django", "React", "AWS"]
            .into_iter()
            .map(|name| store.save(Tag::new(name)).unwrap())
            .collect();
        let categories = ["Web Dev", "Data Science", "Mobile", "DevOps"]
            .into_iter()
            .map(|name| store.save(Category::new(name)).unwrap())
            .collect();
        Fixture { store, tags, categories }
    }

    #[test]
    fn test_project_creation() {
        let mut fx = fixture();
        let id = fx.store.save(Project::new("My Portfolio")).unwrap();

        let project: &Project = fx.store.get(id).unwrap();
        assert_eq!(project.display_name(), "My Portfolio");
        assert_eq!(project.id, Some(id));
        assert!(fx.store.is_dirty());
    }

    #[test]
    fn test_max_three_tags_validation() {
        let mut fx = fixture();
        let project = Project::new("Test Project").with_technologies(fx.tags.clone());

        let err = fx.store.save(project).unwrap_err();
        let errors = err.validation_errors().unwrap();
        assert_eq!(
            errors.field("technologies"),
            ["A project can have at most 3 technologies (tags).".to_string()]
        );
        assert_eq!(fx.store.count(EntityKind::Project), 0);
    }

    #[test]
    fn test_max_three_categories_validation() {
        let mut fx = fixture();
        let project = Project::new("Test Project").with_fields(fx.categories.clone());

        let err = fx.store.save(project).unwrap_err();
        let errors = err.validation_errors().unwrap();
        assert_eq!(
            errors.field("fields"),
            ["A project can have at most 3 fields (categories).".to_string()]
        );
    }

    #[test]
    fn test_both_violations_reported_together() {
        let mut fx = fixture();
        let project = Project::new("Greedy")
            .with_technologies(fx.tags.clone())
            .with_fields(fx.categories.clone());

        let errors = fx.store.full_clean(&project);
        let fields: Vec<_> = errors.iter().map(|(field, _)| field).collect();
        assert_eq!(fields, vec!["technologies", "fields"]);
    }

    #[test]
    fn test_valid_project() {
        let mut fx = fixture();
        let project = Project::new("Valid Project")
            .with_technologies(fx.tags[..3].iter().copied())
            .with_fields(fx.categories[..2].iter().copied());

        assert!(fx.store.full_clean(&project).is_empty());
        assert!(fx.store.save(project).is_ok());
    }

    #[test]
    fn test_stored_project_cannot_grow_past_limit() {
        let mut fx = fixture();
        let id = fx
            .store
            .save(Project::new("Grows").with_technologies(fx.tags[..3].iter().copied()))
            .unwrap();

        let mut project: Project = fx.store.get::<Project>(id).unwrap().clone();
        project.technologies.insert(fx.tags[3]);
        assert!(fx.store.save(project).is_err());

        let stored: &Project = fx.store.get(id).unwrap();
        assert_eq!(stored.technologies.len(), 3);
    }

    #[test]
    fn test_unknown_references_are_rejected() {
        let mut fx = fixture();
        let project = Project::new("Ghost").with_technologies([EntityId(99)]);
        let errors = fx.store.full_clean(&project);
        assert_eq!(
            errors.field("technologies"),
            ["Select a valid choice. 99 is not one of the available choices.".to_string()]
        );

        let note = Note::new(EntityId(42), "orphan");
        let err = fx.store.save(note).unwrap_err();
        assert!(err.validation_errors().unwrap().has_field("blog"));
    }

    #[test]
    fn test_unique_names() {
        let mut fx = fixture();
        let err = fx.store.save(Tag::new("Python")).unwrap_err();
        assert_eq!(
            err.validation_errors().unwrap().field("name"),
            ["Tag with this name already exists.".to_string()]
        );

        // Re-saving a record under its own name is fine
        let mut existing: Tag = fx.store.get::<Tag>(fx.tags[0]).unwrap().clone();
        existing.name = "Python".to_string();
        assert!(fx.store.save(existing).is_ok());
    }

    #[test]
    fn test_ids_are_assigned_per_kind() {
        let fx = fixture();
        assert_eq!(fx.tags, vec![EntityId(1), EntityId(2), EntityId(3), EntityId(4)]);
        assert_eq!(fx.categories[0], EntityId(1));
    }

    #[test]
    fn test_save_after_loading_snapshot_without_counters() {
        let snapshot =
            Snapshot::from_json(r#"{"data":{"tags":{"1":{"id":1,"name":"Rust"}}}}"#).unwrap();
        let mut store = PortfolioStore::from_data(snapshot.data, &PortfolioConfig::default());

        let id = store.save(Tag::new("Go")).unwrap();
        assert_eq!(id, EntityId(2));

        let names: Vec<&str> = store.all::<Tag>().map(|tag| tag.name.as_str()).collect();
        assert_eq!(names, ["Rust", "Go"]);
    }

    #[test]
    fn test_stale_counter_never_reuses_an_id() {
        let mut data = StoreData::default();
        data.tags.insert(EntityId(7), Tag { id: Some(EntityId(7)), name: "Rust".into() });
        data.last_ids.insert(EntityKind::Tag, 2);

        data.reconcile_ids();
        assert_eq!(data.last_ids[&EntityKind::Tag], 7);

        let mut store = PortfolioStore::from_data(data, &PortfolioConfig::default());
        assert_eq!(store.save(Tag::new("Go")).unwrap(), EntityId(8));
        assert_eq!(store.count(EntityKind::Tag), 2);
    }

    #[test]
    fn test_certificate_upload_date_is_filled() {
        let mut fx = fixture();
        let id = fx.store.save(Certificate::new("AWS SAA")).unwrap();
        let cert: &Certificate = fx.store.get(id).unwrap();
        assert_eq!(cert.upload_date, Some(Utc::now().date_naive()));
    }

    #[test]
    fn test_delete_tag_detaches_everywhere() {
        let mut fx = fixture();
        let tag = fx.tags[0];
        let project = fx
            .store
            .save(Project::new("p").with_technologies([tag, fx.tags[1]]))
            .unwrap();
        let blog = fx
            .store
            .save(Blog::new("b", NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()))
            .unwrap();
        let mut note = Note::new(blog, "remember this");
        note.tag = Some(tag);
        let note = fx.store.save(note).unwrap();

        let summary = fx.store.delete(EntityKind::Tag, tag).unwrap();
        assert_eq!(summary.deleted, vec![(EntityKind::Tag, tag)]);
        assert_eq!(summary.detached, 2);

        let project: &Project = fx.store.get(project).unwrap();
        assert_eq!(project.technologies.len(), 1);
        let note: &Note = fx.store.get(note).unwrap();
        assert_eq!(note.tag, None);
    }

    #[test]
    fn test_delete_blog_cascades_to_notes() {
        let mut fx = fixture();
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let blog = fx.store.save(Blog::new("Ownership", date)).unwrap();
        let other = fx.store.save(Blog::new("Lifetimes", date)).unwrap();
        fx.store.save(Note::new(blog, "first")).unwrap();
        fx.store.save(Note::new(blog, "second")).unwrap();
        fx.store.save(Note::new(other, "kept")).unwrap();

        let summary = fx.store.delete(EntityKind::Blog, blog).unwrap();
        assert_eq!(summary.deleted.len(), 3);
        assert_eq!(fx.store.count(EntityKind::Note), 1);
        assert_eq!(fx.store.notes_for(other).count(), 1);
    }

    #[test]
    fn test_delete_category_clears_certificate() {
        let mut fx = fixture();
        let mut cert = Certificate::new("GCP");
        cert.category = Some(fx.categories[0]);
        let cert = fx.store.save(cert).unwrap();

        fx.store.delete(EntityKind::Category, fx.categories[0]).unwrap();
        let cert: &Certificate = fx.store.get(cert).unwrap();
        assert_eq!(cert.category, None);
    }

    #[test]
    fn test_delete_missing_record() {
        let mut fx = fixture();
        let err = fx.store.delete(EntityKind::Project, EntityId(7)).unwrap_err();
        assert!(matches!(err, PortfolioError::NotFound { kind: EntityKind::Project, .. }));
    }

    #[test]
    fn test_note_label_uses_blog_name() {
        let mut fx = fixture();
        let blog = fx
            .store
            .save(Blog::new("Async Rust", NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()))
            .unwrap();
        let note = fx.store.save(Note::new(blog, "pin projections")).unwrap();
        assert_eq!(
            fx.store.display_name(EntityKind::Note, note).as_deref(),
            Some("Note for Async Rust")
        );
    }

    #[test]
    fn test_audit_finds_records_violating_a_tighter_table() {
        let mut fx = fixture();
        fx.store
            .save(Project::new("Three").with_technologies(fx.tags[..3].iter().copied()))
            .unwrap();
        fx.store.save(Project::new("One").with_technologies([fx.tags[0]])).unwrap();

        assert!(!fx.store.audit().has_violations());

        let stricter = ConfigBuilder::new()
            .constraint(EntityKind::Project, "technologies", 2)
            .build()
            .unwrap();
        let audited = PortfolioStore::from_data(fx.store.data().clone(), &stricter);
        let report = audited.audit();

        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.findings[0].display_name, "Three");
        assert_eq!(report.findings[0].violation, CardinalityViolation::new("technologies", 2, 3));
        assert_eq!(report.summary.total_records, 10);
        assert_eq!(report.config_fingerprint, Some(stricter.fingerprint()));
    }

    #[tokio::test]
    async fn test_persist_and_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("data").join("portfolio.json");
        let config = PortfolioConfig::default();

        let mut fx = fixture();
        let id = fx
            .store
            .save(Project::new("Saved").with_fields([fx.categories[0]]))
            .unwrap();
        fx.store.persist(&path).await.unwrap();
        assert!(!fx.store.is_dirty());

        let reopened = PortfolioStore::open(&path, &config).await.unwrap();
        let project: &Project = reopened.get(id).unwrap();
        assert_eq!(project.name.as_deref(), Some("Saved"));
        assert_eq!(reopened.total_records(), 9);
    }

    #[tokio::test]
    async fn test_open_missing_snapshot_starts_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store = PortfolioStore::open(temp_dir.path().join("none.json"), &PortfolioConfig::default())
            .await
            .unwrap();
        assert_eq!(store.total_records(), 0);
        assert!(!store.is_dirty());
    }
}
