//! Portfolio Admin - content backend for a personal portfolio
//!
//! Architecture: Clean Architecture - Library interface serves as the application layer
//! - Records, constraint checks and admin descriptors are pure domain code
//! - The store and its snapshots are the only infrastructure
//! - One cardinality rule guards both direct saves and admin form submissions

pub mod admin;
pub mod config;
pub mod domain;
pub mod report;
pub mod store;
pub mod validation;

// Re-export main types for convenient access
pub use domain::models::{
    Blog, Category, Certificate, EntityId, EntityKind, FieldAccess, Note, Project, Record, Tag,
};
pub use domain::violations::{
    CardinalityViolation, PortfolioError, PortfolioResult, RecordFinding, ValidationErrors,
    ValidationReport, ValidationSummary,
};

pub use config::{ConfigBuilder, PortfolioConfig};

pub use validation::{BindingSizes, CardinalityValidator, ConstraintSpec, ValidationResult};

pub use admin::forms::{FormData, FormOutcome};
pub use admin::{AdminSite, ChangeList, ChangeListQuery, ModelAdmin};

pub use report::{OutputFormat, ReportFormatter, ReportOptions};

pub use store::{DeletionSummary, PortfolioStore, Stored};

use std::path::{Path, PathBuf};

/// Main entry point bundling configuration, store and admin site
pub struct PortfolioAdmin {
    config: PortfolioConfig,
    store: PortfolioStore,
    site: AdminSite,
    report_formatter: ReportFormatter,
    snapshot_path: PathBuf,
}

impl PortfolioAdmin {
    /// Create an empty backend with the given configuration
    pub fn new_with_config(config: PortfolioConfig) -> PortfolioResult<Self> {
        config.validate()?;
        let store = PortfolioStore::new(&config);
        Ok(Self::assemble(config, store))
    }

    /// Create an empty backend with default configuration
    pub fn new() -> PortfolioResult<Self> {
        Self::new_with_config(PortfolioConfig::default())
    }

    /// Create an empty backend loading configuration from file
    pub fn from_config_file<P: AsRef<Path>>(path: P) -> PortfolioResult<Self> {
        let config = PortfolioConfig::load_from_file(path)?;
        Self::new_with_config(config)
    }

    /// Open the snapshot at `path`, or the configured one when `None`
    pub async fn open_snapshot(
        config: PortfolioConfig,
        path: Option<PathBuf>,
    ) -> PortfolioResult<Self> {
        config.validate()?;
        let path = path.unwrap_or_else(|| config.storage.snapshot.clone());
        let store = PortfolioStore::open(&path, &config).await?;

        let mut admin = Self::assemble(config, store);
        admin.snapshot_path = path;
        Ok(admin)
    }

    fn assemble(config: PortfolioConfig, store: PortfolioStore) -> Self {
        Self {
            site: AdminSite::default_site(config.admin.clone()),
            snapshot_path: config.storage.snapshot.clone(),
            report_formatter: ReportFormatter::default(),
            config,
            store,
        }
    }

    /// Set custom report formatter
    pub fn with_report_formatter(mut self, formatter: ReportFormatter) -> Self {
        self.report_formatter = formatter;
        self
    }

    /// Write pending changes to the snapshot file
    pub async fn persist(&mut self) -> PortfolioResult<()> {
        self.store.persist(&self.snapshot_path).await
    }

    /// Save a record through the pre-persist hook
    pub fn save<R: Stored>(&mut self, record: R) -> PortfolioResult<EntityId> {
        self.store.save(record)
    }

    /// Handle an admin form submission
    pub fn submit(
        &mut self,
        kind: EntityKind,
        instance: Option<EntityId>,
        data: &FormData,
    ) -> PortfolioResult<FormOutcome> {
        self.site.submit(&mut self.store, kind, instance, data)
    }

    /// Delete a record with cascade and set-null semantics
    pub fn delete(&mut self, kind: EntityKind, id: EntityId) -> PortfolioResult<DeletionSummary> {
        self.store.delete(kind, id)
    }

    /// Run a change-list query
    pub fn changelist(
        &self,
        kind: EntityKind,
        query: &ChangeListQuery,
    ) -> PortfolioResult<ChangeList> {
        self.site.changelist(&self.store, kind, query)
    }

    /// Audit every stored record against the constraint table
    pub fn check(&self) -> ValidationReport {
        self.store.audit()
    }

    /// Format an audit report for output
    pub fn format_report(
        &self,
        report: &ValidationReport,
        format: OutputFormat,
    ) -> PortfolioResult<String> {
        self.report_formatter.format_report(report, format)
    }

    pub fn formatter(&self) -> &ReportFormatter {
        &self.report_formatter
    }

    pub fn config(&self) -> &PortfolioConfig {
        &self.config
    }

    pub fn store(&self) -> &PortfolioStore {
        &self.store
    }

    pub fn site(&self) -> &AdminSite {
        &self.site
    }

    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }
}

/// Convenience function to audit a snapshot with default settings
pub async fn audit_snapshot<P: AsRef<Path>>(path: P) -> PortfolioResult<ValidationReport> {
    let admin =
        PortfolioAdmin::open_snapshot(PortfolioConfig::default(), Some(path.as_ref().to_path_buf()))
            .await?;
    Ok(admin.check())
}
