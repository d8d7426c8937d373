//! Core domain models for cardinality violations and validation results
//!
//! Architecture: Rich Domain Models - Violations are values with behavior, not just data
//! - CardinalityViolation is the single error kind produced by the constraint rule
//! - ValidationErrors collects field-keyed messages for the layer rejecting a write
//! - ValidationReport acts as an aggregate root for a whole-store audit

use crate::domain::models::{EntityId, EntityKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A binding that holds more related records than its constraint allows
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CardinalityViolation {
    /// Name of the offending binding (e.g. "technologies")
    pub binding_name: String,
    /// Configured maximum size
    pub max_count: usize,
    /// Observed size
    pub actual_count: usize,
}

impl CardinalityViolation {
    /// Create a new violation
    pub fn new(binding_name: impl Into<String>, max_count: usize, actual_count: usize) -> Self {
        Self { binding_name: binding_name.into(), max_count, actual_count }
    }

    /// How many related records have to be removed to satisfy the constraint
    pub fn excess(&self) -> usize {
        self.actual_count.saturating_sub(self.max_count)
    }
}

impl fmt::Display for CardinalityViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} holds {} items, at most {} allowed",
            self.binding_name, self.actual_count, self.max_count
        )
    }
}

/// Key used for errors that do not belong to a single field
pub const NON_FIELD_ERRORS: &str = "__all__";

/// Field-keyed validation messages, in the order they were raised
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrors {
    errors: Vec<(String, Vec<String>)>,
}

impl ValidationErrors {
    /// Create an empty error set
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message against a field
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        let field = field.into();
        let message = message.into();
        match self.errors.iter_mut().find(|(name, _)| *name == field) {
            Some((_, messages)) => messages.push(message),
            None => self.errors.push((field, vec![message])),
        }
    }

    /// Whether no message has been recorded
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Total number of messages across all fields
    pub fn len(&self) -> usize {
        self.errors.iter().map(|(_, messages)| messages.len()).sum()
    }

    /// Messages recorded against one field
    pub fn field(&self, name: &str) -> &[String] {
        self.errors
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, messages)| messages.as_slice())
            .unwrap_or(&[])
    }

    /// Whether the field has at least one message
    pub fn has_field(&self, name: &str) -> bool {
        !self.field(name).is_empty()
    }

    /// Iterate over `(field, messages)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.errors.iter().map(|(field, messages)| (field.as_str(), messages.as_slice()))
    }

    /// Append every message of another error set
    pub fn merge(&mut self, other: ValidationErrors) {
        for (field, messages) in other.errors {
            for message in messages {
                self.add(field.clone(), message);
            }
        }
    }

    /// `Ok(())` when empty, otherwise a validation error carrying these messages
    pub fn into_result(self) -> PortfolioResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(PortfolioError::Validation(self))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.errors {
            for message in messages {
                if !first {
                    write!(f, "; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

/// A stored record found in violation of its constraint table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordFinding {
    /// Kind of the offending record
    pub kind: EntityKind,
    /// Identifier of the offending record
    pub id: EntityId,
    /// Display name of the record at audit time
    pub display_name: String,
    /// The violated constraint
    pub violation: CardinalityViolation,
    /// Human-readable description of the violation
    pub message: String,
    /// When this finding was produced
    pub detected_at: DateTime<Utc>,
}

impl RecordFinding {
    /// Create a new finding
    pub fn new(
        kind: EntityKind,
        id: EntityId,
        display_name: impl Into<String>,
        violation: CardinalityViolation,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            id,
            display_name: display_name.into(),
            violation,
            message: message.into(),
            detected_at: Utc::now(),
        }
    }

    /// Format finding for display
    pub fn format_display(&self) -> String {
        format!("{} #{} \"{}\": {}", self.kind, self.id, self.display_name, self.message)
    }
}

/// Summary statistics for a validation report
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationSummary {
    /// Total number of records audited
    pub total_records: usize,
    /// Number of distinct records with at least one finding
    pub records_with_violations: usize,
    /// Total execution time in milliseconds
    pub execution_time_ms: u64,
    /// Timestamp when validation was performed
    pub validated_at: DateTime<Utc>,
}

/// Complete audit report containing all findings and metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    /// All findings, one per offending binding
    pub findings: Vec<RecordFinding>,
    /// Summary statistics
    pub summary: ValidationSummary,
    /// Configuration used for this audit
    pub config_fingerprint: Option<String>,
}

impl ValidationReport {
    /// Create a new empty validation report
    pub fn new() -> Self {
        Self {
            findings: Vec::new(),
            summary: ValidationSummary { validated_at: Utc::now(), ..Default::default() },
            config_fingerprint: None,
        }
    }

    /// Add a finding to the report
    pub fn add_finding(&mut self, finding: RecordFinding) {
        let seen = self.findings.iter().any(|f| f.kind == finding.kind && f.id == finding.id);
        if !seen {
            self.summary.records_with_violations += 1;
        }
        self.findings.push(finding);
    }

    /// Whether the report contains any findings
    pub fn has_violations(&self) -> bool {
        !self.findings.is_empty()
    }

    /// Findings for one record kind
    pub fn findings_for(&self, kind: EntityKind) -> impl Iterator<Item = &RecordFinding> {
        self.findings.iter().filter(move |f| f.kind == kind)
    }

    /// Set the number of records audited
    pub fn set_records_checked(&mut self, count: usize) {
        self.summary.total_records = count;
    }

    /// Set the execution time
    pub fn set_execution_time(&mut self, duration_ms: u64) {
        self.summary.execution_time_ms = duration_ms;
    }

    /// Set the configuration fingerprint
    pub fn set_config_fingerprint(&mut self, fingerprint: impl Into<String>) {
        self.config_fingerprint = Some(fingerprint.into());
    }

    /// Merge another report into this one
    pub fn merge(&mut self, other: ValidationReport) {
        for finding in other.findings {
            self.add_finding(finding);
        }
        self.summary.total_records += other.summary.total_records;
    }

    /// Sort findings by kind, id and binding name for consistent output
    pub fn sort_findings(&mut self) {
        self.findings.sort_by(|a, b| {
            a.kind
                .cmp(&b.kind)
                .then_with(|| a.id.cmp(&b.id))
                .then_with(|| a.violation.binding_name.cmp(&b.violation.binding_name))
        });
    }
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::new()
    }
}

/// Error types that can occur in the portfolio backend
#[derive(Debug, thiserror::Error)]
pub enum PortfolioError {
    /// Configuration file could not be loaded or parsed
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// File could not be read or written
    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// A write was rejected by validation
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    /// Referenced record does not exist
    #[error("{kind} with id {id} does not exist")]
    NotFound { kind: EntityKind, id: EntityId },

    /// Snapshot could not be read, verified or written
    #[error("Storage error: {message}")]
    Storage { message: String },

    /// Submitted form payload could not be interpreted
    #[error("Form error: {message}")]
    Form { message: String },
}

impl PortfolioError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration { message: message.into() }
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage { message: message.into() }
    }

    /// Create a form error
    pub fn form(message: impl Into<String>) -> Self {
        Self::Form { message: message.into() }
    }

    /// Create a not-found error
    pub fn not_found(kind: EntityKind, id: EntityId) -> Self {
        Self::NotFound { kind, id }
    }

    /// Validation messages carried by this error, if it is a validation failure
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            Self::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

/// Result type for portfolio operations
pub type PortfolioResult<T> = Result<T, PortfolioError>;
