//! Report generation with multiple output formats
//!
//! Architecture: Anti-Corruption Layer - Formatters translate domain objects to external formats
//! - Audit reports, change lists and form outcomes are rendered for the terminal or as JSON
//! - Each output format keeps its own rendering rules
//! - Domain logic remains pure while supporting multiple presentation needs

use crate::admin::forms::FormOutcome;
use crate::admin::ChangeList;
use crate::domain::models::EntityKind;
use crate::domain::violations::{PortfolioError, PortfolioResult, RecordFinding, ValidationReport};
use crate::store::DeletionSummary;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::io::Write;
use std::str::FromStr;

/// Supported output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable format with colors
    Human,
    /// JSON format for programmatic consumption
    Json,
}

impl OutputFormat {
    /// Get all available format names
    pub fn all_formats() -> &'static [&'static str] {
        &["human", "json"]
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" => Ok(Self::Human),
            "json" => Ok(Self::Json),
            other => Err(format!(
                "unknown format '{other}', expected one of: {}",
                Self::all_formats().join(", ")
            )),
        }
    }
}

/// Options for customizing report output
#[derive(Debug, Clone)]
pub struct ReportOptions {
    /// Whether to use colored output (for human format)
    pub use_colors: bool,
    /// Maximum number of findings to include
    pub max_findings: Option<usize>,
    /// Only include findings for this kind
    pub kind: Option<EntityKind>,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self { use_colors: true, max_findings: None, kind: None }
    }
}

#[derive(Clone, Copy)]
enum Style {
    Success,
    Failure,
    Emphasis,
    Dim,
}

/// Main report formatter that dispatches to specific formatters
pub struct ReportFormatter {
    options: ReportOptions,
}

impl ReportFormatter {
    /// Create a new report formatter with options
    pub fn new(options: ReportOptions) -> Self {
        Self { options }
    }

    /// Format an audit report in the specified format
    pub fn format_report(
        &self,
        report: &ValidationReport,
        format: OutputFormat,
    ) -> PortfolioResult<String> {
        let findings = self.filter_findings(&report.findings);

        match format {
            OutputFormat::Human => Ok(self.format_human(report, &findings)),
            OutputFormat::Json => self.format_json(report, &findings),
        }
    }

    /// Write a formatted report to a writer
    pub fn write_report<W: Write>(
        &self,
        report: &ValidationReport,
        format: OutputFormat,
        mut writer: W,
    ) -> PortfolioResult<()> {
        let formatted = self.format_report(report, format)?;
        writer.write_all(formatted.as_bytes())?;
        Ok(())
    }

    /// Format one page of a change list
    pub fn format_changelist(
        &self,
        list: &ChangeList,
        format: OutputFormat,
    ) -> PortfolioResult<String> {
        if format == OutputFormat::Json {
            return to_json(list);
        }

        let mut widths: Vec<usize> = list.columns.iter().map(|c| c.chars().count()).collect();
        for row in &list.rows {
            for (width, cell) in widths.iter_mut().zip(&row.cells) {
                *width = (*width).max(cell.chars().count());
            }
        }
        let id_width = list
            .rows
            .iter()
            .map(|row| row.id.to_string().len())
            .max()
            .unwrap_or(0)
            .max(2);

        let mut output = String::new();
        let header: Vec<String> = std::iter::once(pad("ID", id_width))
            .chain(list.columns.iter().zip(&widths).map(|(c, w)| pad(c, *w)))
            .collect();
        output.push_str(&self.paint(header.join("  ").trim_end(), Style::Emphasis));
        output.push('\n');

        for row in &list.rows {
            let line: Vec<String> = std::iter::once(pad(&row.id.to_string(), id_width))
                .chain(row.cells.iter().zip(&widths).map(|(c, w)| pad(c, *w)))
                .collect();
            output.push_str(line.join("  ").trim_end());
            output.push('\n');
        }

        let noun = if list.total_matches == 1 { list.kind.as_str() } else { list.kind.plural() };
        output.push_str(&self.paint(
            &format!("{} {} (page {} of {})", list.total_matches, noun, list.page, list.pages),
            Style::Dim,
        ));
        output.push('\n');
        Ok(output)
    }

    /// Format the result of a form submission
    pub fn format_form_outcome(
        &self,
        kind: EntityKind,
        outcome: &FormOutcome,
        format: OutputFormat,
    ) -> PortfolioResult<String> {
        if format == OutputFormat::Json {
            return to_json(outcome);
        }

        let mut output = String::new();
        match outcome {
            FormOutcome::Saved { id } => {
                output.push_str(&format!(
                    "✅ {}\n",
                    self.paint(&format!("Saved {kind} #{id}"), Style::Success)
                ));
            }
            FormOutcome::Invalid(errors) => {
                output.push_str(&format!(
                    "❌ {}\n",
                    self.paint(&format!("{kind} was not saved"), Style::Failure)
                ));
                for (field, messages) in errors.iter() {
                    for message in messages {
                        output.push_str(&format!(
                            "  {}: {}\n",
                            self.paint(field, Style::Emphasis),
                            message
                        ));
                    }
                }
            }
        }
        Ok(output)
    }

    /// Format the result of a delete
    pub fn format_deletion(&self, summary: &DeletionSummary) -> String {
        let mut output = String::new();
        for (kind, id) in &summary.deleted {
            output.push_str(&format!("🗑️  Deleted {kind} #{id}\n"));
        }
        if summary.detached > 0 {
            output.push_str(&self.paint(
                &format!("Cleared {} reference(s) on remaining records", summary.detached),
                Style::Dim,
            ));
            output.push('\n');
        }
        output
    }

    /// Filter findings based on report options
    fn filter_findings<'a>(&self, findings: &'a [RecordFinding]) -> Vec<&'a RecordFinding> {
        let mut filtered: Vec<&RecordFinding> = findings
            .iter()
            .filter(|f| self.options.kind.map_or(true, |kind| f.kind == kind))
            .collect();

        if let Some(max) = self.options.max_findings {
            filtered.truncate(max);
        }

        filtered
    }

    /// Format report in human-readable format
    fn format_human(&self, report: &ValidationReport, findings: &[&RecordFinding]) -> String {
        let mut output = String::new();

        if findings.is_empty() {
            output.push_str(&format!(
                "✅ {}\n",
                self.paint("No constraint violations found", Style::Success)
            ));
        } else {
            output.push_str(&format!(
                "❌ {}\n\n",
                self.paint("Constraint Violations Found", Style::Failure)
            ));

            let mut by_kind: BTreeMap<EntityKind, Vec<&RecordFinding>> = BTreeMap::new();
            for finding in findings.iter().copied() {
                by_kind.entry(finding.kind).or_default().push(finding);
            }

            for (kind, kind_findings) in by_kind {
                output.push_str(&format!("📁 {}\n", kind.plural()));

                for finding in kind_findings {
                    output.push_str(&format!(
                        "  {} {}\n",
                        self.paint(&format!("#{} \"{}\"", finding.id, finding.display_name), Style::Dim),
                        finding.message
                    ));
                    output.push_str(&format!(
                        "    {} selected, remove {}\n",
                        finding.violation.actual_count,
                        finding.violation.excess()
                    ));
                }
                output.push('\n');
            }
        }

        output.push_str(&self.format_summary(report));
        output
    }

    /// Format report in JSON format
    fn format_json(
        &self,
        report: &ValidationReport,
        findings: &[&RecordFinding],
    ) -> PortfolioResult<String> {
        let json_findings: Vec<JsonValue> = findings
            .iter()
            .map(|f| {
                serde_json::json!({
                    "kind": f.kind,
                    "id": f.id,
                    "display_name": f.display_name,
                    "binding_name": f.violation.binding_name,
                    "max_count": f.violation.max_count,
                    "actual_count": f.violation.actual_count,
                    "message": f.message,
                    "detected_at": f.detected_at.to_rfc3339()
                })
            })
            .collect();

        let json_report = serde_json::json!({
            "findings": json_findings,
            "summary": {
                "total_records": report.summary.total_records,
                "records_with_violations": report.summary.records_with_violations,
                "execution_time_ms": report.summary.execution_time_ms,
                "validated_at": report.summary.validated_at.to_rfc3339()
            },
            "config_fingerprint": report.config_fingerprint
        });

        to_json(&json_report)
    }

    /// Format the summary section
    fn format_summary(&self, report: &ValidationReport) -> String {
        let total = report.findings.len();
        let execution_time = (report.summary.execution_time_ms as f64) / 1000.0;

        let counts = if total == 0 {
            self.paint("0 violations", Style::Success)
        } else {
            self.paint(
                &format!(
                    "{} violation{} in {} record{}",
                    total,
                    if total == 1 { "" } else { "s" },
                    report.summary.records_with_violations,
                    if report.summary.records_with_violations == 1 { "" } else { "s" }
                ),
                Style::Failure,
            )
        };

        format!(
            "📊 {} {} across {} records ({:.1}s)\n",
            self.paint("Summary:", Style::Emphasis),
            counts,
            report.summary.total_records,
            execution_time
        )
    }

    #[cfg(feature = "colors")]
    fn paint(&self, text: &str, style: Style) -> String {
        use colored::Colorize;

        if !self.options.use_colors {
            return text.to_string();
        }
        match style {
            Style::Success => text.green().to_string(),
            Style::Failure => text.red().bold().to_string(),
            Style::Emphasis => text.bold().to_string(),
            Style::Dim => text.dimmed().to_string(),
        }
    }

    #[cfg(not(feature = "colors"))]
    fn paint(&self, text: &str, _style: Style) -> String {
        text.to_string()
    }
}

impl Default for ReportFormatter {
    fn default() -> Self {
        Self::new(ReportOptions::default())
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> PortfolioResult<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| PortfolioError::storage(format!("JSON serialization failed: {e}")))
}

fn pad(text: &str, width: usize) -> String {
    format!("{text:<width$}")
}
