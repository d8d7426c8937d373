//! Configuration loading and management for the portfolio backend
//!
//! Architecture: Anti-Corruption Layer - Configuration translates external YAML formats
//! - Raw YAML structures are converted to clean constraint tables
//! - Default configuration is embedded in the domain, not infrastructure
//! - Constraint tables are fixed at startup and never mutated afterwards

use crate::domain::models::EntityKind;
use crate::domain::violations::{PortfolioError, PortfolioResult};
use crate::validation::ConstraintSpec;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration file names looked up in the working directory
pub const DEFAULT_CONFIG_FILES: [&str; 3] =
    ["portfolio_admin.yaml", "portfolio_admin.yml", ".portfolio_admin.yaml"];

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioConfig {
    /// Configuration format version
    pub version: String,
    /// Snapshot storage configuration
    #[serde(default)]
    pub storage: StorageConfig,
    /// Admin presentation options
    #[serde(default)]
    pub admin: AdminConfig,
    /// Cardinality constraints per record kind
    #[serde(default)]
    pub constraints: BTreeMap<EntityKind, Vec<ConstraintSpec>>,
}

/// Snapshot storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Snapshot file used when none is given explicitly
    pub snapshot: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { snapshot: PathBuf::from("portfolio.json") }
    }
}

/// Admin presentation options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    /// Rows per change-list page
    #[serde(default = "default_list_per_page")]
    pub list_per_page: usize,
    /// Characters kept by excerpt columns before "..." is appended
    #[serde(default = "default_excerpt_length")]
    pub excerpt_length: usize,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self { list_per_page: default_list_per_page(), excerpt_length: default_excerpt_length() }
    }
}

fn default_list_per_page() -> usize {
    100
}

fn default_excerpt_length() -> usize {
    50
}

impl PortfolioConfig {
    /// Load configuration from a YAML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> PortfolioResult<Self> {
        let contents = fs::read_to_string(&path).map_err(|e| {
            PortfolioError::config(format!(
                "Failed to read config file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;

        let config: Self = serde_yaml::from_str(&contents).map_err(|e| {
            PortfolioError::config(format!(
                "Failed to parse config file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from string content
    pub fn load_from_str(content: &str) -> PortfolioResult<Self> {
        let config: Self = serde_yaml::from_str(content)
            .map_err(|e| PortfolioError::config(format!("Failed to parse config: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Find a configuration file in the working directory, else use defaults
    pub fn discover() -> PortfolioResult<Self> {
        for name in DEFAULT_CONFIG_FILES {
            if Path::new(name).exists() {
                tracing::debug!("Loading configuration from {}", name);
                return Self::load_from_file(name);
            }
        }
        Ok(Self::default())
    }

    /// Default configuration: at most three technologies and three fields per project
    pub fn with_defaults() -> Self {
        let mut constraints = BTreeMap::new();
        constraints.insert(
            EntityKind::Project,
            vec![ConstraintSpec::new("technologies", 3), ConstraintSpec::new("fields", 3)],
        );

        Self {
            version: "1.0".to_string(),
            storage: StorageConfig::default(),
            admin: AdminConfig::default(),
            constraints,
        }
    }

    /// Validate the configuration for consistency and correctness
    pub fn validate(&self) -> PortfolioResult<()> {
        if !["1.0"].contains(&self.version.as_str()) {
            return Err(PortfolioError::config(format!(
                "Unsupported configuration version: {}. Supported versions: 1.0",
                self.version
            )));
        }

        for (kind, specs) in &self.constraints {
            for spec in specs {
                if kind.binding_target(&spec.binding_name).is_none() {
                    let declared: Vec<_> = kind.bindings().iter().map(|(name, _)| *name).collect();
                    return Err(PortfolioError::config(format!(
                        "Unknown binding '{}' on {}. Declared bindings: {}",
                        spec.binding_name,
                        kind,
                        if declared.is_empty() { "none".to_string() } else { declared.join(", ") }
                    )));
                }

                let duplicate_count =
                    specs.iter().filter(|s| s.binding_name == spec.binding_name).count();
                if duplicate_count > 1 {
                    return Err(PortfolioError::config(format!(
                        "Duplicate constraint for binding '{}' on {}",
                        spec.binding_name, kind
                    )));
                }
            }
        }

        if self.admin.list_per_page == 0 {
            return Err(PortfolioError::config("admin.list_per_page must be at least 1"));
        }

        Ok(())
    }

    /// Constraint table for one record kind
    pub fn constraints_for(&self, kind: EntityKind) -> &[ConstraintSpec] {
        self.constraints.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Total number of configured constraints
    pub fn constraint_count(&self) -> usize {
        self.constraints.values().map(Vec::len).sum()
    }

    /// Convert to JSON for serialization
    pub fn to_json(&self) -> PortfolioResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| PortfolioError::config(format!("Failed to serialize config: {e}")))
    }

    /// Create a fingerprint of the constraint table for snapshot validation
    ///
    /// SHA-256 over the version and the constraints ordered by kind and binding
    /// name, so the value stored in snapshots is stable across builds.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.version.as_bytes());
        hasher.update([0]);

        // BTreeMap iteration is already ordered by kind
        for (kind, specs) in &self.constraints {
            hasher.update(kind.as_str().as_bytes());
            hasher.update([0]);
            let mut sorted: Vec<&ConstraintSpec> = specs.iter().collect();
            sorted.sort_by(|a, b| a.binding_name.cmp(&b.binding_name));
            for spec in sorted {
                hasher.update(spec.binding_name.as_bytes());
                hasher.update([0]);
                hasher.update((spec.max_count as u64).to_le_bytes());
            }
        }

        format!("{:x}", hasher.finalize())
    }
}

impl Default for PortfolioConfig {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Configuration builder for programmatic construction
pub struct ConfigBuilder {
    config: PortfolioConfig,
}

impl ConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self { config: PortfolioConfig::default() }
    }

    /// Start from an empty constraint table
    pub fn without_constraints(mut self) -> Self {
        self.config.constraints.clear();
        self
    }

    /// Add or replace the limit on one binding
    pub fn constraint(
        mut self,
        kind: EntityKind,
        binding_name: impl Into<String>,
        max_count: usize,
    ) -> Self {
        let spec = ConstraintSpec::new(binding_name, max_count);
        let specs = self.config.constraints.entry(kind).or_default();
        match specs.iter_mut().find(|s| s.binding_name == spec.binding_name) {
            Some(existing) => *existing = spec,
            None => specs.push(spec),
        }
        self
    }

    /// Set the default snapshot path
    pub fn snapshot(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.storage.snapshot = path.into();
        self
    }

    /// Set the excerpt length used by admin list columns
    pub fn excerpt_length(mut self, length: usize) -> Self {
        self.config.admin.excerpt_length = length;
        self
    }

    /// Build the final configuration
    pub fn build(self) -> PortfolioResult<PortfolioConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
