//! Checksummed JSON snapshots of the store
//!
//! Infrastructure Layer - Snapshots persist the store without affecting domain logic
//! - One JSON document holds every table plus the fingerprint of the constraint table
//! - A SHA-256 checksum over the table data detects hand edits and truncation
//! - Older snapshot formats are migrated on load

use super::StoreData;
use crate::domain::models::EntityKind;
use crate::domain::violations::{PortfolioError, PortfolioResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::Path;
use tokio::fs;

/// Current snapshot format version
pub const SNAPSHOT_VERSION: u32 = 1;

/// Serialized form of the whole store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Snapshot format version for migration support
    #[serde(default)]
    pub version: u32,
    /// Fingerprint of the constraint table the data was written under
    #[serde(default)]
    pub config_fingerprint: Option<String>,
    /// SHA-256 of the serialized `data`
    #[serde(default)]
    pub checksum: String,
    /// When the snapshot was written
    #[serde(default)]
    pub saved_at: DateTime<Utc>,
    /// Every table of the store
    pub data: StoreData,
}

impl Snapshot {
    /// Capture the current tables
    pub fn capture(data: &StoreData, config_fingerprint: Option<String>) -> PortfolioResult<Self> {
        Ok(Self {
            version: SNAPSHOT_VERSION,
            config_fingerprint,
            checksum: checksum(data)?,
            saved_at: Utc::now(),
            data: data.clone(),
        })
    }

    /// Read a snapshot, returning `None` when the file does not exist
    pub async fn load(path: &Path) -> PortfolioResult<Option<Self>> {
        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(PortfolioError::storage(format!(
                    "Failed to read snapshot '{}': {}",
                    path.display(),
                    e
                )))
            }
        };

        Self::from_json(&content).map(Some)
    }

    /// Parse, migrate and verify a snapshot document
    pub fn from_json(content: &str) -> PortfolioResult<Self> {
        let mut snapshot: Self = serde_json::from_str(content)
            .map_err(|e| PortfolioError::storage(format!("Failed to parse snapshot: {e}")))?;

        snapshot.migrate_if_needed()?;
        snapshot.verify()?;
        Ok(snapshot)
    }

    /// Write the snapshot, creating parent directories as needed
    pub async fn write(&self, path: &Path) -> PortfolioResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(|e| {
                PortfolioError::storage(format!("Failed to create snapshot directory: {e}"))
            })?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| PortfolioError::storage(format!("Failed to serialize snapshot: {e}")))?;

        fs::write(path, content).await.map_err(|e| {
            PortfolioError::storage(format!("Failed to write snapshot '{}': {}", path.display(), e))
        })?;

        tracing::debug!(records = self.record_count(), "Snapshot written to {}", path.display());
        Ok(())
    }

    /// Check the stored checksum against the data
    pub fn verify(&self) -> PortfolioResult<()> {
        let actual = checksum(&self.data)?;
        if actual != self.checksum {
            return Err(PortfolioError::storage(format!(
                "Snapshot checksum mismatch: expected {}, found {}",
                self.checksum, actual
            )));
        }
        Ok(())
    }

    /// Number of records across all tables
    pub fn record_count(&self) -> usize {
        EntityKind::ALL.iter().map(|kind| self.count(*kind)).sum()
    }

    fn count(&self, kind: EntityKind) -> usize {
        match kind {
            EntityKind::Tag => self.data.tags.len(),
            EntityKind::Category => self.data.categories.len(),
            EntityKind::Certificate => self.data.certificates.len(),
            EntityKind::Blog => self.data.blogs.len(),
            EntityKind::Note => self.data.notes.len(),
            EntityKind::Project => self.data.projects.len(),
        }
    }

    fn migrate_if_needed(&mut self) -> PortfolioResult<()> {
        if self.version == SNAPSHOT_VERSION {
            return Ok(());
        }

        match self.version {
            0 => {
                // Version 0 carried no checksum
                tracing::info!("Migrating snapshot from version 0 to {}", SNAPSHOT_VERSION);
                self.checksum = checksum(&self.data)?;
                self.version = SNAPSHOT_VERSION;
                Ok(())
            }
            other => Err(PortfolioError::storage(format!(
                "Unsupported snapshot version: {other}. Supported versions: 0-{SNAPSHOT_VERSION}"
            ))),
        }
    }
}

/// SHA-256 of the serialized tables, hex encoded
pub fn checksum(data: &StoreData) -> PortfolioResult<String> {
    let bytes = serde_json::to_vec(data)
        .map_err(|e| PortfolioError::storage(format!("Failed to serialize store data: {e}")))?;
    Ok(format!("{:x}", Sha256::digest(&bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{EntityId, Tag};
    use tempfile::TempDir;

    fn sample_data() -> StoreData {
        let mut data = StoreData::default();
        let mut tag = Tag::new("Rust");
        tag.id = Some(EntityId(1));
        data.tags.insert(EntityId(1), tag);
        data.last_ids.insert(EntityKind::Tag, 1);
        data
    }

    #[tokio::test]
    async fn test_write_and_load() -> PortfolioResult<()> {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("snapshot.json");

        let snapshot = Snapshot::capture(&sample_data(), Some("abc".to_string()))?;
        snapshot.write(&path).await?;

        let loaded = Snapshot::load(&path).await?.unwrap();
        assert_eq!(loaded.version, SNAPSHOT_VERSION);
        assert_eq!(loaded.config_fingerprint.as_deref(), Some("abc"));
        assert_eq!(loaded.data, sample_data());
        assert_eq!(loaded.record_count(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let loaded = Snapshot::load(&temp_dir.path().join("absent.json")).await.unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_tampered_data_is_rejected() {
        let snapshot = Snapshot::capture(&sample_data(), None).unwrap();
        let json = serde_json::to_string(&snapshot).unwrap().replace("\"Rust\"", "\"Go\"");

        let err = Snapshot::from_json(&json).unwrap_err();
        assert!(err.to_string().contains("checksum mismatch"));
    }

    #[test]
    fn test_version_zero_is_migrated() {
        let data = serde_json::to_value(sample_data()).unwrap();
        let json = serde_json::json!({ "data": data }).to_string();

        let snapshot = Snapshot::from_json(&json).unwrap();
        assert_eq!(snapshot.version, SNAPSHOT_VERSION);
        assert_eq!(snapshot.checksum, checksum(&sample_data()).unwrap());
    }

    #[test]
    fn test_future_version_is_rejected() {
        let mut snapshot = Snapshot::capture(&sample_data(), None).unwrap();
        snapshot.version = SNAPSHOT_VERSION + 1;
        let json = serde_json::to_string(&snapshot).unwrap();

        let err = Snapshot::from_json(&json).unwrap_err();
        assert!(err.to_string().contains("Unsupported snapshot version"));
    }
}
