use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::settings::{DetectionSettings, SettingsSnapshot};

/// On-disk schema version. Bumped on any incompatible change; a loaded
/// snapshot with a different version is discarded wholesale rather than
/// migrated.
pub const CACHE_SCHEMA_VERSION: &str = "1.0.0";

/// Per-item reference status, keyed by catalog identifier.
pub type ReferenceMap = HashMap<String, bool>;

/// The persisted result of one corpus scan, together with everything
/// needed to decide whether it can still be trusted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheSnapshot {
    pub schema_version: String,
    pub last_scan_timestamp: DateTime<Utc>,
    pub settings_snapshot: SettingsSnapshot,
    pub corpus_fingerprint: String,
    pub references: ReferenceMap,
}

impl CacheSnapshot {
    /// Builds a snapshot for a just-completed full scan.
    pub fn new(
        settings: &DetectionSettings,
        corpus_fingerprint: impl Into<String>,
        references: ReferenceMap,
    ) -> Self {
        Self {
            schema_version: CACHE_SCHEMA_VERSION.to_string(),
            last_scan_timestamp: Utc::now(),
            settings_snapshot: SettingsSnapshot::from(settings),
            corpus_fingerprint: corpus_fingerprint.into(),
            references,
        }
    }

    pub fn referenced_count(&self) -> usize {
        self.references.values().filter(|&&referenced| referenced).count()
    }
}

/// Read-only cache introspection, as exposed to surrounding UI code.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheStats {
    pub total_entries: usize,
    pub referenced_count: usize,
    pub last_scan: Option<DateTime<Utc>>,
    pub approx_size_bytes: usize,
}

/// Path of the cache blob relative to a data directory.
pub fn default_cache_file() -> PathBuf {
    PathBuf::from(".vaultrefs").join("references-cache.json")
}
