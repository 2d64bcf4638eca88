use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Live configuration for reference detection. Loaded from the
/// `[detection]` section of the application config, or constructed
/// directly by embedding callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionSettings {
    /// Vault-relative or absolute directory the scan starts from.
    pub scan_path: PathBuf,
    /// Recurse into nested folders, or only scan direct children.
    pub include_subfolders: bool,
    /// Base URL of the external asset provider, if one is configured.
    /// Enables the markdown image-link patterns.
    pub external_domain: Option<String>,
    /// When false, every status query answers all-false with no I/O.
    pub enable_detection: bool,
    /// Maximum age of a cached scan before it is revalidated.
    pub cache_ttl_minutes: u64,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            scan_path: PathBuf::from("."),
            include_subfolders: true,
            external_domain: None,
            enable_detection: true,
            cache_ttl_minutes: 60,
        }
    }
}

impl DetectionSettings {
    /// External domain with surrounding whitespace removed, or `None`
    /// when unset or blank.
    pub fn trimmed_domain(&self) -> Option<&str> {
        self.external_domain
            .as_deref()
            .map(str::trim)
            .filter(|domain| !domain.is_empty())
    }
}

/// The subset of settings persisted alongside a cache snapshot. Any
/// field-level difference from the live settings invalidates the
/// snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsSnapshot {
    pub scan_path: PathBuf,
    pub include_subfolders: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_domain: Option<String>,
}

impl From<&DetectionSettings> for SettingsSnapshot {
    fn from(settings: &DetectionSettings) -> Self {
        Self {
            scan_path: settings.scan_path.clone(),
            include_subfolders: settings.include_subfolders,
            external_domain: settings.external_domain.clone(),
        }
    }
}
