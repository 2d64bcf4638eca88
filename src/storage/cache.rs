use std::path::PathBuf;

use chrono::{TimeDelta, Utc};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::types::{
    CacheSnapshot, CacheStats, DetectionError, DetectionSettings, ReferenceMap, SettingsSnapshot,
    CACHE_SCHEMA_VERSION,
};

/// Persists reference-scan snapshots as a JSON blob and evaluates
/// whether a loaded snapshot is still trustworthy. Keeps an in-memory
/// copy of the last loaded or saved snapshot for cheap lookups and
/// stats.
#[derive(Debug)]
pub struct CacheStore {
    cache_path: PathBuf,
    current: Mutex<Option<CacheSnapshot>>,
}

impl CacheStore {
    pub fn new(cache_path: impl Into<PathBuf>) -> Self {
        Self {
            cache_path: cache_path.into(),
            current: Mutex::new(None),
        }
    }

    pub fn cache_path(&self) -> &std::path::Path {
        &self.cache_path
    }

    /// Loads the persisted snapshot. Returns `None` when the blob is
    /// absent, unreadable, malformed, or carries a different schema
    /// version; every such case is a total cache miss.
    pub async fn load(&self) -> Option<CacheSnapshot> {
        let bytes = match tokio::fs::read(&self.cache_path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.cache_path.display(), "cache file does not exist");
                return None;
            }
            Err(e) => {
                warn!(path = %self.cache_path.display(), error = %e, "failed to read cache file");
                return None;
            }
        };

        let snapshot: CacheSnapshot = match serde_json::from_slice(&bytes) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(path = %self.cache_path.display(), error = %e, "cache file is corrupt, treating as absent");
                return None;
            }
        };

        if snapshot.schema_version != CACHE_SCHEMA_VERSION {
            info!(
                found = %snapshot.schema_version,
                expected = CACHE_SCHEMA_VERSION,
                "cache schema version mismatch, invalidating"
            );
            return None;
        }

        debug!(entries = snapshot.references.len(), "loaded reference cache");
        *self.current.lock() = Some(snapshot.clone());
        Some(snapshot)
    }

    /// Serializes and writes the snapshot, creating missing parent
    /// directories. Errors are reported to the caller; they never
    /// propagate past the manager boundary.
    pub async fn save(&self, snapshot: &CacheSnapshot) -> Result<(), DetectionError> {
        if let Some(parent) = self.cache_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let encoded = serde_json::to_vec_pretty(snapshot)?;
        tokio::fs::write(&self.cache_path, encoded).await?;

        debug!(entries = snapshot.references.len(), "saved reference cache");
        *self.current.lock() = Some(snapshot.clone());
        Ok(())
    }

    /// True when the snapshot is older than the configured TTL, or when
    /// any persisted settings field differs from the live settings.
    pub fn is_expired(&self, snapshot: &CacheSnapshot, settings: &DetectionSettings) -> bool {
        let ttl = TimeDelta::minutes(settings.cache_ttl_minutes as i64);
        let age = Utc::now() - snapshot.last_scan_timestamp;
        if age > ttl {
            debug!(age_minutes = age.num_minutes(), "cache expired by age");
            return true;
        }

        if snapshot.settings_snapshot != SettingsSnapshot::from(settings) {
            debug!("cache expired by settings change");
            return true;
        }

        false
    }

    /// True when the corpus has changed since the snapshot was taken.
    pub fn is_stale(&self, snapshot: &CacheSnapshot, fresh_fingerprint: &str) -> bool {
        let stale = snapshot.corpus_fingerprint != fresh_fingerprint;
        if stale {
            debug!(
                cached = %snapshot.corpus_fingerprint,
                current = %fresh_fingerprint,
                "corpus fingerprint changed"
            );
        }
        stale
    }

    /// Shallow union of two reference maps: `updates` entries overwrite
    /// `existing` entries of the same key and the scan timestamp is
    /// refreshed. Used for incremental updates, distinct from full-scan
    /// replacement.
    pub fn merge_references(existing: &CacheSnapshot, updates: &ReferenceMap) -> CacheSnapshot {
        let mut merged = existing.clone();
        merged
            .references
            .extend(updates.iter().map(|(id, &referenced)| (id.clone(), referenced)));
        merged.last_scan_timestamp = Utc::now();
        merged
    }

    /// Merges `updates` into the in-memory snapshot and persists the
    /// result. Returns false when no snapshot is loaded or the write
    /// fails.
    pub async fn update_references(&self, updates: &ReferenceMap) -> bool {
        let merged = match self.current.lock().as_ref() {
            Some(existing) => Self::merge_references(existing, updates),
            None => {
                warn!("no cache loaded, cannot merge reference updates");
                return false;
            }
        };

        match self.save(&merged).await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "failed to persist merged references");
                false
            }
        }
    }

    /// Reference status for a single item from the in-memory copy;
    /// unknown items are unreferenced.
    pub fn reference_status(&self, id: &str) -> bool {
        self.current
            .lock()
            .as_ref()
            .and_then(|snapshot| snapshot.references.get(id).copied())
            .unwrap_or(false)
    }

    pub fn all_references(&self) -> ReferenceMap {
        self.current
            .lock()
            .as_ref()
            .map(|snapshot| snapshot.references.clone())
            .unwrap_or_default()
    }

    /// Deletes the persisted blob and drops the in-memory copy. The
    /// next load after a clear is a guaranteed miss.
    pub async fn clear(&self) -> bool {
        self.current.lock().take();

        match tokio::fs::remove_file(&self.cache_path).await {
            Ok(()) => {
                info!(path = %self.cache_path.display(), "reference cache cleared");
                true
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
            Err(e) => {
                warn!(path = %self.cache_path.display(), error = %e, "failed to remove cache file");
                false
            }
        }
    }

    /// Read-only introspection; all zero/none when no snapshot is held.
    pub fn stats(&self) -> CacheStats {
        match self.current.lock().as_ref() {
            Some(snapshot) => CacheStats {
                total_entries: snapshot.references.len(),
                referenced_count: snapshot.referenced_count(),
                last_scan: Some(snapshot.last_scan_timestamp),
                approx_size_bytes: serde_json::to_vec(snapshot).map(|b| b.len()).unwrap_or(0),
            },
            None => CacheStats::default(),
        }
    }
}
