use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::detector::ReferenceDetector;
use crate::scanner::CorpusScanner;
use crate::storage::CacheStore;
use crate::types::{
    CacheSnapshot, CacheStats, DetectionError, DetectionSettings, MediaItem, ReferenceMap,
};

/// Orchestrates scanner, detector, and cache store: serves cached
/// results while they are trustworthy, otherwise schedules at most one
/// concurrent background rescan and answers with a conservative
/// default. Long-lived; owns all mutable scan state.
#[derive(Debug, Clone)]
pub struct ReferenceManager {
    inner: Arc<ManagerInner>,
}

#[derive(Debug)]
struct ManagerInner {
    settings: RwLock<DetectionSettings>,
    cache: CacheStore,
    /// Serializes physical scans; exactly one may run at a time.
    scan_lock: tokio::sync::Mutex<()>,
    /// Handle to the in-flight background scan, if any. `force_scan`
    /// joins it before starting its own pass.
    background: Mutex<Option<JoinHandle<()>>>,
}

impl ReferenceManager {
    pub fn new(settings: DetectionSettings, cache_path: impl Into<PathBuf>) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                settings: RwLock::new(settings),
                cache: CacheStore::new(cache_path),
                scan_lock: tokio::sync::Mutex::new(()),
                background: Mutex::new(None),
            }),
        }
    }

    /// Warms the in-memory cache copy. A no-op when detection is
    /// disabled.
    pub async fn initialize(&self) {
        if !self.is_enabled() {
            info!("reference detection is disabled");
            return;
        }
        if let Some(snapshot) = self.inner.cache.load().await {
            info!(entries = snapshot.references.len(), "reference cache warmed");
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.settings.read().enable_detection
    }

    /// True while a scan is executing or a background scan task is
    /// still alive.
    pub fn is_scanning(&self) -> bool {
        if self.inner.scan_lock.try_lock().is_err() {
            return true;
        }
        self.inner
            .background
            .lock()
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Reference status for the given items. Serves the cache when it
    /// is present, unexpired, and fingerprint-fresh; on any miss,
    /// dispatches a single background rescan and returns an immediate
    /// all-false default. Never blocks on the scan it triggers.
    pub async fn get_status(&self, items: &[MediaItem]) -> ReferenceMap {
        let settings = self.inner.settings.read().clone();
        if !settings.enable_detection {
            return all_false(items);
        }

        if let Some(cached) = self.cached_references(items, &settings).await {
            return cached;
        }

        if self.trigger_background_scan(items) {
            debug!("cache miss, background scan dispatched");
        } else {
            debug!("cache miss, scan already in progress");
        }
        all_false(items)
    }

    /// Synchronous rescan path: waits out any in-flight background scan
    /// (scans never interleave), then performs a fresh scan regardless
    /// of cache freshness and returns its results. Degrades to an
    /// all-false map on scan failure.
    pub async fn force_scan(&self, items: &[MediaItem]) -> ReferenceMap {
        let pending = self.inner.background.lock().take();
        if let Some(handle) = pending {
            debug!("waiting for in-flight scan before forced rescan");
            if let Err(e) = handle.await {
                warn!(error = %e, "in-flight scan task failed");
            }
        }

        let _scan = self.inner.scan_lock.lock().await;
        info!(items = items.len(), "forced rescan");
        match self.inner.perform_scan(items).await {
            Ok(references) => references,
            Err(e) => {
                warn!(error = %e, "forced rescan failed");
                all_false(items)
            }
        }
    }

    pub async fn clear_cache(&self) -> bool {
        info!("clearing reference cache");
        self.inner.cache.clear().await
    }

    pub fn get_stats(&self) -> CacheStats {
        self.inner.cache.stats()
    }

    /// Replaces the live settings. Subsequent validity checks compare
    /// against the new values, implicitly invalidating any cache whose
    /// settings snapshot no longer matches.
    pub fn update_settings(&self, settings: DetectionSettings) {
        *self.inner.settings.write() = settings;
    }

    /// Serves the cache if it is valid for the current settings and
    /// corpus. `None` means any kind of miss: absent, corrupt, expired,
    /// or stale.
    async fn cached_references(
        &self,
        items: &[MediaItem],
        settings: &DetectionSettings,
    ) -> Option<ReferenceMap> {
        let snapshot = self.inner.cache.load().await?;

        if self.inner.cache.is_expired(&snapshot, settings) {
            return None;
        }

        let scanner = CorpusScanner::new(settings.clone());
        let documents = match scanner.list_documents().await {
            Ok(documents) => documents,
            Err(e) => {
                debug!(error = %e, "could not recompute fingerprint");
                return None;
            }
        };
        let fresh = scanner.compute_fingerprint(&documents);
        if self.inner.cache.is_stale(&snapshot, &fresh) {
            return None;
        }

        debug!(items = items.len(), "serving references from cache");
        Some(
            items
                .iter()
                .map(|item| {
                    let referenced = snapshot.references.get(&item.id).copied().unwrap_or(false);
                    (item.id.clone(), referenced)
                })
                .collect(),
        )
    }

    /// Dispatches a background scan unless one is already in flight.
    /// Returns whether a new scan task was spawned (single-flight: the
    /// duplicate trigger is a no-op against the existing task).
    fn trigger_background_scan(&self, items: &[MediaItem]) -> bool {
        let mut slot = self.inner.background.lock();
        if let Some(handle) = slot.as_ref() {
            if !handle.is_finished() {
                return false;
            }
        }

        let inner = Arc::clone(&self.inner);
        let items = items.to_vec();
        *slot = Some(tokio::spawn(async move {
            let _scan = inner.scan_lock.lock().await;
            if let Err(e) = inner.perform_scan(&items).await {
                warn!(error = %e, "background scan failed");
            }
        }));
        true
    }
}

impl ManagerInner {
    /// One full scan cycle: validate, list, read, detect, fingerprint,
    /// persist. Callers must hold `scan_lock`. A persist failure is
    /// logged but the in-memory result is still returned.
    async fn perform_scan(&self, items: &[MediaItem]) -> Result<ReferenceMap, DetectionError> {
        let settings = self.settings.read().clone();
        let scanner = CorpusScanner::new(settings.clone());
        let detector = ReferenceDetector::new(settings.clone());

        if !scanner.validate_path().await {
            return Err(DetectionError::InvalidScanPath(settings.scan_path.clone()));
        }

        let handles = scanner.list_documents().await?;
        info!(documents = handles.len(), items = items.len(), "scanning corpus");

        let documents = scanner.read_all(&handles).await;
        let references = detector.detect_across_corpus(&documents, items);
        let fingerprint = scanner.compute_fingerprint(&handles);

        let snapshot = CacheSnapshot::new(&settings, fingerprint, references.clone());
        if let Err(e) = self.cache.save(&snapshot).await {
            warn!(error = %e, "failed to persist scan results; next query will rescan");
        }

        info!(
            referenced = snapshot.referenced_count(),
            total = items.len(),
            "corpus scan complete"
        );
        Ok(references)
    }
}

fn all_false(items: &[MediaItem]) -> ReferenceMap {
    items.iter().map(|item| (item.id.clone(), false)).collect()
}
