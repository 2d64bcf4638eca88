pub mod patterns;

pub use patterns::{generate_patterns, PatternKind, PatternSpec};

use tracing::debug;

use crate::scanner::DocumentText;
use crate::types::{DetectionSettings, MediaItem, ReferenceMap};

/// Decides, per catalog item, whether any acceptable pattern variant
/// occurs in document text. Detection is a pure function of
/// (content, items, settings).
#[derive(Debug, Clone)]
pub struct ReferenceDetector {
    settings: DetectionSettings,
}

impl ReferenceDetector {
    pub fn new(settings: DetectionSettings) -> Self {
        Self { settings }
    }

    pub fn update_settings(&mut self, settings: DetectionSettings) {
        self.settings = settings;
    }

    pub fn is_enabled(&self) -> bool {
        self.settings.enable_detection
    }

    /// Detects references within a single document's content. Items
    /// short-circuit to `true` on their first matching pattern; items
    /// with no match are `false`.
    pub fn detect(&self, content: &str, items: &[MediaItem]) -> ReferenceMap {
        let mut results: ReferenceMap = items
            .iter()
            .map(|item| (item.id.clone(), false))
            .collect();

        for item in items {
            let patterns = generate_patterns(item, &self.settings);
            if let Some(pattern) = patterns.iter().find(|p| p.matches(content)) {
                debug!(id = %item.id, kind = ?pattern.kind, "reference found");
                results.insert(item.id.clone(), true);
            }
        }

        results
    }

    /// Detects references across an entire corpus, OR-reducing per
    /// item: an item is referenced if it matches in at least one
    /// document, regardless of document order. Patterns are compiled
    /// once per item and evaluation stops at the first matching
    /// document.
    pub fn detect_across_corpus(
        &self,
        documents: &[DocumentText],
        items: &[MediaItem],
    ) -> ReferenceMap {
        let mut aggregated = ReferenceMap::with_capacity(items.len());

        for item in items {
            let patterns = generate_patterns(item, &self.settings);
            let referenced = documents.iter().any(|document| {
                patterns.iter().any(|pattern| pattern.matches(&document.content))
            });
            aggregated.insert(item.id.clone(), referenced);
        }

        let referenced_count = aggregated.values().filter(|&&r| r).count();
        debug!(
            referenced = referenced_count,
            total = items.len(),
            documents = documents.len(),
            "corpus detection complete"
        );

        aggregated
    }
}
