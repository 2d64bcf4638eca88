use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::types::{DetectionError, DetectionSettings, SettingsSnapshot};

/// Extensions treated as scannable text documents.
const TEXT_EXTENSIONS: &[&str] = &["md", "markdown"];

/// Documents are read in batches of this size, with a cooperative yield
/// between batches so a scan never monopolizes the executor thread.
const READ_YIELD_BATCH: usize = 10;

/// A candidate document discovered during listing. The modification
/// time is captured at listing time so the fingerprint describes the
/// corpus as it was enumerated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentHandle {
    pub path: PathBuf,
    pub modified: SystemTime,
}

/// A fully read document, ready for detection.
#[derive(Debug, Clone)]
pub struct DocumentText {
    pub path: PathBuf,
    pub content: String,
}

/// Enumerates and reads the text corpus under the configured scan path,
/// and fingerprints the scanned population for staleness checks.
#[derive(Debug, Clone)]
pub struct CorpusScanner {
    settings: DetectionSettings,
}

impl CorpusScanner {
    pub fn new(settings: DetectionSettings) -> Self {
        Self { settings }
    }

    pub fn update_settings(&mut self, settings: DetectionSettings) {
        self.settings = settings;
    }

    /// True only if the scan path resolves to an existing directory.
    pub async fn validate_path(&self) -> bool {
        match tokio::fs::metadata(&self.settings.scan_path).await {
            Ok(meta) => meta.is_dir(),
            Err(_) => false,
        }
    }

    /// Lists every text document under the scan path. Fails with
    /// `InvalidScanPath` when the path is missing or not a directory;
    /// individual unreadable entries are skipped with a warning.
    pub async fn list_documents(&self) -> Result<Vec<DocumentHandle>, DetectionError> {
        let root = &self.settings.scan_path;
        match tokio::fs::metadata(root).await {
            Ok(meta) if meta.is_dir() => {}
            _ => return Err(DetectionError::InvalidScanPath(root.clone())),
        }

        let documents = if self.settings.include_subfolders {
            self.walk_recursive(root)
        } else {
            self.list_direct_children(root)?
        };

        debug!(
            count = documents.len(),
            path = %root.display(),
            "listed corpus documents"
        );
        Ok(documents)
    }

    fn walk_recursive(&self, root: &Path) -> Vec<DocumentHandle> {
        let mut documents = Vec::new();
        for entry in WalkDir::new(root).follow_links(false) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "skipping unreadable directory entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() || !is_text_document(entry.path()) {
                continue;
            }
            match entry.metadata() {
                Ok(meta) => documents.push(DocumentHandle {
                    path: entry.path().to_path_buf(),
                    modified: meta.modified().unwrap_or(UNIX_EPOCH),
                }),
                Err(e) => {
                    warn!(path = %entry.path().display(), error = %e, "skipping document without metadata");
                }
            }
        }
        documents
    }

    fn list_direct_children(&self, root: &Path) -> Result<Vec<DocumentHandle>, DetectionError> {
        let mut documents = Vec::new();
        for entry in std::fs::read_dir(root)? {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "skipping unreadable directory entry");
                    continue;
                }
            };
            let path = entry.path();
            if !path.is_file() || !is_text_document(&path) {
                continue;
            }
            match entry.metadata() {
                Ok(meta) => documents.push(DocumentHandle {
                    path,
                    modified: meta.modified().unwrap_or(UNIX_EPOCH),
                }),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping document without metadata");
                }
            }
        }
        Ok(documents)
    }

    /// Reads every listed document. A document that fails to read is
    /// skipped, never fatal to the batch. Yields to the scheduler after
    /// every `READ_YIELD_BATCH` documents.
    pub async fn read_all(&self, documents: &[DocumentHandle]) -> Vec<DocumentText> {
        let mut contents = Vec::with_capacity(documents.len());
        for (index, document) in documents.iter().enumerate() {
            match tokio::fs::read_to_string(&document.path).await {
                Ok(content) => contents.push(DocumentText {
                    path: document.path.clone(),
                    content,
                }),
                Err(e) => {
                    warn!(path = %document.path.display(), error = %e, "failed to read document, skipping");
                }
            }
            if (index + 1) % READ_YIELD_BATCH == 0 {
                tokio::task::yield_now().await;
            }
        }
        contents
    }

    /// Deterministic digest of the scanned population: every document's
    /// (path, mtime) pair plus the active settings snapshot. Documents
    /// are sorted by path first so storage listing order cannot change
    /// the result.
    pub fn compute_fingerprint(&self, documents: &[DocumentHandle]) -> String {
        let mut sorted: Vec<&DocumentHandle> = documents.iter().collect();
        sorted.sort_by(|a, b| a.path.cmp(&b.path));

        let mut hasher = blake3::Hasher::new();
        for document in sorted {
            hasher.update(document.path.to_string_lossy().as_bytes());
            hasher.update(&[0]);
            let mtime_millis = document
                .modified
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis())
                .unwrap_or(0);
            hasher.update(&mtime_millis.to_le_bytes());
        }

        let snapshot = SettingsSnapshot::from(&self.settings);
        if let Ok(encoded) = serde_json::to_vec(&snapshot) {
            hasher.update(&encoded);
        }

        hasher.finalize().to_hex().to_string()
    }
}

fn is_text_document(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| TEXT_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn scanner_for(dir: &TempDir, include_subfolders: bool) -> CorpusScanner {
        CorpusScanner::new(DetectionSettings {
            scan_path: dir.path().to_path_buf(),
            include_subfolders,
            ..Default::default()
        })
    }

    fn write_note(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[tokio::test]
    async fn test_validate_path() {
        let dir = TempDir::new().unwrap();
        let scanner = scanner_for(&dir, true);
        assert!(scanner.validate_path().await);

        let missing = CorpusScanner::new(DetectionSettings {
            scan_path: dir.path().join("nope"),
            ..Default::default()
        });
        assert!(!missing.validate_path().await);

        let file_path = write_note(dir.path(), "note.md", "x");
        let not_a_dir = CorpusScanner::new(DetectionSettings {
            scan_path: file_path,
            ..Default::default()
        });
        assert!(!not_a_dir.validate_path().await);
    }

    #[tokio::test]
    async fn test_list_documents_invalid_path() {
        let dir = TempDir::new().unwrap();
        let scanner = CorpusScanner::new(DetectionSettings {
            scan_path: dir.path().join("missing"),
            ..Default::default()
        });
        let err = scanner.list_documents().await.unwrap_err();
        assert!(matches!(err, DetectionError::InvalidScanPath(_)));
    }

    #[tokio::test]
    async fn test_list_documents_filters_by_extension() {
        let dir = TempDir::new().unwrap();
        write_note(dir.path(), "a.md", "one");
        write_note(dir.path(), "b.markdown", "two");
        write_note(dir.path(), "c.txt", "not markdown");
        write_note(dir.path(), "d.jpg", "binary-ish");

        let scanner = scanner_for(&dir, true);
        let mut names: Vec<String> = scanner
            .list_documents()
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.path.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        names.sort();
        assert_eq!(names, vec!["a.md", "b.markdown"]);
    }

    #[tokio::test]
    async fn test_list_documents_respects_subfolder_setting() {
        let dir = TempDir::new().unwrap();
        write_note(dir.path(), "top.md", "top");
        let nested = dir.path().join("nested");
        std::fs::create_dir(&nested).unwrap();
        write_note(&nested, "deep.md", "deep");

        let recursive = scanner_for(&dir, true);
        assert_eq!(recursive.list_documents().await.unwrap().len(), 2);

        let flat = scanner_for(&dir, false);
        let documents = flat.list_documents().await.unwrap();
        assert_eq!(documents.len(), 1);
        assert!(documents[0].path.ends_with("top.md"));
    }

    #[tokio::test]
    async fn test_read_all_skips_unreadable_documents() {
        let dir = TempDir::new().unwrap();
        write_note(dir.path(), "keep.md", "kept content");
        let doomed = write_note(dir.path(), "gone.md", "soon deleted");

        let scanner = scanner_for(&dir, true);
        let documents = scanner.list_documents().await.unwrap();
        assert_eq!(documents.len(), 2);

        // Delete one file between listing and reading; the read must
        // skip it and still return the rest.
        std::fs::remove_file(&doomed).unwrap();
        let contents = scanner.read_all(&documents).await;
        assert_eq!(contents.len(), 1);
        assert_eq!(contents[0].content, "kept content");
    }

    #[tokio::test]
    async fn test_read_all_handles_large_batches() {
        let dir = TempDir::new().unwrap();
        for i in 0..25 {
            write_note(dir.path(), &format!("note{i:02}.md"), &format!("note {i}"));
        }
        let scanner = scanner_for(&dir, true);
        let documents = scanner.list_documents().await.unwrap();
        let contents = scanner.read_all(&documents).await;
        assert_eq!(contents.len(), 25);
    }

    #[test]
    fn test_fingerprint_is_order_independent() {
        let dir = TempDir::new().unwrap();
        let scanner = scanner_for(&dir, true);
        let now = SystemTime::now();
        let a = DocumentHandle {
            path: PathBuf::from("a.md"),
            modified: now,
        };
        let b = DocumentHandle {
            path: PathBuf::from("b.md"),
            modified: now,
        };
        let forward = scanner.compute_fingerprint(&[a.clone(), b.clone()]);
        let reversed = scanner.compute_fingerprint(&[b, a]);
        assert_eq!(forward, reversed);
    }

    #[test]
    fn test_fingerprint_changes_with_corpus_and_settings() {
        let dir = TempDir::new().unwrap();
        let scanner = scanner_for(&dir, true);
        let now = SystemTime::now();
        let a = DocumentHandle {
            path: PathBuf::from("a.md"),
            modified: now,
        };
        let base = scanner.compute_fingerprint(&[a.clone()]);

        // Adding a document changes the fingerprint.
        let b = DocumentHandle {
            path: PathBuf::from("b.md"),
            modified: now,
        };
        assert_ne!(base, scanner.compute_fingerprint(&[a.clone(), b]));

        // Touching a document's mtime changes the fingerprint.
        let touched = DocumentHandle {
            path: a.path.clone(),
            modified: now + std::time::Duration::from_secs(5),
        };
        assert_ne!(base, scanner.compute_fingerprint(&[touched]));

        // Changing a relevant setting changes the fingerprint.
        let other = CorpusScanner::new(DetectionSettings {
            scan_path: dir.path().to_path_buf(),
            include_subfolders: false,
            ..Default::default()
        });
        assert_ne!(base, other.compute_fingerprint(&[a]));
    }
}
