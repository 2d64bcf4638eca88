use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the detection engine. Public operations on the
/// manager never propagate these to callers; they degrade to default
/// results and log instead. The variants exist so internal layers can
/// report precisely what went wrong.
#[derive(Debug, Error)]
pub enum DetectionError {
    /// The configured scan path does not exist or is not a directory.
    /// Aborts a scan before any corpus I/O; a prior cache is left
    /// untouched.
    #[error("scan path does not exist or is not a directory: {0}")]
    InvalidScanPath(PathBuf),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot could not be serialized for persistence.
    #[error("cache encoding failed: {0}")]
    CacheEncoding(#[from] serde_json::Error),
}
