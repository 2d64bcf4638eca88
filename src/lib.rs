pub mod types;
pub mod scanner;
pub mod detector;
pub mod storage;
pub mod manager;
pub mod config;
pub mod cli;
pub mod cli_types;

// Re-export commonly used types
pub use types::*;
pub use scanner::{CorpusScanner, DocumentHandle, DocumentText};
pub use detector::{generate_patterns, PatternKind, PatternSpec, ReferenceDetector};
pub use storage::CacheStore;
pub use manager::ReferenceManager;
pub use config::AppConfig;
pub use cli::CliApp;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
