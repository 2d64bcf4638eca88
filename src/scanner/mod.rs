pub mod discovery;

pub use discovery::{CorpusScanner, DocumentHandle, DocumentText};
