use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::cli_types::{CatalogArgs, Command};
use crate::config::AppConfig;
use crate::manager::ReferenceManager;
use crate::scanner::CorpusScanner;
use crate::types::{MediaItem, ReferenceMap};

/// Drives the exposed engine operations from the command line. The
/// catalog is supplied as a JSON file, mirroring how a hosting
/// application would hand the current item sequence to the engine.
pub struct CliApp {
    config: AppConfig,
    manager: ReferenceManager,
    verbose: bool,
}

impl CliApp {
    pub fn new(config: AppConfig, verbose: bool) -> Self {
        let manager =
            ReferenceManager::new(config.detection.clone(), config.cache.path.clone());
        Self {
            config,
            manager,
            verbose,
        }
    }

    pub async fn run(&self, command: Command) -> Result<()> {
        self.manager.initialize().await;
        match command {
            Command::Scan(args) => self.scan(&args).await,
            Command::Status(args) => self.status(&args).await,
            Command::Stats => self.stats(),
            Command::Clear => self.clear().await,
            Command::Validate => self.validate().await,
        }
    }

    async fn scan(&self, args: &CatalogArgs) -> Result<()> {
        let items = load_catalog(&args.catalog)?;
        info!(items = items.len(), "forcing corpus rescan");
        let references = self.manager.force_scan(&items).await;
        self.print_references(&items, &references);
        Ok(())
    }

    async fn status(&self, args: &CatalogArgs) -> Result<()> {
        let items = load_catalog(&args.catalog)?;
        let references = self.manager.get_status(&items).await;
        if self.manager.is_scanning() {
            println!("(cache miss: a background rescan is running, statuses are defaults)");
        }
        self.print_references(&items, &references);
        Ok(())
    }

    fn stats(&self) -> Result<()> {
        let stats = self.manager.get_stats();
        println!("entries:    {}", stats.total_entries);
        println!("referenced: {}", stats.referenced_count);
        match stats.last_scan {
            Some(at) => println!("last scan:  {}", at.to_rfc3339()),
            None => println!("last scan:  never"),
        }
        println!("size:       {} bytes", stats.approx_size_bytes);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        if self.manager.clear_cache().await {
            println!("reference cache cleared");
            Ok(())
        } else {
            anyhow::bail!("failed to clear reference cache")
        }
    }

    async fn validate(&self) -> Result<()> {
        let scanner = CorpusScanner::new(self.config.detection.clone());
        if scanner.validate_path().await {
            println!(
                "scan path ok: {}",
                self.config.detection.scan_path.display()
            );
            Ok(())
        } else {
            anyhow::bail!(
                "scan path does not exist or is not a directory: {}",
                self.config.detection.scan_path.display()
            )
        }
    }

    fn print_references(&self, items: &[MediaItem], references: &ReferenceMap) {
        let referenced = references.values().filter(|&&r| r).count();
        println!("{referenced}/{} items referenced", items.len());
        for item in items {
            let is_referenced = references.get(&item.id).copied().unwrap_or(false);
            if self.verbose || is_referenced {
                let marker = if is_referenced { "ref" } else { "  -" };
                let name = item.filename.as_deref().unwrap_or("<no filename>");
                println!("  [{marker}] {} ({name})", item.id);
            }
        }
    }
}

fn load_catalog(path: &Path) -> Result<Vec<MediaItem>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read catalog file: {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse catalog file: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_catalog() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("catalog.json");
        std::fs::write(
            &path,
            r#"[
                {"id": "a", "filename": "sunset.jpg", "kind": "image"},
                {"id": "b", "kind": "video"}
            ]"#,
        )
        .unwrap();

        let items = load_catalog(&path).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, "a");
        assert!(items[1].filename.is_none());
    }

    #[test]
    fn test_load_catalog_missing_file() {
        let dir = TempDir::new().unwrap();
        assert!(load_catalog(&dir.path().join("nope.json")).is_err());
    }
}
