use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "vaultrefs",
    version,
    about = "Detect and cache media references across a markdown vault"
)]
pub struct Cli {
    /// Path to a vaultrefs.toml config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Force a fresh corpus scan for a catalog and print the results.
    Scan(CatalogArgs),
    /// Report cached (or default) reference status for a catalog.
    Status(CatalogArgs),
    /// Show reference cache statistics.
    Stats,
    /// Delete the reference cache.
    Clear,
    /// Check that the configured scan path is a directory.
    Validate,
}

#[derive(Debug, Args)]
pub struct CatalogArgs {
    /// JSON file holding the media catalog: an array of
    /// {"id", "filename"?, "kind": "image"|"video"} objects.
    #[arg(long, env = "VAULTREFS_CATALOG")]
    pub catalog: PathBuf,
}
