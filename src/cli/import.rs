//! Import subcommand for task-tree CLI
//!
//! Replaces every task with the contents of an exported document.

use clap::Args;
use std::path::PathBuf;

/// Arguments for the import subcommand
#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Path to the exported document (plain JSON or gzip)
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Validate the document and report what would be imported
    #[arg(long)]
    pub dry_run: bool,
}

impl ImportArgs {
    /// Describe the import mode for logging
    pub fn import_mode(&self) -> &'static str {
        if self.dry_run { "dry-run" } else { "replace" }
    }
}
