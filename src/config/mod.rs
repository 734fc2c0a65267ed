//! Layered configuration.
//!
//! Configuration is merged field-by-field from four tiers, later tiers
//! winning:
//! 1. **Defaults** - [`Config::default`]
//! 2. **Project** - `$CWD/task-tree/config.yaml`
//! 3. **User** - `~/.task-tree/config.yaml`
//! 4. **Environment** - variables below
//!
//! An explicit config file (`--config` or `TASK_TREE_CONFIG_PATH`) replaces
//! tier discovery entirely.
//!
//! ## Environment Variables
//! - `TASK_TREE_CONFIG_PATH` - Explicit config file
//! - `TASK_TREE_STORE_PATH` - Task document path
//! - `TASK_TREE_FORMAT` - Default output format (`json` or `markdown`)
//! - `TASK_TREE_PROJECT_DIR` - Project config dir (default: `./task-tree`)
//! - `TASK_TREE_USER_DIR` - User config dir (default: `~/.task-tree`)

mod loader;
mod merge;

pub use loader::{ConfigLoader, ConfigPaths};
pub use merge::{deep_merge, deep_merge_all};

use crate::format::OutputFormat;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

/// Where the task document lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path to the JSON task document. A `.gz` suffix stores it compressed.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from("task-tree/tasks.json")
}

/// How results are printed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
}

impl Config {
    /// Load configuration from a single YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }
}
