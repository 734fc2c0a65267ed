//! Configuration loader with tier-based merging.

use super::Config;
use super::merge::deep_merge_all;
use crate::format::OutputFormat;
use anyhow::Result;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const CONFIG_FILE: &str = "config.yaml";

/// Directories searched for `config.yaml`.
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    /// Project-level config directory
    pub project_dir: Option<PathBuf>,
    /// User-level config directory
    pub user_dir: Option<PathBuf>,
}

impl Default for ConfigPaths {
    fn default() -> Self {
        Self::discover()
    }
}

impl ConfigPaths {
    /// Discover configuration directories from environment and defaults.
    pub fn discover() -> Self {
        // Project dir: TASK_TREE_PROJECT_DIR or $CWD/task-tree
        let project_dir = std::env::var("TASK_TREE_PROJECT_DIR")
            .ok()
            .map(PathBuf::from)
            .or_else(|| Some(PathBuf::from("task-tree")));

        // User dir: TASK_TREE_USER_DIR or ~/.task-tree
        let user_dir = std::env::var("TASK_TREE_USER_DIR")
            .ok()
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|h| h.join(".task-tree")));

        Self {
            project_dir,
            user_dir,
        }
    }

    /// Create paths with explicit directories.
    pub fn with_dirs(project_dir: Option<PathBuf>, user_dir: Option<PathBuf>) -> Self {
        Self {
            project_dir,
            user_dir,
        }
    }
}

/// Configuration loader that handles tier-based merging.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    pub paths: ConfigPaths,
    config: Config,
    /// Config files that contributed, lowest tier first.
    sources: Vec<PathBuf>,
}

impl ConfigLoader {
    /// Load from an explicit file if given (or `TASK_TREE_CONFIG_PATH`),
    /// otherwise from all discovered tiers.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let explicit = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var("TASK_TREE_CONFIG_PATH").ok().map(PathBuf::from));

        match explicit {
            Some(path) => Self::load_file(ConfigPaths::discover(), path),
            None => Self::load_with_paths(ConfigPaths::discover()),
        }
    }

    /// Load a single explicit file, then apply environment overrides.
    fn load_file(paths: ConfigPaths, path: PathBuf) -> Result<Self> {
        let mut config = Config::load(&path)?;
        Self::apply_env_overrides(&mut config);
        Ok(Self {
            paths,
            config,
            sources: vec![path],
        })
    }

    /// Load configuration from explicit tier directories.
    pub fn load_with_paths(paths: ConfigPaths) -> Result<Self> {
        let mut tiers: Vec<Value> = vec![serde_json::to_value(Config::default())?];
        let mut sources = Vec::new();

        for dir in [&paths.project_dir, &paths.user_dir].into_iter().flatten() {
            let file = dir.join(CONFIG_FILE);
            if let Some(value) = read_yaml_tier(&file) {
                tiers.push(value);
                sources.push(file);
            }
        }

        let mut config: Config = serde_json::from_value(deep_merge_all(tiers))?;
        Self::apply_env_overrides(&mut config);

        debug!(sources = ?sources, "Loaded configuration");

        Ok(Self {
            paths,
            config,
            sources,
        })
    }

    /// Apply environment variable overrides to config.
    fn apply_env_overrides(config: &mut Config) {
        if let Ok(store_path) = std::env::var("TASK_TREE_STORE_PATH") {
            config.store.path = PathBuf::from(store_path);
        }

        if let Ok(format) = std::env::var("TASK_TREE_FORMAT") {
            match format.parse::<OutputFormat>() {
                Ok(format) => config.output.format = format,
                Err(e) => warn!("Ignoring TASK_TREE_FORMAT: {}", e),
            }
        }
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get mutable access to the configuration.
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Consume the loader and return the configuration.
    pub fn into_config(self) -> Config {
        self.config
    }

    /// Config files that contributed to the result.
    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }
}

/// Read one tier's YAML. Unreadable or malformed files are skipped with a
/// warning so a broken user config never blocks the CLI.
fn read_yaml_tier(file: &Path) -> Option<Value> {
    if !file.exists() {
        return None;
    }
    let content = match std::fs::read_to_string(file) {
        Ok(content) => content,
        Err(e) => {
            warn!("Skipping config {}: {}", file.display(), e);
            return None;
        }
    };
    match serde_yaml::from_str::<Value>(&content) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Skipping malformed config {}: {}", file.display(), e);
            None
        }
    }
}
