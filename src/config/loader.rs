//! Configuration loader with tier-based merging.

use super::merge::deep_merge_all;
use super::types::{Config, Prompts};
use anyhow::Result;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const CONFIG_PATH_ENV: &str = "PROJECT_PROGRESS_CONFIG_PATH";
pub const DB_PATH_ENV: &str = "PROJECT_PROGRESS_DB_PATH";
pub const USER_DIR_ENV: &str = "PROJECT_PROGRESS_USER_DIR";
pub const PROJECT_DIR_ENV: &str = "PROJECT_PROGRESS_PROJECT_DIR";

/// Configuration tier priority (lowest to highest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfigTier {
    Defaults = 0,
    Project = 1,
    User = 2,
    Environment = 3,
}

impl std::fmt::Display for ConfigTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigTier::Defaults => write!(f, "defaults"),
            ConfigTier::Project => write!(f, "project"),
            ConfigTier::User => write!(f, "user"),
            ConfigTier::Environment => write!(f, "environment"),
        }
    }
}

/// Directories searched for configuration files.
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub project_dir: Option<PathBuf>,
    pub user_dir: Option<PathBuf>,
}

impl Default for ConfigPaths {
    fn default() -> Self {
        Self::discover()
    }
}

impl ConfigPaths {
    /// Discover configuration directories from the environment and defaults.
    pub fn discover() -> Self {
        let user_dir = std::env::var(USER_DIR_ENV)
            .ok()
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|h| h.join(".project-progress")));

        let project_dir = std::env::var(PROJECT_DIR_ENV)
            .ok()
            .map(PathBuf::from)
            .or_else(|| Some(PathBuf::from("project-progress")));

        Self {
            project_dir,
            user_dir,
        }
    }

    pub fn with_dirs(project_dir: Option<PathBuf>, user_dir: Option<PathBuf>) -> Self {
        Self {
            project_dir,
            user_dir,
        }
    }

    /// Existing tier files named `file_name`, lowest priority first.
    fn tier_files(&self, file_name: &str) -> Vec<(ConfigTier, PathBuf)> {
        [
            (ConfigTier::Project, self.project_dir.as_ref()),
            (ConfigTier::User, self.user_dir.as_ref()),
        ]
        .into_iter()
        .filter_map(|(tier, dir)| dir.map(|d| (tier, d.join(file_name))))
        .filter(|(_, path)| path.exists())
        .collect()
    }
}

/// Read a YAML file as a generic value. Unreadable or invalid files are
/// skipped with a warning so one bad tier does not block startup.
fn read_yaml(tier: ConfigTier, path: &Path) -> Option<Value> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!(tier = %tier, path = %path.display(), error = %e, "Cannot read config file");
            return None;
        }
    };
    match serde_yaml::from_str::<Value>(&content) {
        Ok(value) => {
            debug!(tier = %tier, path = %path.display(), "Loaded config file");
            Some(value)
        }
        Err(e) => {
            warn!(tier = %tier, path = %path.display(), error = %e, "Invalid YAML in config file");
            None
        }
    }
}

/// Configuration loader that handles tier-based merging.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    pub paths: ConfigPaths,
    config: Config,
    /// Highest-priority config file that contributed, if any.
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Load configuration from all tiers.
    pub fn load() -> Result<Self> {
        Self::load_with_paths(ConfigPaths::discover())
    }

    /// Load configuration with explicit tier directories.
    pub fn load_with_paths(paths: ConfigPaths) -> Result<Self> {
        // An explicit file replaces the file tiers entirely
        if let Ok(explicit_path) = std::env::var(CONFIG_PATH_ENV) {
            let path = PathBuf::from(&explicit_path);
            let mut config = Config::load(&path)?;
            Self::apply_env_overrides(&mut config);
            return Ok(Self {
                paths,
                config,
                config_path: Some(path),
            });
        }

        let mut values = vec![serde_json::to_value(Config::default())?];
        let mut config_path = None;
        for (tier, path) in paths.tier_files("config.yaml") {
            if let Some(value) = read_yaml(tier, &path) {
                values.push(value);
                config_path = Some(path);
            }
        }

        let mut config: Config = serde_json::from_value(deep_merge_all(values))?;
        Self::apply_env_overrides(&mut config);

        Ok(Self {
            paths,
            config,
            config_path,
        })
    }

    fn apply_env_overrides(config: &mut Config) {
        if let Ok(db_path) = std::env::var(DB_PATH_ENV) {
            config.server.db_path = PathBuf::from(db_path);
        }
    }

    /// Load prompts with tier merging. Falls back to defaults on bad input.
    pub fn load_prompts(&self) -> Prompts {
        let mut values: Vec<Value> = Vec::new();
        if let Ok(defaults) = serde_json::to_value(Prompts::default()) {
            values.push(defaults);
        }
        for (tier, path) in self.paths.tier_files("prompts.yaml") {
            values.extend(read_yaml(tier, &path));
        }
        match serde_json::from_value(deep_merge_all(values)) {
            Ok(prompts) => prompts,
            Err(e) => {
                warn!(error = %e, "Ignoring malformed prompts configuration");
                Prompts::default()
            }
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    pub fn into_config(self) -> Config {
        self.config
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }
}
