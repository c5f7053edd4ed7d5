//! Configuration types.

use crate::format::OutputFormat;
use crate::progress::{IssuePolicy, ProjectMode, ReconcileSettings};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Server configuration file contents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub reconcile: ReconcileConfig,
}

impl Config {
    /// Load configuration from a single file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        // Empty or comment-only YAML parses as null
        let config: Option<Config> = serde_yaml::from_str(&content)?;
        Ok(config.unwrap_or_default())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Default output format for progress reports (json or markdown).
    #[serde(default)]
    pub default_format: OutputFormat,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("project-progress/progress.db")
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            default_format: OutputFormat::default(),
        }
    }
}

/// Reconciliation behavior.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// `fold`: issue tasks count as not started and may be reassigned.
    /// `exclude`: issue tasks are left alone.
    #[serde(default)]
    pub issue_policy: IssuePolicy,

    /// Default project mode: `per_goal` or `flatten`.
    #[serde(default)]
    pub project_mode: ProjectMode,

    /// Reject batch writes to tasks that changed after they were read.
    #[serde(default)]
    pub strict_versions: bool,
}

impl From<ReconcileConfig> for ReconcileSettings {
    fn from(config: ReconcileConfig) -> Self {
        ReconcileSettings {
            issue_policy: config.issue_policy,
            project_mode: config.project_mode,
            strict_versions: config.strict_versions,
        }
    }
}

/// Tool description override.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolPrompt {
    pub description: String,
}

/// LLM-facing prompts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Prompts {
    /// Server instructions shown to the client.
    pub instructions: Option<String>,

    /// Tool description overrides by tool name.
    #[serde(default)]
    pub tools: HashMap<String, ToolPrompt>,
}

impl Prompts {
    pub fn get_tool_description(&self, name: &str) -> Option<&str> {
        self.tools.get(name).map(|t| t.description.as_str())
    }
}
