//! Configuration loading
//!
//! `Config` is read from `~/.config/agent-chat/config.toml` when present and
//! falls back to defaults otherwise. Every section is optional; missing keys
//! take their default value.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::auth::DEFAULT_API_KEY_ENV;

/// Directory name under `~/.config`
pub const CONFIG_DIR_NAME: &str = "agent-chat";

/// Model endpoint used when nothing is configured
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai/";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

pub const DEFAULT_SESSION_ID: &str = "conversation_123";
pub const DEFAULT_SESSION_FILE: &str = "conversation_history_1.json";

/// Main configuration structure loaded from config.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub model: ModelConfig,
    pub session: SessionConfig,
    pub agents: AgentsConfig,
}

impl Config {
    /// Load configuration from the default path, falling back to defaults
    pub fn load() -> Result<Self> {
        match Self::default_config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Config::default()),
        }
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Get the config directory path (~/.config/agent-chat)
    pub fn config_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|p| p.join(".config").join(CONFIG_DIR_NAME))
    }

    /// Get the default config file path
    pub fn default_config_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("config.toml"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log file; stdout belongs to the conversation
    pub log_file: PathBuf,
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_file: std::env::temp_dir().join("agent-chat.log"),
            log_filter: "info,agent_chat=debug".to_string(),
        }
    }
}

/// Remote model endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub name: String,
    pub base_url: String,
    /// Name of the environment variable holding the bearer credential
    pub api_key_env: String,
    /// Whole-request timeout for blocking completions
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            timeout_secs: 120,
        }
    }
}

/// Persisted conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub id: String,
    pub path: PathBuf,
    /// Most recent items sent as context; `None` sends the whole history
    pub history_limit: Option<usize>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            id: DEFAULT_SESSION_ID.to_string(),
            path: PathBuf::from(DEFAULT_SESSION_FILE),
            history_limit: None,
        }
    }
}

/// Agent descriptors for the two front ends
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentsConfig {
    /// Descriptor built for every turn
    pub assistant: AgentConfig,
    /// Overrides applied on top of `assistant` by the streaming front end
    pub streaming: AgentOverride,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub name: String,
    pub instructions: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: "Assistant".to_string(),
            instructions: "Reply very concisely.".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentOverride {
    pub name: Option<String>,
    pub instructions: Option<String>,
}

impl Default for AgentOverride {
    fn default() -> Self {
        Self {
            name: Some("Joker".to_string()),
            instructions: Some("Always tell a joke.".to_string()),
        }
    }
}
