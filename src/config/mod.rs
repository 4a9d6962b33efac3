//! Configuration management for shai
//!
//! Settings live in `{config_dir}/shai/config.toml`. Every field has a
//! default so a missing file or a partial file both work; `save` writes
//! the full set back. Secrets never live here: the API key comes from the
//! environment.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Model requested when `--model` is not given
    pub model: String,
    /// Sampling temperature default (0.0 = deterministic)
    pub temperature: f32,
    /// Nucleus sampling default
    pub top_p: f32,
    /// OpenAI-compatible endpoint; `OPENAI_BASE_URL` overrides
    pub base_url: String,
    /// Per-request timeout for the completion endpoint
    pub request_timeout_secs: u64,
    /// When true, the shell execution prompt defaults to Execute
    /// instead of Abort
    pub default_execute_shell_cmd: bool,
    /// Override for the completion cache directory
    pub cache_dir: Option<PathBuf>,
    /// Override for the chat session directory
    pub sessions_dir: Option<PathBuf>,
    /// Override for the custom role directory
    pub roles_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            temperature: 0.0,
            top_p: 1.0,
            base_url: "https://api.openai.com/v1".to_string(),
            request_timeout_secs: 60,
            default_execute_shell_cmd: false,
            cache_dir: None,
            sessions_dir: None,
            roles_dir: None,
        }
    }
}

impl Config {
    /// Load configuration from the default location or fall back to
    /// defaults when no file exists yet.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let dirs = project_dirs()?;
        let config_dir = dirs.config_dir();
        std::fs::create_dir_all(config_dir)?;
        Ok(config_dir.join("config.toml"))
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    /// Directory holding one file per cached completion
    pub fn cache_dir(&self) -> Result<PathBuf> {
        match &self.cache_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(project_dirs()?.cache_dir().to_path_buf()),
        }
    }

    /// Directory holding one JSON file per durable chat session
    pub fn sessions_dir(&self) -> Result<PathBuf> {
        match &self.sessions_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(project_dirs()?.data_dir().join("sessions")),
        }
    }

    /// Directory holding one JSON file per custom role
    pub fn roles_dir(&self) -> Result<PathBuf> {
        match &self.roles_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(project_dirs()?.config_dir().join("roles")),
        }
    }
}

fn project_dirs() -> Result<directories::ProjectDirs> {
    directories::ProjectDirs::from("", "", "shai")
        .ok_or_else(|| anyhow::anyhow!("could not determine a home directory"))
}
