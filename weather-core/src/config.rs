use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{env, fs, path::PathBuf};
use thiserror::Error;

/// Environment variable that overrides the stored API key.
pub const ENV_API_KEY: &str = "WEATHER_API_KEY";

/// Raised when the engine cannot be constructed from the available
/// configuration. Deliberately outside the runtime fetch taxonomy:
/// a missing credential aborts startup, it is never retried.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("API key not found. Run `weather configure` or set WEATHER_API_KEY.")]
    MissingApiKey,

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// api_key = "..."
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// WeatherAPI.com credential.
    pub api_key: Option<String>,
}

impl Config {
    /// Resolve the credential used to construct the engine: the
    /// environment variable wins, then the config file.
    pub fn resolve_api_key(&self) -> Result<String, ConfigError> {
        self.resolve_with_env(env::var(ENV_API_KEY).ok())
    }

    fn resolve_with_env(&self, env_key: Option<String>) -> Result<String, ConfigError> {
        if let Some(key) = env_key {
            if !key.trim().is_empty() {
                return Ok(key);
            }
        }

        match &self.api_key {
            Some(key) if !key.trim().is_empty() => Ok(key.clone()),
            _ => Err(ConfigError::MissingApiKey),
        }
    }

    pub fn set_api_key(&mut self, api_key: String) {
        self.api_key = Some(api_key);
    }

    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            // First run: no config file, return empty.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weather-task", "weather-cli")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }
}
