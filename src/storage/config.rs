use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::sync::window::WindowSpec;

pub const ACCESS_TOKEN_ENV: &str = "CALVIEW_ACCESS_TOKEN";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),
    #[error("Invalid config value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub provider: ProviderConfig,
    pub sync: SyncConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderConfig {
    pub base_url: String,
    pub access_token: String,
    pub page_size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncConfig {
    pub utc_offset_hours: i32,
    pub delta_window: WindowSpec,
    pub view_window: WindowSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageConfig {
    pub database_path: PathBuf,
}

impl Config {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn load_or_create() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            let config = Self::default();
            config.save_to(&config_path)?;
            Ok(config)
        }
    }

    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("calview-sync")
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    pub fn access_token(&self) -> String {
        std::env::var(ACCESS_TOKEN_ENV)
            .ok()
            .filter(|token| !token.is_empty())
            .unwrap_or_else(|| self.provider.access_token.clone())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.provider.page_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "provider.page_size".to_string(),
                message: "must be at least 1".to_string(),
            });
        }

        if !(-14..=14).contains(&self.sync.utc_offset_hours) {
            return Err(ConfigError::InvalidValue {
                key: "sync.utc_offset_hours".to_string(),
                message: format!("{} is outside -14..=14", self.sync.utc_offset_hours),
            });
        }

        for (key, window) in [
            ("sync.delta_window.span", &self.sync.delta_window),
            ("sync.view_window.span", &self.sync.view_window),
        ] {
            if window.span == 0 {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: "must be at least 1".to_string(),
                });
            }
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: ProviderConfig {
                base_url: "https://graph.microsoft.com/v1.0".to_string(),
                access_token: String::new(),
                page_size: 2,
            },
            sync: SyncConfig {
                utc_offset_hours: -8,
                delta_window: WindowSpec::months(2),
                view_window: WindowSpec::weeks(2),
            },
            storage: StorageConfig {
                database_path: Self::config_dir().join("calview.db"),
            },
        }
    }
}
