//! TOML-based configuration for Quarry.
//!
//! Supports a config file (quarry.toml) with environment variable expansion.
//!
//! Example configuration:
//! ```toml
//! [request]
//! strict_query_params = true
//! default_api_version = ""
//!
//! [pagination]
//! default_page_size = 500
//! max_page_size = 10000
//!
//! [model]
//! path = "${QUARRY_MODEL}"
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::pagination::{PageLimits, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

const CONFIG_ENV_VAR: &str = "QUARRY_CONFIG";

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Query parameter handling.
    pub request: RequestSettings,

    /// Page size limits.
    pub pagination: PaginationSettings,

    /// Model file location.
    pub model: ModelSettings,
}

/// Query parameter handling.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RequestSettings {
    /// Reject query parameters outside the JSON:API vocabulary.
    pub strict_query_params: bool,

    /// API version used to resolve type aliases.
    pub default_api_version: String,
}

impl Default for RequestSettings {
    fn default() -> Self {
        Self {
            strict_query_params: true,
            default_api_version: String::new(),
        }
    }
}

/// Page size limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PaginationSettings {
    pub default_page_size: u32,
    pub max_page_size: u32,
}

impl Default for PaginationSettings {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
        }
    }
}

/// Model file location.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ModelSettings {
    /// Path to the model TOML (supports ${ENV_VAR} expansion).
    pub path: Option<String>,
}

impl ModelSettings {
    /// The model path with environment variables expanded.
    pub fn resolved_path(&self) -> Result<Option<PathBuf>, SettingsError> {
        self.path
            .as_deref()
            .map(|path| expand_env_vars(path).map(PathBuf::from))
            .transpose()
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&content)?;
        settings.validate()?;
        tracing::debug!(path = %path.display(), "loaded settings");
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `QUARRY_CONFIG`
    /// 2. `./quarry.toml`
    /// 3. `~/.config/quarry/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var(CONFIG_ENV_VAR) {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("quarry.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("quarry").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Settings::default())
    }

    /// Reject settings that cannot produce a usable page window.
    pub fn validate(&self) -> Result<(), SettingsError> {
        let pagination = &self.pagination;
        if pagination.default_page_size == 0 {
            return Err(SettingsError::InvalidConfig(
                "pagination.default_page_size must be greater than zero".to_string(),
            ));
        }
        if pagination.default_page_size > pagination.max_page_size {
            return Err(SettingsError::InvalidConfig(format!(
                "pagination.default_page_size ({}) exceeds pagination.max_page_size ({})",
                pagination.default_page_size, pagination.max_page_size
            )));
        }
        Ok(())
    }

    pub fn page_limits(&self) -> PageLimits {
        PageLimits {
            default_limit: self.pagination.default_page_size,
            max_limit: self.pagination.max_page_size,
        }
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }

        let var_name: String = if chars.next_if_eq(&'{').is_some() {
            chars.by_ref().take_while(|&ch| ch != '}').collect()
        } else {
            // $VAR ends at the first non-alphanumeric/underscore
            std::iter::from_fn(|| chars.next_if(|ch| ch.is_alphanumeric() || *ch == '_')).collect()
        };

        if var_name.is_empty() {
            // Just a lone $, keep it
            result.push('$');
            continue;
        }
        let value = env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
        result.push_str(&value);
    }

    Ok(result)
}
