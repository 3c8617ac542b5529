//! Configuration module for Quarry.
//!
//! Handles the settings file and environment variable expansion.

mod settings;

pub use settings::{
    expand_env_vars, ModelSettings, PaginationSettings, RequestSettings, Settings, SettingsError,
};
