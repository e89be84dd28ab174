//! Application configuration: catalog server access, list-provider
//! credentials and the identifier cache location.

mod loader;
mod types;
mod validate;

pub use loader::{load_config, load_config_from_str};
pub use types::{
    CacheConfig, CatalogServerConfig, Config, TmdbApiConfig, TraktApiConfig, TvdbApiConfig,
};
pub use validate::validate_config;

use thiserror::Error;

/// Errors that can occur loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found.
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    /// Failed to parse configuration.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Configuration failed validation.
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}
