use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Media catalog server (required).
    pub catalog: CatalogServerConfig,
    /// Trakt list API credentials.
    #[serde(default)]
    pub trakt: Option<TraktApiConfig>,
    /// TMDb API credentials (required for weighted sorting and IMDb charts).
    #[serde(default)]
    pub tmdb: Option<TmdbApiConfig>,
    /// TVDb API credentials.
    #[serde(default)]
    pub tvdb: Option<TvdbApiConfig>,
    #[serde(default)]
    pub cache: CacheConfig,
    /// Directory holding recipe files.
    #[serde(default = "default_recipe_dir")]
    pub recipe_dir: PathBuf,
}

/// Media catalog server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CatalogServerConfig {
    /// Base URL (e.g. "http://localhost:32400").
    pub base_url: String,
    /// Access token.
    pub token: String,
}

/// Trakt API configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TraktApiConfig {
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    /// OAuth access token, when the configured lists require one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

/// TMDb API configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TmdbApiConfig {
    pub api_key: String,
    /// Base URL (default: https://api.themoviedb.org/3).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

/// TVDb API configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TvdbApiConfig {
    pub username: String,
    pub api_key: String,
    pub user_key: String,
    /// Base URL (default: https://api.thetvdb.com).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

/// Identifier cache configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_path")]
    pub path: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: default_cache_path(),
        }
    }
}

fn default_cache_path() -> PathBuf {
    PathBuf::from("frontrow-ids.db")
}

fn default_recipe_dir() -> PathBuf {
    PathBuf::from("recipes")
}
