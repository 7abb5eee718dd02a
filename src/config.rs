use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ForklyConfig {
    /// Recipe API settings
    #[serde(default)]
    pub api: ApiConfig,
    /// Featured recipes fallback settings
    #[serde(default)]
    pub featured: FeaturedConfig,
    /// Favorites storage settings
    #[serde(default)]
    pub favorites: FavoritesConfig,
    /// Running under a preview or test harness: remote stores are never contacted
    #[serde(default)]
    pub preview: bool,
}

/// Configuration for the recipe API client
#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    /// API key (can also be set via SPOONACULAR_API_KEY)
    pub api_key: Option<String>,
    /// Base URL for the API (for proxies and tests)
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Connection/request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Timeout for loading a whole response in seconds
    #[serde(default = "default_resource_timeout")]
    pub resource_timeout_secs: u64,
    /// How long featured recipes stay cached, in seconds
    #[serde(default = "default_featured_cache_ttl")]
    pub featured_cache_ttl_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout(),
            resource_timeout_secs: default_resource_timeout(),
            featured_cache_ttl_secs: default_featured_cache_ttl(),
        }
    }
}

impl ApiConfig {
    /// Resolve the API key: config first, then environment
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| std::env::var("SPOONACULAR_API_KEY").ok())
            .filter(|key| !key.trim().is_empty())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn resource_timeout(&self) -> Duration {
        Duration::from_secs(self.resource_timeout_secs)
    }

    pub fn featured_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.featured_cache_ttl_secs)
    }
}

/// Configuration for the featured recipes fallback path
#[derive(Debug, Deserialize, Clone)]
pub struct FeaturedConfig {
    /// Ingredients used when the random endpoint fails
    #[serde(default = "default_fallback_ingredients")]
    pub fallback_ingredients: Vec<String>,
    /// Number of recipes requested from the fallback endpoint
    #[serde(default = "default_fallback_count")]
    pub fallback_count: u32,
}

impl Default for FeaturedConfig {
    fn default() -> Self {
        Self {
            fallback_ingredients: default_fallback_ingredients(),
            fallback_count: default_fallback_count(),
        }
    }
}

/// Configuration for local favorites storage
#[derive(Debug, Deserialize, Clone)]
pub struct FavoritesConfig {
    /// Directory holding the local key-value store
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,
    /// Key of the favorites slot
    #[serde(default = "default_storage_key")]
    pub storage_key: String,
}

impl Default for FavoritesConfig {
    fn default() -> Self {
        Self {
            storage_dir: default_storage_dir(),
            storage_key: default_storage_key(),
        }
    }
}

// Default value functions
fn default_base_url() -> String {
    "https://api.spoonacular.com".to_string()
}

fn default_request_timeout() -> u64 {
    90
}

fn default_resource_timeout() -> u64 {
    180
}

fn default_featured_cache_ttl() -> u64 {
    3600
}

fn default_fallback_ingredients() -> Vec<String> {
    ["carrot", "tomato", "potato", "chicken", "beef", "pasta"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_fallback_count() -> u32 {
    10
}

fn default_storage_dir() -> PathBuf {
    PathBuf::from(".forkly")
}

fn default_storage_key() -> String {
    "favoriteRecipes".to_string()
}

impl ForklyConfig {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded with the following priority (highest to lowest):
    /// 1. Environment variables with FORKLY__ prefix
    /// 2. forkly.toml file in current directory
    /// 3. Default values
    ///
    /// Environment variable format: FORKLY__API__API_KEY
    pub fn load() -> Result<Self, ConfigError> {
        load_config()
    }
}

/// Load configuration from file and environment variables
pub fn load_config() -> Result<ForklyConfig, ConfigError> {
    let settings = Config::builder()
        // Optional config file (can be missing)
        .add_source(File::with_name("forkly").required(false))
        // Use double underscore for nested: FORKLY__API__BASE_URL
        .add_source(
            Environment::with_prefix("FORKLY")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    settings.try_deserialize()
}
