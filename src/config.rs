use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main importer configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct ImporterConfig {
    /// Destination Mealie instance
    #[serde(default)]
    pub mealie: MealieConfig,
    /// Inbound HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,
    /// Recipe site endpoints
    #[serde(default)]
    pub sources: SourcesConfig,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for ImporterConfig {
    fn default() -> Self {
        Self {
            mealie: MealieConfig::default(),
            server: ServerConfig::default(),
            sources: SourcesConfig::default(),
            timeout: default_timeout(),
        }
    }
}

/// Connection details for the Mealie API
#[derive(Debug, Deserialize, Clone)]
pub struct MealieConfig {
    /// API root, including the `/api` suffix
    #[serde(default = "default_mealie_url")]
    pub base_url: String,
    /// Long-lived API token used as bearer credential
    #[serde(default)]
    pub token: String,
    /// Group new recipes and categories are created in
    #[serde(default)]
    pub group_id: String,
}

impl Default for MealieConfig {
    fn default() -> Self {
        Self {
            base_url: default_mealie_url(),
            token: String::new(),
            group_id: String::new(),
        }
    }
}

/// Configuration for the event-stream server
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Socket address to listen on
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Directory re-hosted images are written to and served from
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
    /// Directory holding the importer web page
    #[serde(default = "default_frontend_dir")]
    pub frontend_dir: PathBuf,
    /// Externally reachable root of this server, used in re-hosted image URLs
    #[serde(default = "default_public_url")]
    pub public_url: String,
    /// Reconnect hint sent with each event, in milliseconds
    #[serde(default = "default_retry_ms")]
    pub retry_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            static_dir: default_static_dir(),
            frontend_dir: default_frontend_dir(),
            public_url: default_public_url(),
            retry_ms: default_retry_ms(),
        }
    }
}

/// Endpoints of the supported recipe sites
#[derive(Debug, Deserialize, Clone)]
pub struct SourcesConfig {
    #[serde(default = "default_ica_api")]
    pub ica_api: String,
    #[serde(default = "default_mathem_api")]
    pub mathem_api: String,
    /// Origin used to resolve site-relative Mathem image paths
    #[serde(default = "default_mathem_site")]
    pub mathem_site: String,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            ica_api: default_ica_api(),
            mathem_api: default_mathem_api(),
            mathem_site: default_mathem_site(),
        }
    }
}

// Default value functions
fn default_mealie_url() -> String {
    "http://localhost:9000/api".to_string()
}

fn default_bind() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("static")
}

fn default_frontend_dir() -> PathBuf {
    PathBuf::from("frontend")
}

fn default_public_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_retry_ms() -> u64 {
    15000
}

fn default_ica_api() -> String {
    "https://handla.api.ica.se/api/recipes/recipe".to_string()
}

fn default_mathem_api() -> String {
    "https://api.mathem.io/ecom-recipe/noauth/recipes/detail".to_string()
}

fn default_mathem_site() -> String {
    "https://www.mathem.se".to_string()
}

fn default_timeout() -> u64 {
    30
}

impl ImporterConfig {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded with the following priority (highest to lowest):
    /// 1. Environment variables with MEALIE_IMPORT__ prefix
    /// 2. config.toml file in current directory
    /// 3. Default values
    ///
    /// Environment variable format: MEALIE_IMPORT__MEALIE__TOKEN
    pub fn load() -> Result<Self, ConfigError> {
        load_config()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

/// Load configuration from file and environment variables
pub fn load_config() -> Result<ImporterConfig, ConfigError> {
    let settings = Config::builder()
        // Optional config file (can be missing)
        .add_source(File::with_name("config").required(false))
        // Use double underscore for nested: MEALIE_IMPORT__MEALIE__TOKEN
        .add_source(
            Environment::with_prefix("MEALIE_IMPORT")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    settings.try_deserialize()
}
