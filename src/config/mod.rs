//! Configuration management
//!
//! Configuration is read from `config.yml` and may be overridden through
//! `SHOWCASE_*` environment variables. Missing values fall back to defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Upload configuration
    #[serde(default)]
    pub upload: UploadConfig,
    /// Authentication configuration
    #[serde(default)]
    pub auth: AuthConfig,
    /// Page sizes of the paginated listings
    #[serde(default)]
    pub listing: ListingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origin (for cookie-based auth)
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cors_origin() -> String {
    "http://localhost:3000".to_string()
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database driver (sqlite or mysql)
    #[serde(default)]
    pub driver: DatabaseDriver,
    /// Database connection URL
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: DatabaseDriver::default(),
            url: default_database_url(),
        }
    }
}

fn default_database_url() -> String {
    "data/showcase.db".to_string()
}

/// Database driver type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseDriver {
    /// SQLite (default)
    #[default]
    Sqlite,
    /// MySQL
    Mysql,
}

/// Upload configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Root directory; product and movie images live in subdirectories
    #[serde(default = "default_upload_path")]
    pub path: PathBuf,
    /// Maximum file size in bytes (default: 10MB)
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    /// Allowed image MIME types
    #[serde(default = "default_allowed_types")]
    pub allowed_types: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            path: default_upload_path(),
            max_file_size: default_max_file_size(),
            allowed_types: default_allowed_types(),
        }
    }
}

fn default_upload_path() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_max_file_size() -> u64 {
    10 * 1024 * 1024 // 10MB
}

fn default_allowed_types() -> Vec<String> {
    vec![
        "image/jpeg".to_string(),
        "image/png".to_string(),
        "image/gif".to_string(),
        "image/webp".to_string(),
    ]
}

impl UploadConfig {
    /// Check if a MIME type is allowed
    pub fn is_type_allowed(&self, mime_type: &str) -> bool {
        self.allowed_types.iter().any(|t| t == mime_type)
    }
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Session lifetime in minutes
    #[serde(default = "default_session_minutes")]
    pub session_minutes: i64,
    /// Lifetime of the flash cookie in seconds
    #[serde(default = "default_flash_seconds")]
    pub flash_seconds: i64,
    /// Base URL used when logging verification and reset links
    #[serde(default = "default_public_url")]
    pub public_url: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_minutes: default_session_minutes(),
            flash_seconds: default_flash_seconds(),
            public_url: default_public_url(),
        }
    }
}

fn default_session_minutes() -> i64 {
    20
}

fn default_flash_seconds() -> i64 {
    60
}

fn default_public_url() -> String {
    "http://localhost:8080".to_string()
}

/// Page sizes of the paginated listings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingConfig {
    /// Products per page, also used for products of one category
    #[serde(default = "default_products_per_page")]
    pub products_per_page: i64,
    /// Products per page of search results
    #[serde(default = "default_product_search_per_page")]
    pub product_search_per_page: i64,
    /// Movies per page, for every movie listing
    #[serde(default = "default_movies_per_page")]
    pub movies_per_page: i64,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            products_per_page: default_products_per_page(),
            product_search_per_page: default_product_search_per_page(),
            movies_per_page: default_movies_per_page(),
        }
    }
}

fn default_products_per_page() -> i64 {
    2
}

fn default_product_search_per_page() -> i64 {
    5
}

fn default_movies_per_page() -> i64 {
    3
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError {
        path: String,
        message: String,
    },
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

impl Config {
    /// Load configuration from file
    ///
    /// A missing or empty file yields the default configuration. Invalid
    /// YAML is reported with its location.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = serde_yaml::from_str(&content).map_err(|e| {
            ConfigError::ParseError {
                path: path.display().to_string(),
                message: format_yaml_error(&e),
            }
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file with environment variable overrides
    ///
    /// Recognized variables:
    /// - SHOWCASE_SERVER_HOST, SHOWCASE_SERVER_PORT, SHOWCASE_SERVER_CORS_ORIGIN
    /// - SHOWCASE_DATABASE_DRIVER, SHOWCASE_DATABASE_URL
    /// - SHOWCASE_UPLOAD_PATH
    /// - SHOWCASE_AUTH_SESSION_MINUTES, SHOWCASE_AUTH_PUBLIC_URL
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Reject values the rest of the system cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let sizes = [
            ("listing.products_per_page", self.listing.products_per_page),
            ("listing.product_search_per_page", self.listing.product_search_per_page),
            ("listing.movies_per_page", self.listing.movies_per_page),
        ];
        for (name, size) in sizes {
            if size < 1 {
                return Err(ConfigError::ValidationError(format!(
                    "{} must be at least 1, got {}",
                    name, size
                )));
            }
        }

        if self.auth.session_minutes < 1 {
            return Err(ConfigError::ValidationError(
                "auth.session_minutes must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Apply environment variable overrides to the configuration
    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("SHOWCASE_SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("SHOWCASE_SERVER_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.server.port = port;
            }
        }
        if let Ok(cors_origin) = std::env::var("SHOWCASE_SERVER_CORS_ORIGIN") {
            self.server.cors_origin = cors_origin;
        }

        if let Ok(driver) = std::env::var("SHOWCASE_DATABASE_DRIVER") {
            match driver.to_lowercase().as_str() {
                "sqlite" => self.database.driver = DatabaseDriver::Sqlite,
                "mysql" => self.database.driver = DatabaseDriver::Mysql,
                _ => {} // Ignore invalid values
            }
        }
        if let Ok(url) = std::env::var("SHOWCASE_DATABASE_URL") {
            self.database.url = url;
        }

        if let Ok(path) = std::env::var("SHOWCASE_UPLOAD_PATH") {
            self.upload.path = PathBuf::from(path);
        }

        if let Ok(minutes) = std::env::var("SHOWCASE_AUTH_SESSION_MINUTES") {
            if let Ok(minutes) = minutes.parse::<i64>() {
                self.auth.session_minutes = minutes;
            }
        }
        if let Ok(public_url) = std::env::var("SHOWCASE_AUTH_PUBLIC_URL") {
            self.auth.public_url = public_url;
        }
    }
}

/// Format YAML parsing error with location and context
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

// Shared by every test module that touches environment variables.
#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn valid_host_strategy() -> impl Strategy<Value = String> {
        prop_oneof![
            (0u8..=255, 0u8..=255, 0u8..=255, 0u8..=255)
                .prop_map(|(a, b, c, d)| format!("{}.{}.{}.{}", a, b, c, d)),
            Just("localhost".to_string()),
            "[a-z][a-z0-9]{0,10}".prop_map(|s| s),
        ]
    }

    fn valid_database_driver_strategy() -> impl Strategy<Value = DatabaseDriver> {
        prop_oneof![Just(DatabaseDriver::Sqlite), Just(DatabaseDriver::Mysql)]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(20))]

        /// Serializing a configuration and loading it back yields the same values
        #[test]
        fn prop_config_roundtrip(
            host in valid_host_strategy(),
            port in 1u16..=65535,
            driver in valid_database_driver_strategy(),
            products in 1i64..100,
            search in 1i64..100,
            movies in 1i64..100,
        ) {
            let mut config = Config::default();
            config.server.host = host.clone();
            config.server.port = port;
            config.database.driver = driver;
            config.listing.products_per_page = products;
            config.listing.product_search_per_page = search;
            config.listing.movies_per_page = movies;

            let yaml = serde_yaml::to_string(&config).unwrap();
            let mut file = NamedTempFile::new().unwrap();
            write!(file, "{}", yaml).unwrap();

            let loaded = Config::load(file.path()).unwrap();
            prop_assert_eq!(loaded.server.host, host);
            prop_assert_eq!(loaded.server.port, port);
            prop_assert_eq!(loaded.database.driver, driver);
            prop_assert_eq!(loaded.listing.products_per_page, products);
            prop_assert_eq!(loaded.listing.product_search_per_page, search);
            prop_assert_eq!(loaded.listing.movies_per_page, movies);
        }

        /// Any non-positive page size is refused
        #[test]
        fn prop_non_positive_page_size_rejected(size in -1000i64..=0) {
            let mut config = Config::default();
            config.listing.movies_per_page = size;
            prop_assert!(config.validate().is_err());
        }
    }
}
