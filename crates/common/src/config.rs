//! Application configuration.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::{AppError, AppResult};

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Media storage configuration.
    #[serde(default)]
    pub storage: StorageSettings,
    /// Session and token settings.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Club identity.
    #[serde(default)]
    pub club: ClubConfig,
    /// Staff account created or promoted at startup.
    #[serde(default)]
    pub bootstrap: Option<BootstrapConfig>,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Public URL of this instance.
    pub url: String,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Media storage settings.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    /// Directory uploaded files are written to.
    #[serde(default = "default_media_path")]
    pub base_path: PathBuf,
    /// URL prefix the files are served under.
    #[serde(default = "default_media_url")]
    pub base_url: String,
    /// Largest accepted upload in bytes.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            base_path: default_media_path(),
            base_url: default_media_url(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

/// Session cookie settings.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Name of the session cookie used by the pages.
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    /// Only send the session cookie over HTTPS.
    #[serde(default)]
    pub cookie_secure: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
            cookie_secure: false,
        }
    }
}

/// Club identity settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ClubConfig {
    /// Display name of the club.
    #[serde(default = "default_club_name")]
    pub name: String,
    /// IANA timezone ride times are entered and displayed in.
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

impl Default for ClubConfig {
    fn default() -> Self {
        Self {
            name: default_club_name(),
            timezone: default_timezone(),
        }
    }
}

impl ClubConfig {
    /// Parse the configured timezone.
    pub fn tz(&self) -> AppResult<chrono_tz::Tz> {
        self.timezone
            .parse::<chrono_tz::Tz>()
            .map_err(|e| AppError::Config(format!("Invalid timezone {}: {e}", self.timezone)))
    }
}

/// Staff account bootstrap settings.
#[derive(Debug, Clone, Deserialize)]
pub struct BootstrapConfig {
    /// Username of the staff account.
    pub staff_username: String,
    /// Password of the staff account.
    pub staff_password: String,
    /// Email of the staff account.
    #[serde(default)]
    pub staff_email: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    8000
}

const fn default_max_connections() -> u32 {
    20
}

const fn default_min_connections() -> u32 {
    2
}

fn default_media_path() -> PathBuf {
    PathBuf::from("./media")
}

fn default_media_url() -> String {
    "/media".to_string()
}

const fn default_max_upload_bytes() -> usize {
    20 * 1024 * 1024
}

fn default_cookie_name() -> String {
    "club_session".to_string()
}

fn default_club_name() -> String {
    "Costa Brava Bikers".to_string()
}

fn default_timezone() -> String {
    "Europe/Madrid".to_string()
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `config/default.toml`
    /// 2. `config/{environment}.toml` (based on `CLUB_ENV`)
    /// 3. Environment variables with `CLUB__` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let env = std::env::var("CLUB_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("CLUB")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("CLUB")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
