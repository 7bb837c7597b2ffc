//! Server configuration loading from file and environment variables.

use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use thiserror::Error;

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server network settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Database settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory holding the prebuilt frontend bundle.
    #[serde(default = "default_static_dir")]
    pub static_dir: String,

    /// Request body cap in bytes. Unset means no cap, so saves of any size
    /// reach the store.
    #[serde(default)]
    pub max_body_bytes: Option<usize>,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,

    /// SQLite busy timeout, in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Maximum number of pooled connections.
    #[serde(default = "default_pool_max_size")]
    pub pool_max_size: u32,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "dagboard_server=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    8000
}

fn default_static_dir() -> String {
    "dist".to_string()
}

fn default_db_path() -> String {
    "dag.db".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    dagboard_db::DbRuntimeSettings::default().busy_timeout_ms
}

fn default_pool_max_size() -> u32 {
    dagboard_db::DbRuntimeSettings::default().pool_max_size
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: default_static_dir(),
            max_body_bytes: None,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
            pool_max_size: default_pool_max_size(),
        }
    }
}

impl DatabaseConfig {
    /// Pool tunables derived from this section.
    pub fn runtime_settings(&self) -> dagboard_db::DbRuntimeSettings {
        dagboard_db::DbRuntimeSettings {
            busy_timeout_ms: self.busy_timeout_ms,
            pool_max_size: self.pool_max_size,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Where the loaded configuration came from.
///
/// Returned instead of logged because configuration is read before the
/// tracing subscriber exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigOrigin {
    /// Parsed from the given file.
    File,
    /// The given file does not exist; defaults were used.
    MissingFile,
    /// No file was given; defaults were used.
    Defaults,
}

impl ConfigOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigOrigin::File => "file",
            ConfigOrigin::MissingFile => "missing-file",
            ConfigOrigin::Defaults => "defaults",
        }
    }
}

/// Result of [`load_config`], carrying what could not be logged while
/// loading.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: Config,
    pub origin: ConfigOrigin,
    /// Environment overrides that were set but could not be parsed.
    pub ignored_env: Vec<&'static str>,
}

/// Loads configuration from a TOML file, falling back to defaults, then
/// applies environment overrides.
///
/// Environment variable overrides:
/// - `DAGBOARD_HOST` overrides `server.host`
/// - `DAGBOARD_PORT` overrides `server.port`
/// - `DAGBOARD_STATIC_DIR` overrides `server.static_dir`
/// - `DAGBOARD_MAX_BODY_BYTES` overrides `server.max_body_bytes`
/// - `DAGBOARD_DB_PATH` overrides `database.path`
/// - `DAGBOARD_LOG_LEVEL` overrides `logging.level`
/// - `DAGBOARD_LOG_JSON` overrides `logging.json` ("true" or "1" to enable)
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<LoadedConfig, ConfigError> {
    let (mut config, origin) = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => (toml::from_str(&contents)?, ConfigOrigin::File),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                (Config::default(), ConfigOrigin::MissingFile)
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => (Config::default(), ConfigOrigin::Defaults),
    };

    let ignored_env = apply_env_overrides(&mut config, |key| std::env::var(key).ok());

    Ok(LoadedConfig {
        config,
        origin,
        ignored_env,
    })
}

/// Applies `DAGBOARD_*` overrides and returns the keys whose values did not
/// parse.
fn apply_env_overrides(
    config: &mut Config,
    var: impl Fn(&str) -> Option<String>,
) -> Vec<&'static str> {
    let mut ignored = Vec::new();

    if let Some(host) = var("DAGBOARD_HOST") {
        match host.parse() {
            Ok(parsed) => config.server.host = parsed,
            Err(_) => ignored.push("DAGBOARD_HOST"),
        }
    }
    if let Some(port) = var("DAGBOARD_PORT") {
        match port.parse() {
            Ok(parsed) => config.server.port = parsed,
            Err(_) => ignored.push("DAGBOARD_PORT"),
        }
    }
    if let Some(dir) = var("DAGBOARD_STATIC_DIR") {
        config.server.static_dir = dir;
    }
    if let Some(limit) = var("DAGBOARD_MAX_BODY_BYTES") {
        match limit.parse() {
            Ok(parsed) => config.server.max_body_bytes = Some(parsed),
            Err(_) => ignored.push("DAGBOARD_MAX_BODY_BYTES"),
        }
    }
    if let Some(db_path) = var("DAGBOARD_DB_PATH") {
        config.database.path = db_path;
    }
    if let Some(level) = var("DAGBOARD_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = var("DAGBOARD_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }

    ignored
}
