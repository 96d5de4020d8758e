//! Bootstrap configuration loading
//!
//! Configuration sources, highest priority first:
//! 1. Command-line arguments (applied by the service binary)
//! 2. TOML configuration file, located by [`resolve_config_path`]
//! 3. Built-in defaults (every field has one, so no file is required)

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "POKEDEX_CONFIG";

/// Bootstrap configuration loaded from TOML file
///
/// Read once at startup; the service must restart to pick up changes.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Path to SQLite database file (relative or absolute)
    pub database_path: PathBuf,

    /// HTTP server port
    pub port: u16,

    /// HTTP bind address
    pub bind_address: String,

    /// Upper bound on a single lookup, including every tier call
    pub request_timeout_ms: u64,

    pub cache: CacheConfig,
    pub source: SourceConfig,
    pub pipeline: PipelineConfig,
    pub logging: LoggingConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("pokedex.db"),
            port: default_port(),
            bind_address: "127.0.0.1".to_string(),
            request_timeout_ms: 10_000,
            cache: CacheConfig::default(),
            source: SourceConfig::default(),
            pipeline: PipelineConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// What a lookup does when the cache tier cannot be reached on read.
///
/// Cache *write* failures during write-back are always logged and ignored;
/// this policy only governs reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheFailurePolicy {
    /// Fail the lookup with a cache-unavailable error
    Strict,
    /// Log and continue as if the cache had missed
    #[default]
    Degrade,
}

/// Cache tier configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub failure_policy: CacheFailurePolicy,

    /// Maximum cached records, 0 for unbounded
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            failure_policy: CacheFailurePolicy::default(),
            max_entries: 10_000,
        }
    }
}

/// External source (PokeAPI-compatible) configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Base URL; the normalized key is appended as the last path segment
    pub base_url: String,
    pub timeout_ms: u64,
    /// Minimum spacing between outbound requests, 0 disables rate limiting
    pub min_interval_ms: u64,
    pub user_agent: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://pokeapi.co/api/v2/pokemon".to_string(),
            timeout_ms: 5_000,
            min_interval_ms: 0,
            user_agent: concat!("pokedex/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl SourceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }
}

/// Lookup pipeline configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Collapse concurrent cold lookups of one key into a single upstream fetch
    pub coalesce_inflight: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            coalesce_inflight: true,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive (trace, debug, info, warn, error);
    /// `RUST_LOG` takes precedence when set
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl TomlConfig {
    /// Load configuration from `path`, or built-in defaults when `None`
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
                    path: path.to_path_buf(),
                    source,
                })?;
                let config: TomlConfig =
                    toml::from_str(&content).map_err(|source| Error::ConfigParse {
                        path: path.to_path_buf(),
                        source,
                    })?;
                info!("Loaded TOML configuration from {}", path.display());
                config
            }
            None => {
                info!("No config file found, using built-in defaults");
                TomlConfig::default()
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject values the service cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(Error::Config("port must be non-zero".to_string()));
        }
        if self.request_timeout_ms == 0 {
            return Err(Error::Config("request_timeout_ms must be non-zero".to_string()));
        }
        if self.source.timeout_ms == 0 {
            return Err(Error::Config("source.timeout_ms must be non-zero".to_string()));
        }
        if self.source.base_url.trim().is_empty() {
            return Err(Error::Config("source.base_url must be set".to_string()));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Locate the config file:
/// 1. Command-line path (must exist)
/// 2. `POKEDEX_CONFIG` environment variable (must exist)
/// 3. `<user config dir>/pokedex/config.toml`
/// 4. `/etc/pokedex/config.toml` (Linux)
///
/// Returns `Ok(None)` when no optional location has a file.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Result<Option<PathBuf>> {
    if let Some(path) = cli_arg {
        return require_exists(path.to_path_buf()).map(Some);
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        return require_exists(PathBuf::from(path)).map(Some);
    }

    let user_config = dirs::config_dir().map(|d| d.join("pokedex").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Ok(Some(path));
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/pokedex/config.toml");
        if system_config.exists() {
            return Ok(Some(system_config));
        }
    }

    Ok(None)
}

fn require_exists(path: PathBuf) -> Result<PathBuf> {
    if path.exists() {
        Ok(path)
    } else {
        Err(Error::Config(format!("Config file not found: {}", path.display())))
    }
}

fn default_port() -> u16 {
    5730
}
