//! Configuration management for the analytics service
//!
//! TOML file support with defaults for every field and environment
//! variable overrides.
//!
//! # Lookup order
//!
//! 1. Explicit path (`--config` flag or `ANALYTICS_CONFIG`)
//! 2. `./analytics.toml`
//! 3. Built-in defaults
//!
//! Environment overrides are applied on top of whichever source won.
//!
//! # Example
//!
//! ```toml
//! [server]
//! listen_addr = "0.0.0.0:8080"
//! log_level = "info"
//!
//! [cache]
//! ttl_secs = 300
//!
//! [analytics]
//! min_year = 1936
//! max_year = 2022
//! list_limit = 100
//!
//! [store]
//! seed_path = "data/seed.json"
//! ```

use crate::analytics::AnalyticsConfig;
use crate::cache::CacheConfig;
use crate::error::{Error, Result};
use crate::postprocess::YearDomain;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "analytics.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// HTTP server
    #[serde(default)]
    pub server: ServerConfig,

    /// Response cache
    #[serde(default)]
    pub cache: CacheSection,

    /// Analytics views
    #[serde(default)]
    pub analytics: AnalyticsSection,

    /// Document store
    #[serde(default)]
    pub store: StoreConfig,

    /// Monitoring and observability
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

/// Server configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Listen address (`host:port`)
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Tracing filter used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// CORS allowed origins (empty = allow any origin)
    #[serde(default)]
    pub cors_allowed_origins: Vec<String>,
}

/// Response cache configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CacheSection {
    /// Enable caching
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Entry lifetime in seconds (0 = never expire)
    #[serde(default)]
    pub ttl_secs: u64,

    /// Entries per dimension (0 = unbounded)
    #[serde(default)]
    pub max_entries: usize,

    /// Sort query pairs before keying
    #[serde(default)]
    pub normalize_keys: bool,
}

/// Analytics configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AnalyticsSection {
    /// First year of the years axis
    #[serde(default = "default_min_year")]
    pub min_year: i32,

    /// Last year of the years axis
    #[serde(default = "default_max_year")]
    pub max_year: i32,

    /// Maximum list suggestions (0 = unbounded)
    #[serde(default = "default_list_limit")]
    pub list_limit: u64,
}

/// Document store configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct StoreConfig {
    /// Seed file loaded into the in-memory store at startup
    #[serde(default)]
    pub seed_path: Option<PathBuf>,
}

/// Monitoring configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MonitoringConfig {
    /// Serve `/metrics`
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_min_year() -> i32 {
    1936
}
fn default_max_year() -> i32 {
    2022
}
fn default_list_limit() -> u64 {
    100
}
fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            log_level: default_log_level(),
            cors_allowed_origins: Vec::new(),
        }
    }
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: 0,
            max_entries: 0,
            normalize_keys: false,
        }
    }
}

impl Default for AnalyticsSection {
    fn default() -> Self {
        Self {
            min_year: default_min_year(),
            max_year: default_max_year(),
            list_limit: default_list_limit(),
        }
    }
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: true,
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        toml::from_str(&contents).map_err(|e| {
            Error::Configuration(format!(
                "Failed to parse config file {}: {}",
                path.display(),
                e
            ))
        })
    }

    /// Load from environment variables only
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    /// Resolve configuration following the lookup order
    ///
    /// Returns the config and the file it came from, if any.
    pub fn load(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>)> {
        let from_env = std::env::var("ANALYTICS_CONFIG").ok().map(PathBuf::from);
        let candidate = explicit.map(Path::to_path_buf).or(from_env);

        let (mut config, source) = match candidate {
            Some(path) => (Self::from_file(&path)?, Some(path)),
            None => {
                let local = PathBuf::from(DEFAULT_CONFIG_FILE);
                if local.exists() {
                    (Self::from_file(&local)?, Some(local))
                } else {
                    (Self::default(), None)
                }
            },
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok((config, source))
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        // Server
        if let Ok(addr) = std::env::var("ANALYTICS_LISTEN_ADDR") {
            self.server.listen_addr = addr;
        }
        if let Ok(log_level) = std::env::var("RUST_LOG") {
            self.server.log_level = log_level;
        }

        // Cache
        if let Ok(ttl) = std::env::var("ANALYTICS_CACHE_TTL_SECS") {
            if let Ok(t) = ttl.parse() {
                self.cache.ttl_secs = t;
            }
        }
        if let Ok(enabled) = std::env::var("ANALYTICS_CACHE_ENABLED") {
            if let Ok(e) = enabled.parse() {
                self.cache.enabled = e;
            }
        }

        // Analytics
        if let Ok(limit) = std::env::var("ANALYTICS_LIST_LIMIT") {
            if let Ok(l) = limit.parse() {
                self.analytics.list_limit = l;
            }
        }

        // Store
        if let Ok(seed) = std::env::var("ANALYTICS_SEED_PATH") {
            self.store.seed_path = Some(PathBuf::from(seed));
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.listen_addr()?;

        if self.server.log_level.trim().is_empty() {
            return Err(Error::Configuration("Log level cannot be empty".to_string()));
        }

        if self.analytics.min_year > self.analytics.max_year {
            return Err(Error::Configuration(format!(
                "min_year ({}) must not exceed max_year ({})",
                self.analytics.min_year, self.analytics.max_year
            )));
        }

        if let Some(seed) = &self.store.seed_path {
            if seed.as_os_str().is_empty() {
                return Err(Error::Configuration("Seed path cannot be empty".to_string()));
            }
        }

        Ok(())
    }

    /// Parsed listen address
    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.server.listen_addr.parse().map_err(|e| {
            Error::Configuration(format!(
                "Invalid listen address {}: {}",
                self.server.listen_addr, e
            ))
        })
    }

    /// Runtime cache configuration
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            enabled: self.cache.enabled,
            default_ttl: (self.cache.ttl_secs > 0).then(|| Duration::from_secs(self.cache.ttl_secs)),
            max_entries: self.cache.max_entries,
            normalize_keys: self.cache.normalize_keys,
        }
    }

    /// Runtime analytics configuration
    pub fn analytics_config(&self) -> AnalyticsConfig {
        AnalyticsConfig {
            year_domain: YearDomain {
                min: self.analytics.min_year,
                max: self.analytics.max_year,
            },
            list_limit: self.analytics.list_limit,
        }
    }

    /// Save configuration to TOML file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Configuration(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, contents)?;
        Ok(())
    }
}
