//! Configuration management for the permission service.
//!
//! This module provides configuration loading with multiple sources:
//! 1. Default values (hardcoded)
//! 2. Configuration file (YAML)
//! 3. Environment variables (override)
//!
//! # Configuration Hierarchy
//!
//! Environment variables take precedence over config file values,
//! which take precedence over defaults.
//!
//! # Example
//!
//! ```ignore
//! use permgraph_server::config::ServiceConfig;
//!
//! // Load from file with env overrides
//! let config = ServiceConfig::load("permgraph.yaml")?;
//!
//! // Or load from environment only
//! let config = ServiceConfig::from_env()?;
//! ```

use std::path::Path;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File, FileFormat};
use permgraph_domain::cache::ClosureCacheConfig;
use permgraph_domain::{GraphConfig, RegistryLimits, ResolverConfig};
use serde::{Deserialize, Serialize};

/// Environment variable prefix for overrides.
const ENV_PREFIX: &str = "PERMGRAPH";

/// Service configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct ServiceConfig {
    /// Namespace registry settings
    #[serde(default)]
    pub registry: RegistrySettings,

    /// Implication resolver settings
    #[serde(default)]
    pub resolver: ResolverSettings,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Namespace registry settings.
///
/// - `PERMGRAPH_REGISTRY__DRAIN_INTERVAL_MS=250` - Drain the deferred queue more often
/// - `PERMGRAPH_REGISTRY__DEEP_FANOUT=50` - Tighter cap below depth 2
/// - `PERMGRAPH_REGISTRY__MAX_DEPTH=32` - Shallower trie
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct RegistrySettings {
    /// Period between two drains of the deferred-insert queue, in milliseconds
    #[serde(default = "default_drain_interval_ms")]
    pub drain_interval_ms: u64,

    /// Maximum children per node at depth 1 and 2
    #[serde(default = "default_shallow_fanout")]
    pub shallow_fanout: usize,

    /// Maximum children per node at depth 3 and below
    #[serde(default = "default_deep_fanout")]
    pub deep_fanout: usize,

    /// Deepest trie level an insert may create
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            drain_interval_ms: default_drain_interval_ms(),
            shallow_fanout: default_shallow_fanout(),
            deep_fanout: default_deep_fanout(),
            max_depth: default_max_depth(),
        }
    }
}

fn default_drain_interval_ms() -> u64 {
    1000
}

fn default_shallow_fanout() -> usize {
    RegistryLimits::default().shallow_fanout
}

fn default_deep_fanout() -> usize {
    RegistryLimits::default().deep_fanout
}

fn default_max_depth() -> usize {
    RegistryLimits::default().max_depth
}

/// Upper bound accepted for `registry.max_depth`.
pub const MAX_REGISTRY_DEPTH: usize = 1024;

/// Implication resolver settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ResolverSettings {
    /// Maximum nodes recorded per traversal, root included
    #[serde(default = "default_max_visited")]
    pub max_visited: usize,

    /// Maximum memoized closures
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: u64,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            max_visited: default_max_visited(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

fn default_max_visited() -> usize {
    ResolverConfig::default().max_visited
}

fn default_cache_capacity() -> u64 {
    ClosureCacheConfig::default().max_capacity
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LoggingSettings {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Use JSON format (true for production, false for development)
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ConfigError),

    #[error("configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("invalid configuration: {message}")]
    Invalid { message: String },
}

impl ServiceConfig {
    /// Load configuration from a YAML file with environment variable overrides.
    ///
    /// Environment variables are prefixed with `PERMGRAPH_` and use `__` as
    /// separator. For example:
    /// - `PERMGRAPH_RESOLVER__MAX_VISITED=1024` overrides `resolver.max_visited`
    /// - `PERMGRAPH_LOGGING__JSON=true` overrides `logging.json`
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigLoadError::FileNotFound {
                path: path.display().to_string(),
            });
        }

        let config = Config::builder()
            .add_source(Config::try_from(&ServiceConfig::default())?)
            .add_source(File::from(path).format(FileFormat::Yaml))
            .add_source(environment())
            .build()?;

        let service_config: ServiceConfig = config.try_deserialize()?;
        service_config.validate()?;

        Ok(service_config)
    }

    /// Load configuration from environment variables only.
    pub fn from_env() -> Result<Self, ConfigLoadError> {
        let config = Config::builder()
            .add_source(Config::try_from(&ServiceConfig::default())?)
            .add_source(environment())
            .build()?;

        let service_config: ServiceConfig = config.try_deserialize()?;
        service_config.validate()?;

        Ok(service_config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        let positive = [
            ("registry.drain_interval_ms", self.registry.drain_interval_ms as u128),
            ("registry.shallow_fanout", self.registry.shallow_fanout as u128),
            ("registry.deep_fanout", self.registry.deep_fanout as u128),
            ("registry.max_depth", self.registry.max_depth as u128),
            ("resolver.max_visited", self.resolver.max_visited as u128),
            ("resolver.cache_capacity", self.resolver.cache_capacity as u128),
        ];
        if let Some((name, _)) = positive.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigLoadError::Invalid {
                message: format!("{name} must be greater than 0"),
            });
        }

        if self.registry.max_depth > MAX_REGISTRY_DEPTH {
            return Err(ConfigLoadError::Invalid {
                message: format!(
                    "registry.max_depth must be at most {MAX_REGISTRY_DEPTH}, got: {}",
                    self.registry.max_depth
                ),
            });
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConfigLoadError::Invalid {
                message: format!(
                    "logging.level must be one of: {:?}, got: {}",
                    valid_levels, self.logging.level
                ),
            });
        }

        Ok(())
    }

    /// Builds the domain graph configuration.
    pub fn graph_config(&self) -> GraphConfig {
        let limits = RegistryLimits::default()
            .with_shallow_fanout(self.registry.shallow_fanout)
            .with_deep_fanout(self.registry.deep_fanout)
            .with_max_depth(self.registry.max_depth);
        let resolver = ResolverConfig::default()
            .with_max_visited(self.resolver.max_visited)
            .with_cache(
                ClosureCacheConfig::default().with_max_capacity(self.resolver.cache_capacity),
            );

        GraphConfig::default()
            .with_registry(limits)
            .with_resolver(resolver)
    }

    /// Returns the registry drain period.
    pub fn drain_interval(&self) -> Duration {
        Duration::from_millis(self.registry.drain_interval_ms)
    }
}

// Use __ as separator for nested keys: PERMGRAPH_RESOLVER__MAX_VISITED -> resolver.max_visited
fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
}
