//! Global `tracing` subscriber setup.
//!
//! The domain crate only emits events. This module turns
//! [`LoggingSettings`] into an `EnvFilter` plus either a pretty or a JSON
//! formatting layer. A JSON line looks like:
//!
//! ```json
//! {"timestamp":"2026-01-15T10:30:00.000Z","level":"DEBUG","target":"permgraph_domain::resolver::graph_resolver","fields":{"message":"Closure traversal reached visit cap, returning partial closure","root":"kit.*"}}
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use permgraph_server::observability::{init_logging, LoggingConfig};
//! use permgraph_server::ServiceConfig;
//!
//! let settings = ServiceConfig::from_env()?.logging;
//! init_logging(&LoggingConfig::from(&settings));
//!
//! // Pretty output at DEBUG while developing
//! init_logging(&LoggingConfig::default().with_level(tracing::Level::DEBUG));
//! ```

use std::str::FromStr;

use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LoggingSettings;

/// Output format and default verbosity of the global subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoggingConfig {
    /// One JSON object per line instead of pretty text
    pub json: bool,
    /// Used when `RUST_LOG` is unset
    pub level: Level,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            json: false,
            level: Level::INFO,
        }
    }
}

impl LoggingConfig {
    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// `RUST_LOG` wins over the configured level.
    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.level.to_string()))
    }
}

impl From<&LoggingSettings> for LoggingConfig {
    /// Unknown levels fall back to INFO; validation rejects them earlier.
    fn from(settings: &LoggingSettings) -> Self {
        Self {
            json: settings.json,
            level: Level::from_str(&settings.level).unwrap_or(Level::INFO),
        }
    }
}

/// Installs the global subscriber.
///
/// Returns false if one was already installed, in which case nothing
/// changes.
pub fn init_logging(config: &LoggingConfig) -> bool {
    let json = config.json.then(|| {
        fmt::layer()
            .json()
            .with_target(true)
            .with_file(false)
            .with_line_number(false)
    });
    let pretty = (!config.json).then(|| fmt::layer().pretty().with_target(true));

    tracing_subscriber::registry()
        .with(config.env_filter())
        .with(json)
        .with(pretty)
        .try_init()
        .is_ok()
}

/// Builds a JSON subscriber that records every level into `writer`.
pub fn json_subscriber<W>(writer: W) -> impl tracing::Subscriber + Send + Sync
where
    W: for<'writer> fmt::MakeWriter<'writer> + Send + Sync + 'static,
{
    tracing_subscriber::registry()
        .with(EnvFilter::new("trace"))
        .with(fmt::layer().json().with_writer(writer).with_target(true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};

    use permgraph_domain::{
        GraphConfig, NoopNotifier, Permission, PermissionGraph, PermissionKey, ResolverConfig,
    };

    /// In-memory log sink shared between the subscriber and the test.
    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl SharedBuffer {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> fmt::MakeWriter<'a> for SharedBuffer {
        type Writer = SharedBuffer;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn parse_lines(output: &str) -> Vec<serde_json::Value> {
        output
            .lines()
            .filter(|line| !line.is_empty())
            .map(|line| {
                serde_json::from_str(line)
                    .unwrap_or_else(|e| panic!("Log line should be valid JSON: {line} ({e})"))
            })
            .collect()
    }

    #[test]
    fn test_logging_config_builders() {
        assert_eq!(
            LoggingConfig::default(),
            LoggingConfig {
                json: false,
                level: Level::INFO
            }
        );
        let config = LoggingConfig::default()
            .with_json(true)
            .with_level(Level::DEBUG);
        assert!(config.json);
        assert_eq!(config.level, Level::DEBUG);
    }

    #[test]
    fn test_logging_config_from_settings() {
        let settings = LoggingSettings {
            level: "Debug".to_string(),
            json: true,
        };
        let config = LoggingConfig::from(&settings);
        assert!(config.json);
        assert_eq!(config.level, Level::DEBUG);

        let settings = LoggingSettings {
            level: "bogus".to_string(),
            json: false,
        };
        assert_eq!(LoggingConfig::from(&settings).level, Level::INFO);
    }

    #[test]
    fn test_events_are_written_as_json_lines() {
        use tracing::info;

        let buffer = SharedBuffer::default();
        let subscriber = json_subscriber(buffer.clone());

        tracing::subscriber::with_default(subscriber, || {
            info!(permission = "kit.use", elevated = false, "Default lookup served");
        });

        let lines = parse_lines(&buffer.contents());
        assert!(!lines.is_empty(), "Should have captured log output");
        for json in lines {
            assert!(json.get("level").is_some(), "JSON log should have 'level' field");
            assert!(json.get("target").is_some(), "JSON log should have 'target' field");
        }
    }

    #[test]
    fn test_truncated_closure_is_logged_with_root() {
        let buffer = SharedBuffer::default();
        let subscriber = json_subscriber(buffer.clone());

        let config =
            GraphConfig::default().with_resolver(ResolverConfig::default().with_max_visited(2));
        let graph = PermissionGraph::new(config, Arc::new(NoopNotifier));
        let key = |s: &str| PermissionKey::new(s).unwrap();
        graph.register(Permission::with_children(
            key("kit.*"),
            vec![(key("kit.use"), true), (key("kit.admin"), true)],
        ));

        tracing::subscriber::with_default(subscriber, || {
            assert_eq!(graph.closure("kit.*", true).len(), 1);
        });

        let lines = parse_lines(&buffer.contents());
        let truncated = lines
            .iter()
            .find(|json| json["fields"]["root"] == "kit.*")
            .expect("truncation should be logged");
        assert_eq!(truncated["level"], "DEBUG");
        assert!(truncated["target"]
            .as_str()
            .unwrap()
            .starts_with("permgraph_domain"));
    }
}
