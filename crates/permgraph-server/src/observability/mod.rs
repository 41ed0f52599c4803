//! Observability infrastructure for the permission service.
//!
//! This module provides structured logging configuration. Metrics are
//! emitted by the domain crate through the `metrics` facade; installing a
//! recorder is left to the embedding process.

mod logging;

pub use logging::{init_logging, json_subscriber, LoggingConfig};
