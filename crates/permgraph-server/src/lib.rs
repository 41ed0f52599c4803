//! permgraph-server: Runtime wiring for the permission graph
//!
//! This crate hosts the permission graph inside a Tokio process:
//! - Configuration loading (YAML file + environment overrides)
//! - Structured logging setup
//! - Service lifecycle with the registry drain task
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              permgraph-server                │
//! ├─────────────────────────────────────────────┤
//! │  config.rs      - Configuration management  │
//! │  observability/ - Structured logging        │
//! │  service.rs     - Graph + drain task        │
//! └─────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod observability;
pub mod service;

// Re-exports for convenience
pub use config::{ConfigLoadError, ServiceConfig};
pub use service::{PermissionService, ServiceError};
