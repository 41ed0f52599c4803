//! Runtime wiring for an embedded permission graph.
//!
//! [`PermissionService`] builds a [`PermissionGraph`] from a
//! [`ServiceConfig`] and owns the background task that drains the
//! registry's deferred-insert queue.
//!
//! # Lifecycle
//!
//! ```text
//! start(config) ──▶ running ──▶ shutdown() ──▶ stopped
//!                     │
//!                     └── drain task ticks every registry.drain_interval_ms
//! ```
//!
//! Shutdown cancels the drain task and waits for it to exit. Permission
//! strings still queued at that point are abandoned.

use std::sync::Arc;

use permgraph_domain::{ChangeNotifier, PermissionGraph};
use tokio::runtime::Handle;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::{ConfigLoadError, ServiceConfig};

/// Error type for the service lifecycle.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Config(#[from] ConfigLoadError),

    #[error("permission service must be started from within a Tokio runtime")]
    NoRuntime,

    #[error("registry drain task failed: {0}")]
    DrainTask(#[from] JoinError),
}

/// A running permission graph with its background drain task.
pub struct PermissionService {
    config: ServiceConfig,
    graph: Arc<PermissionGraph>,
    shutdown: CancellationToken,
    drain_task: JoinHandle<()>,
}

impl std::fmt::Debug for PermissionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionService")
            .field("config", &self.config)
            .field("graph", &self.graph)
            .field("cancelled", &self.shutdown.is_cancelled())
            .finish()
    }
}

impl PermissionService {
    /// Validates `config`, builds the graph and starts the drain task.
    pub fn start(
        config: ServiceConfig,
        notifier: Arc<dyn ChangeNotifier>,
    ) -> Result<Self, ServiceError> {
        config.validate()?;
        Handle::try_current().map_err(|_| ServiceError::NoRuntime)?;

        let graph = PermissionGraph::new(config.graph_config(), notifier);
        let shutdown = CancellationToken::new();
        let drain_task = graph
            .registry()
            .spawn_drain_task(config.drain_interval(), shutdown.child_token());

        info!(
            drain_interval_ms = config.registry.drain_interval_ms,
            max_visited = config.resolver.max_visited,
            cache_capacity = config.resolver.cache_capacity,
            "Permission service started"
        );

        Ok(Self {
            config,
            graph,
            shutdown,
            drain_task,
        })
    }

    /// Returns the configuration the service was started with.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Returns the permission graph.
    pub fn graph(&self) -> &Arc<PermissionGraph> {
        &self.graph
    }

    /// Returns a token that is cancelled when the service shuts down.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.child_token()
    }

    /// Stops the drain task and waits for it to exit.
    pub async fn shutdown(self) -> Result<(), ServiceError> {
        self.shutdown.cancel();
        self.drain_task.await?;
        info!(
            abandoned = self.graph.registry().pending(),
            "Permission service stopped"
        );
        Ok(())
    }
}
