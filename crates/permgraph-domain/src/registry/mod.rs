//! Namespace registry of every permission string ever observed.
//!
//! The registry is a prefix tree over dot-delimited permissions used for
//! discovery, listing and export. It is never consulted for grant decisions.
//!
//! # Ingestion
//!
//! - [`PermissionRegistry::insert`] walks and creates nodes synchronously.
//! - [`PermissionRegistry::offer`] enqueues the string on an unbounded
//!   channel and returns immediately. A background task started with
//!   [`PermissionRegistry::spawn_drain_task`] drains the queue on a fixed
//!   period. Cancelling the task abandons anything still queued.
//!
//! # Bounds
//!
//! Per-node fan-out is capped by depth and path depth is capped by
//! `max_depth` (see [`RegistryLimits`]). A full node silently refuses new
//! children; the rest of that path is dropped. Snapshot walks recurse once
//! per level, so `max_depth` also bounds their stack use.
//!
//! # Concurrency
//!
//! Each node owns its own `DashMap`, so concurrent inserts only contend on
//! the shard of the node they touch. There is no registry-wide lock.

mod node;
#[cfg(test)]
mod registry_proptest;
mod snapshot;
mod tree_view;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::error::DomainResult;
use crate::model::{split_segments, PermissionKey};

pub use node::RegistryLimits;
pub use snapshot::TreeSnapshot;
pub use tree_view::TreeView;

use node::TrieNode;

/// Default period between two drains of the deferred-insert queue.
pub const DEFAULT_DRAIN_INTERVAL: Duration = Duration::from_secs(1);

/// Returns true when `root_path` selects the whole registry.
pub(crate) fn is_whole_tree(root_path: &str) -> bool {
    let trimmed = root_path.trim();
    trimmed.is_empty() || trimmed == "*" || split_segments(trimmed).next().is_none()
}

/// Concurrent, depth-bounded prefix tree of permission strings.
pub struct PermissionRegistry {
    root: Arc<TrieNode>,
    limits: RegistryLimits,
    sender: UnboundedSender<String>,
    receiver: Mutex<UnboundedReceiver<String>>,
    pending: AtomicUsize,
}

impl std::fmt::Debug for PermissionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionRegistry")
            .field("limits", &self.limits)
            .field("pending", &self.pending())
            .finish()
    }
}

impl Default for PermissionRegistry {
    fn default() -> Self {
        Self::new(RegistryLimits::default())
    }
}

impl PermissionRegistry {
    /// Creates an empty registry with the given limits.
    pub fn new(limits: RegistryLimits) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            root: Arc::new(TrieNode::root()),
            limits,
            sender,
            receiver: Mutex::new(receiver),
            pending: AtomicUsize::new(0),
        }
    }

    /// Returns the fan-out limits of this registry.
    pub fn limits(&self) -> &RegistryLimits {
        &self.limits
    }

    /// Inserts a permission synchronously.
    ///
    /// Rejects empty input. Stops silently at the first node whose fan-out
    /// cap would be exceeded, or once `max_depth` segments were created.
    /// Re-inserting a known path is a no-op.
    pub fn insert(&self, permission: &str) -> DomainResult<()> {
        let key = PermissionKey::new(permission)?;
        self.insert_key(&key);
        Ok(())
    }

    /// Inserts an already validated permission synchronously.
    pub fn insert_key(&self, key: &PermissionKey) {
        let mut current = Arc::clone(&self.root);
        for segment in key.segments() {
            match current.child_or_insert(segment, &self.limits) {
                Some(next) => current = next,
                None => {
                    trace!(
                        permission = %key,
                        segment,
                        depth = current.depth(),
                        "Registry node full or at max depth, dropping remainder of permission"
                    );
                    metrics::counter!("permgraph_registry_insert_refused_total").increment(1);
                    break;
                }
            }
        }
    }

    /// Queues a permission for deferred insertion. Never fails.
    pub fn offer(&self, permission: impl Into<String>) {
        if self.sender.send(permission.into()).is_ok() {
            self.pending.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Queues several permissions for deferred insertion.
    pub fn offer_all<I, S>(&self, permissions: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for permission in permissions {
            self.offer(permission);
        }
    }

    /// Returns the approximate number of queued, not yet inserted strings.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Relaxed)
    }

    /// Inserts every queued permission, returning how many were drained.
    ///
    /// Failed entries are logged and skipped. Returns 0 without waiting if
    /// another drain is already running.
    pub fn drain_pending(&self) -> usize {
        let Some(mut receiver) = self.receiver.try_lock() else {
            return 0;
        };

        let mut drained = 0;
        while let Ok(permission) = receiver.try_recv() {
            self.pending.fetch_sub(1, Ordering::Relaxed);
            drained += 1;
            if let Err(e) = self.insert(&permission) {
                debug!(permission = %permission, error = %e, "Dropping deferred permission");
            }
        }
        drained
    }

    /// Spawns the background task draining the deferred-insert queue.
    ///
    /// The task ticks every `period` and exits when `token` is cancelled or
    /// the registry is dropped. Must be called from within a Tokio runtime.
    pub fn spawn_drain_task(
        self: &Arc<Self>,
        period: Duration,
        token: CancellationToken,
    ) -> JoinHandle<()> {
        let registry: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        let abandoned = registry.upgrade().map_or(0, |r| r.pending());
                        debug!(abandoned, "Registry drain task cancelled");
                        break;
                    }
                    _ = ticker.tick() => {
                        let Some(registry) = registry.upgrade() else {
                            break;
                        };
                        let drained = registry.drain_pending();
                        if drained > 0 {
                            trace!(drained, "Drained deferred permissions");
                        }
                    }
                }
            }
        })
    }

    /// Returns an immutable ordered copy of the subtree at `root_path`.
    ///
    /// `""`, `"*"` and `"."` select the whole registry. Returns `None` if
    /// the path was never inserted.
    pub fn snapshot(&self, root_path: &str) -> Option<TreeSnapshot> {
        let mut current = Arc::clone(&self.root);
        if !is_whole_tree(root_path) {
            let normalized = root_path.to_lowercase();
            for segment in split_segments(&normalized) {
                current = current.child(segment)?;
            }
        }
        Some(TreeSnapshot::capture(&current))
    }

    /// Returns every known permission path in snapshot order.
    pub fn known_permissions(&self) -> Vec<String> {
        self.snapshot("")
            .map(|tree| {
                tree.node_endings()
                    .into_iter()
                    .map(|(_, path)| path)
                    .collect()
            })
            .unwrap_or_default()
    }
}
