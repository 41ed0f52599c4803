//! Implication resolver for permission closures.
//!
//! The resolver expands a root permission into every permission it
//! transitively implies, applying the host's sign-inversion rule.
//!
//! # Algorithm
//!
//! Depth-first from the single pair `{root: value}` with `invert = false`.
//! For each `(child, child_value)` of a visited permission:
//!
//! - `effective = child_value XOR invert`
//! - if `child` is not yet recorded, record `effective` and expand the
//!   child's own adjacency with `invert = !effective`
//! - otherwise keep the earlier value and do not expand again
//!
//! First write wins. The same rule is the cycle guard.
//!
//! # Bounds
//!
//! - **Visit cap**: at most `max_visited` distinct permissions are recorded.
//!   On reaching it the partial closure is returned and the truncation is
//!   logged. A capped closure is valid but possibly incomplete.
//! - **Stack**: traversal uses an explicit frame stack, so long implication
//!   chains cannot overflow the thread stack.
//!
//! # Memoization
//!
//! Results are cached per `(root, value)` in a [`ClosureCache`]. Any graph
//! mutation drops the whole cache via [`ImplicationResolver::invalidate`].

use std::sync::Arc;

use tracing::debug;

use crate::cache::{Closure, ClosureCache, ClosureKey};
use crate::model::PermissionKey;

use super::config::ResolverConfig;
use super::context::{Frame, TraversalContext};
use super::traits::{AdjacencySource, ClosureProvider};

/// Resolves and memoizes implication closures over an adjacency source.
///
/// Read-only with respect to the graph: adjacency is only ever read.
pub struct ImplicationResolver<S> {
    source: Arc<S>,
    cache: ClosureCache,
    config: ResolverConfig,
}

impl<S> std::fmt::Debug for ImplicationResolver<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImplicationResolver")
            .field("config", &self.config)
            .field("cache", &self.cache)
            .finish()
    }
}

impl<S> ImplicationResolver<S>
where
    S: AdjacencySource,
{
    /// Creates a resolver with default configuration.
    pub fn new(source: Arc<S>) -> Self {
        Self::with_config(source, ResolverConfig::default())
    }

    /// Creates a resolver with custom configuration.
    pub fn with_config(source: Arc<S>, config: ResolverConfig) -> Self {
        Self {
            source,
            cache: ClosureCache::new(config.cache.clone()),
            config,
        }
    }

    /// Returns the resolver configuration.
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Returns the closure cache.
    pub fn cache(&self) -> &ClosureCache {
        &self.cache
    }

    /// Returns the memoized closure of `root` set to `value`.
    pub fn closure(&self, root: &PermissionKey, value: bool) -> Arc<Closure> {
        self.cache
            .get_or_compute(ClosureKey::new(root.clone(), value), || {
                self.resolve(root, value)
            })
    }

    /// Drops every memoized closure.
    pub fn invalidate(&self) {
        self.cache.invalidate_all();
    }

    /// Computes a closure without consulting or populating the cache.
    pub fn resolve(&self, root: &PermissionKey, value: bool) -> Closure {
        let mut ctx = TraversalContext::new(self.config.max_visited);
        let mut stack = vec![Frame::new(vec![(root.clone(), value)], false)];

        while let Some(frame) = stack.last_mut() {
            let invert = frame.invert;
            let Some((child, child_value)) = frame.advance() else {
                stack.pop();
                continue;
            };

            if ctx.is_recorded(&child) {
                continue;
            }
            if ctx.is_full() {
                ctx.truncated = true;
                break;
            }

            let effective = child_value ^ invert;
            if let Some(grandchildren) = self.source.children(&child) {
                if !grandchildren.is_empty() {
                    stack.push(Frame::new(grandchildren, !effective));
                }
            }
            ctx.record(child, effective);
        }

        if ctx.truncated {
            debug!(
                root = %root,
                value,
                max_visited = self.config.max_visited,
                "Closure traversal reached visit cap, returning partial closure"
            );
            metrics::counter!("permgraph_closure_truncated_total").increment(1);
        }

        let mut closure = ctx.recorded;
        closure.remove(root);
        closure
    }
}

impl<S> ClosureProvider for ImplicationResolver<S>
where
    S: AdjacencySource,
{
    fn closure(&self, root: &PermissionKey, value: bool) -> Arc<Closure> {
        ImplicationResolver::closure(self, root, value)
    }
}
