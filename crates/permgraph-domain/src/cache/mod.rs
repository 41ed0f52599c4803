//! Memoized implication closures with wholesale invalidation.
//!
//! This module provides a bounded closure cache using Moka for concurrent
//! access.
//!
//! # Generations
//!
//! Invalidation never walks entries. [`ClosureCache::invalidate_all`] swaps
//! in a fresh, empty Moka cache. A computation that started before the swap
//! writes its result into the discarded generation, so a closure built from
//! pre-mutation adjacency can never be served afterwards.
//!
//! # Key Design
//!
//! Keys are `(root, value)`: the closures for granting and denying the same
//! root differ, and both are dropped together on invalidation.
//!
//! # Example
//!
//! ```rust,ignore
//! use permgraph_domain::cache::{ClosureCache, ClosureCacheConfig, ClosureKey};
//!
//! let cache = ClosureCache::new(ClosureCacheConfig::default());
//! let key = ClosureKey::new(PermissionKey::new("kit.admin")?, true);
//! let closure = cache.get_or_compute(key, || resolve());
//! cache.invalidate_all();
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use moka::sync::Cache;
use parking_lot::RwLock;

use crate::model::PermissionKey;

/// Flattened closure of a root permission: implied permission → value.
pub type Closure = HashMap<PermissionKey, bool>;

/// Configuration for the closure cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosureCacheConfig {
    /// Maximum number of closures held per generation.
    pub max_capacity: u64,
}

impl Default for ClosureCacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: 10_000,
        }
    }
}

impl ClosureCacheConfig {
    /// Sets the maximum capacity.
    pub fn with_max_capacity(mut self, max_capacity: u64) -> Self {
        self.max_capacity = max_capacity;
        self
    }
}

/// Cache key identifying one closure computation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClosureKey {
    /// The root permission.
    pub root: PermissionKey,
    /// The value the root is set to.
    pub value: bool,
}

impl ClosureKey {
    /// Creates a new cache key.
    pub fn new(root: PermissionKey, value: bool) -> Self {
        Self { root, value }
    }
}

/// Bounded cache of immutable closures.
///
/// Published entries are `Arc<Closure>` and never mutated, so readers can
/// never observe a partially built closure.
pub struct ClosureCache {
    current: RwLock<Cache<ClosureKey, Arc<Closure>>>,
    config: ClosureCacheConfig,
    generation: AtomicU64,
}

impl std::fmt::Debug for ClosureCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClosureCache")
            .field("config", &self.config)
            .field("generation", &self.generation())
            .field("entry_count", &self.entry_count())
            .finish()
    }
}

impl ClosureCache {
    /// Creates a new closure cache with the given configuration.
    pub fn new(config: ClosureCacheConfig) -> Self {
        Self {
            current: RwLock::new(Self::build(&config)),
            config,
            generation: AtomicU64::new(0),
        }
    }

    fn build(config: &ClosureCacheConfig) -> Cache<ClosureKey, Arc<Closure>> {
        Cache::builder().max_capacity(config.max_capacity).build()
    }

    /// Returns the configuration for this cache.
    pub fn config(&self) -> &ClosureCacheConfig {
        &self.config
    }

    /// Returns how many times the cache has been invalidated.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Retrieves a cached closure.
    pub fn get(&self, key: &ClosureKey) -> Option<Arc<Closure>> {
        let cache = self.current.read().clone();
        cache.get(key)
    }

    /// Returns the cached closure or computes and caches it.
    ///
    /// Concurrent misses for the same key may both compute; both results
    /// are equivalent and the later insert wins.
    ///
    /// # Metrics
    ///
    /// - `permgraph_closure_cache_hits_total`
    /// - `permgraph_closure_cache_misses_total`
    pub fn get_or_compute<F>(&self, key: ClosureKey, compute: F) -> Arc<Closure>
    where
        F: FnOnce() -> Closure,
    {
        // Pin the generation before computing.
        let cache = self.current.read().clone();
        if let Some(hit) = cache.get(&key) {
            metrics::counter!("permgraph_closure_cache_hits_total").increment(1);
            return hit;
        }
        metrics::counter!("permgraph_closure_cache_misses_total").increment(1);

        let closure = Arc::new(compute());
        cache.insert(key, Arc::clone(&closure));
        closure
    }

    /// Drops every cached closure for every root and value.
    pub fn invalidate_all(&self) {
        *self.current.write() = Self::build(&self.config);
        self.generation.fetch_add(1, Ordering::AcqRel);
        metrics::counter!("permgraph_closure_cache_invalidations_total").increment(1);
    }

    /// Returns the approximate number of entries in the current generation.
    pub fn entry_count(&self) -> u64 {
        self.current.read().entry_count()
    }

    /// Runs pending maintenance tasks.
    ///
    /// Makes `entry_count` exact. Useful for testing.
    pub fn run_pending_tasks(&self) {
        let cache = self.current.read().clone();
        cache.run_pending_tasks();
    }
}
