//! Configuration for the implication resolver.

use crate::cache::ClosureCacheConfig;

/// Configuration for the implication resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Maximum number of distinct permissions recorded in one closure,
    /// root included. Reaching it returns the partial closure.
    pub max_visited: usize,
    /// Closure cache settings.
    pub cache: ClosureCacheConfig,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_visited: 4096,
            cache: ClosureCacheConfig::default(),
        }
    }
}

impl ResolverConfig {
    /// Creates a new configuration with the specified visit cap.
    pub fn with_max_visited(mut self, max_visited: usize) -> Self {
        self.max_visited = max_visited;
        self
    }

    /// Creates a new configuration with the specified cache settings.
    pub fn with_cache(mut self, cache: ClosureCacheConfig) -> Self {
        self.cache = cache;
        self
    }
}
