//! permgraph-domain: Core permission implication logic
//!
//! This crate contains the in-memory permission graph including:
//! - Namespace trie of every permission string seen
//! - Mutation watching of permission children
//! - Implication closure resolution with caching
//! - Default permission partitions
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              permgraph-domain                │
//! ├─────────────────────────────────────────────┤
//! │  model/     - Keys, definitions, tristate   │
//! │  registry/  - Namespace trie & tree views   │
//! │  watcher/   - Observable children maps      │
//! │  resolver/  - Implication closure engine    │
//! │  cache/     - Closure memoization           │
//! │  defaults/  - Default permission partitions │
//! │  graph/     - Owning permission graph       │
//! └─────────────────────────────────────────────┘
//! ```

pub mod cache;
pub mod defaults;
pub mod error;
pub mod graph;
pub mod model;
pub mod registry;
pub mod resolver;
pub mod watcher;

// Re-export commonly used types at the crate root
pub use cache::{Closure, ClosureCache, ClosureCacheConfig};
pub use defaults::{DefaultPartition, DefaultPartitions};
pub use error::{DomainError, DomainResult};
pub use graph::{ChangeNotifier, GraphConfig, NoopNotifier, PermissionGraph, PermissionMap};
pub use model::{Permission, PermissionKey, Tristate};
pub use registry::{PermissionRegistry, RegistryLimits, TreeSnapshot, TreeView};
pub use resolver::{AdjacencySource, ClosureProvider, ImplicationResolver, ResolverConfig};
pub use watcher::{MutationObserver, MutationWatcher, ObservableMap};
