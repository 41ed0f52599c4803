//! Traits at the seams of the resolver.

use std::sync::Arc;

use crate::cache::Closure;
use crate::model::PermissionKey;

/// Read access to per-permission implication adjacency.
pub trait AdjacencySource: Send + Sync {
    /// Returns the children of `permission` in iteration order, or `None`
    /// if the permission has no registered definition.
    fn children(&self, permission: &PermissionKey) -> Option<Vec<(PermissionKey, bool)>>;
}

/// Anything able to hand out memoized closures.
///
/// Default partitions depend on this rather than on a concrete resolver.
pub trait ClosureProvider: Send + Sync {
    /// Returns the transitive closure of `root` set to `value`, excluding
    /// `root` itself.
    fn closure(&self, root: &PermissionKey, value: bool) -> Arc<Closure>;
}
