//! Internal traversal state for closure computation.

use crate::cache::Closure;
use crate::model::PermissionKey;

/// One level of the explicit depth-first stack.
#[derive(Debug)]
pub(crate) struct Frame {
    /// Children of the permission being expanded.
    pub(crate) entries: Vec<(PermissionKey, bool)>,
    /// Index of the next entry to visit.
    pub(crate) next: usize,
    /// Sign applied to every entry of this frame.
    pub(crate) invert: bool,
}

impl Frame {
    pub(crate) fn new(entries: Vec<(PermissionKey, bool)>, invert: bool) -> Self {
        Self {
            entries,
            next: 0,
            invert,
        }
    }

    /// Returns the next unvisited entry of this frame.
    pub(crate) fn advance(&mut self) -> Option<(PermissionKey, bool)> {
        let entry = self.entries.get(self.next).cloned();
        if entry.is_some() {
            self.next += 1;
        }
        entry
    }
}

/// Accumulated result of one traversal.
///
/// The recorded map doubles as the visited set: a permission is expanded at
/// most once, which is what makes cyclic graphs terminate.
#[derive(Debug)]
pub(crate) struct TraversalContext {
    pub(crate) recorded: Closure,
    max_visited: usize,
    pub(crate) truncated: bool,
}

impl TraversalContext {
    pub(crate) fn new(max_visited: usize) -> Self {
        Self {
            recorded: Closure::new(),
            max_visited,
            truncated: false,
        }
    }

    pub(crate) fn is_recorded(&self, permission: &PermissionKey) -> bool {
        self.recorded.contains_key(permission)
    }

    pub(crate) fn is_full(&self) -> bool {
        self.recorded.len() >= self.max_visited
    }

    pub(crate) fn record(&mut self, permission: PermissionKey, value: bool) {
        self.recorded.insert(permission, value);
    }
}
