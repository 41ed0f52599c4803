//! Trie nodes and fan-out limits.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// Fan-out caps applied while inserting into the registry.
///
/// Plugins may register per-entity permissions (one per world, per kit, per
/// player...). Capping the number of distinct children per node bounds the
/// memory an adversarial namespace can consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryLimits {
    /// Deepest level (inclusive) that uses `shallow_fanout`.
    pub shallow_depth: usize,
    /// Maximum children per node at depth `1..=shallow_depth`.
    pub shallow_fanout: usize,
    /// Maximum children per node below `shallow_depth`.
    pub deep_fanout: usize,
    /// Deepest node an insert may create. Segments past it are dropped.
    pub max_depth: usize,
}

impl Default for RegistryLimits {
    fn default() -> Self {
        Self {
            shallow_depth: 2,
            shallow_fanout: 500,
            deep_fanout: 100,
            max_depth: 64,
        }
    }
}

impl RegistryLimits {
    /// Sets the fan-out cap for shallow nodes.
    pub fn with_shallow_fanout(mut self, fanout: usize) -> Self {
        self.shallow_fanout = fanout;
        self
    }

    /// Sets the fan-out cap for deep nodes.
    pub fn with_deep_fanout(mut self, fanout: usize) -> Self {
        self.deep_fanout = fanout;
        self
    }

    /// Sets the deepest node an insert may create.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Returns the cap for a node at `depth`. The root is unbounded.
    pub fn fanout_at(&self, depth: usize) -> Option<usize> {
        match depth {
            0 => None,
            d if d <= self.shallow_depth => Some(self.shallow_fanout),
            _ => Some(self.deep_fanout),
        }
    }
}

/// One segment of a permission path.
///
/// Nodes are never removed. The child map is created on first insert and is
/// only ever grown afterwards.
#[derive(Debug)]
pub(crate) struct TrieNode {
    depth: usize,
    children: OnceLock<DashMap<String, Arc<TrieNode>>>,
    child_count: AtomicUsize,
}

impl TrieNode {
    pub(crate) fn root() -> Self {
        Self::at_depth(0)
    }

    fn at_depth(depth: usize) -> Self {
        Self {
            depth,
            children: OnceLock::new(),
            child_count: AtomicUsize::new(0),
        }
    }

    pub(crate) fn depth(&self) -> usize {
        self.depth
    }

    /// Returns the child map, if any child was ever inserted.
    pub(crate) fn children(&self) -> Option<&DashMap<String, Arc<TrieNode>>> {
        self.children.get()
    }

    /// Returns the existing child for `segment`.
    pub(crate) fn child(&self, segment: &str) -> Option<Arc<TrieNode>> {
        self.children()?
            .get(segment)
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Returns the child for `segment`, creating it when the cap allows.
    ///
    /// Returns `None` when the node is full and `segment` is new.
    pub(crate) fn child_or_insert(
        &self,
        segment: &str,
        limits: &RegistryLimits,
    ) -> Option<Arc<TrieNode>> {
        if let Some(existing) = self.child(segment) {
            return Some(existing);
        }

        if self.depth >= limits.max_depth {
            return None;
        }

        let children = self.children.get_or_init(DashMap::new);
        match children.entry(segment.to_string()) {
            Entry::Occupied(entry) => Some(Arc::clone(entry.get())),
            Entry::Vacant(entry) => {
                // Reserve a slot before publishing so the cap holds under races.
                if !self.reserve_slot(limits.fanout_at(self.depth)) {
                    return None;
                }
                let child = Arc::new(TrieNode::at_depth(self.depth + 1));
                entry.insert(Arc::clone(&child));
                Some(child)
            }
        }
    }

    fn reserve_slot(&self, cap: Option<usize>) -> bool {
        match cap {
            None => {
                self.child_count.fetch_add(1, Ordering::AcqRel);
                true
            }
            Some(cap) => self
                .child_count
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| {
                    (count < cap).then_some(count + 1)
                })
                .is_ok(),
        }
    }
}

impl Drop for TrieNode {
    // Unlinks descendants iteratively so tearing down a long chain does not
    // recurse once per segment.
    fn drop(&mut self) {
        let mut stack: Vec<Arc<TrieNode>> = match self.children.take() {
            Some(children) => children.into_iter().map(|(_, child)| child).collect(),
            None => return,
        };
        while let Some(node) = stack.pop() {
            if let Some(mut node) = Arc::into_inner(node) {
                if let Some(children) = node.children.take() {
                    stack.extend(children.into_iter().map(|(_, child)| child));
                }
            }
        }
    }
}
