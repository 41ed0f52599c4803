//! Immutable, ordered copies of registry subtrees.

use std::cmp::Ordering;
use std::sync::Arc;

use serde_json::{Map, Value};

use super::node::TrieNode;
use crate::model::SEGMENT_SEPARATOR;

/// An immutable copy of a registry subtree.
///
/// Siblings are ordered leaves first, then branches; each group is sorted
/// case-insensitively. The order is fixed at capture time, so iterating a
/// snapshot is deterministic regardless of insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeSnapshot {
    children: Vec<(String, TreeSnapshot)>,
}

impl TreeSnapshot {
    pub(crate) fn capture(node: &TrieNode) -> Self {
        // Copy the child handles first so no shard lock is held while recursing.
        let handles: Vec<(String, Arc<TrieNode>)> = node
            .children()
            .map(|children| {
                children
                    .iter()
                    .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
                    .collect()
            })
            .unwrap_or_default();

        let mut children: Vec<(String, TreeSnapshot)> = handles
            .into_iter()
            .map(|(name, child)| (name, TreeSnapshot::capture(&child)))
            .collect();
        children.sort_by(|(a_name, a), (b_name, b)| {
            a.has_children()
                .cmp(&b.has_children())
                .then_with(|| compare_ignore_case(a_name, b_name))
        });

        Self { children }
    }

    /// Returns the ordered children of this node.
    pub fn children(&self) -> &[(String, TreeSnapshot)] {
        &self.children
    }

    /// Returns the child with the given segment name.
    pub fn child(&self, name: &str) -> Option<&TreeSnapshot> {
        self.children
            .iter()
            .find(|(child_name, _)| child_name == name)
            .map(|(_, child)| child)
    }

    /// Returns true if this node has any children.
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Returns the total number of nodes below this one.
    pub fn node_count(&self) -> usize {
        self.children
            .iter()
            .map(|(_, child)| 1 + child.node_count())
            .sum()
    }

    /// Flattens the snapshot into `(depth, path)` pairs, depth-first.
    ///
    /// Every node is emitted, with depth relative to this node (direct
    /// children are depth 0) and its path joined with `.`.
    pub fn node_endings(&self) -> Vec<(usize, String)> {
        let mut endings = Vec::with_capacity(self.node_count());
        self.collect_endings(0, "", &mut endings);
        endings
    }

    fn collect_endings(&self, depth: usize, prefix: &str, out: &mut Vec<(usize, String)>) {
        for (name, child) in &self.children {
            let path = format!("{prefix}{name}");
            let child_prefix = format!("{path}{SEGMENT_SEPARATOR}");
            out.push((depth, path));
            child.collect_endings(depth + 1, &child_prefix, out);
        }
    }

    /// Exports the snapshot as nested JSON objects keyed by full path.
    ///
    /// ```text
    /// { "a": {}, "b": { "b.x": {} } }
    /// ```
    ///
    /// Leaves are empty objects. Keys follow snapshot order.
    pub fn to_json(&self, prefix: &str) -> Value {
        let mut object = Map::new();
        for (name, child) in &self.children {
            let path = format!("{prefix}{name}");
            let nested = child.to_json(&format!("{path}{SEGMENT_SEPARATOR}"));
            object.insert(path, nested);
        }
        Value::Object(object)
    }
}

fn compare_ignore_case(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}
