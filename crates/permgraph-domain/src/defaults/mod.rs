//! Default permission partitions.
//!
//! Two partitions exist, one per value of the `elevated` axis. Each owns an
//! explicit, insertion-ordered base set and a lazily rebuilt flattened
//! lookup that combines every member with its resolved closure.
//!
//! # State Machine
//!
//! ```text
//!            add / remove / add_all / invalidate
//!   CLEAN ─────────────────────────────────────────▶ DIRTY
//!     ▲                                                │
//!     └──────────────── lookup (rebuild) ◀─────────────┘
//! ```
//!
//! Partitions start DIRTY. A rebuild builds the complete map before
//! publishing it with a single reference swap, so readers see either the
//! previous map or the new one, never a partial merge. One rebuild runs at
//! a time per partition; a reader that loses the race reads the previously
//! published map if there is one.
//!
//! # Conflict Policy
//!
//! Members are processed in insertion order and every key keeps the first
//! value written. A member added earlier owns any permission also implied by
//! a later member.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::trace;

use crate::cache::Closure;
use crate::graph::ChangeNotifier;
use crate::model::{normalize, PermissionKey, Tristate};
use crate::resolver::ClosureProvider;

/// Insertion-ordered set of base members.
#[derive(Debug, Default)]
struct MemberSet {
    order: Vec<PermissionKey>,
    index: HashSet<PermissionKey>,
}

impl MemberSet {
    fn insert(&mut self, permission: PermissionKey) -> bool {
        if !self.index.insert(permission.clone()) {
            return false;
        }
        self.order.push(permission);
        true
    }

    fn remove(&mut self, permission: &str) -> bool {
        if !self.index.remove(permission) {
            return false;
        }
        self.order.retain(|member| member.as_str() != permission);
        true
    }
}

/// One default permission partition.
pub struct DefaultPartition {
    elevated: bool,
    members: RwLock<MemberSet>,
    published: RwLock<Option<Arc<Closure>>>,
    dirty: AtomicBool,
    rebuild: Mutex<()>,
    resolver: Arc<dyn ClosureProvider>,
    notifier: Arc<dyn ChangeNotifier>,
}

impl std::fmt::Debug for DefaultPartition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultPartition")
            .field("elevated", &self.elevated)
            .field("members", &self.members.read().order)
            .field("dirty", &self.is_dirty())
            .finish()
    }
}

impl DefaultPartition {
    /// Creates an empty, dirty partition.
    pub fn new(
        elevated: bool,
        resolver: Arc<dyn ClosureProvider>,
        notifier: Arc<dyn ChangeNotifier>,
    ) -> Self {
        Self {
            elevated,
            members: RwLock::new(MemberSet::default()),
            published: RwLock::new(None),
            dirty: AtomicBool::new(true),
            rebuild: Mutex::new(()),
            resolver,
            notifier,
        }
    }

    /// Returns which side of the elevated axis this partition serves.
    pub fn elevated(&self) -> bool {
        self.elevated
    }

    /// Returns true if the next lookup will rebuild.
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// Returns the base members in insertion order.
    pub fn members(&self) -> Vec<PermissionKey> {
        self.members.read().order.clone()
    }

    /// Adds a base member. Returns true if it was not already present.
    pub fn add(&self, permission: PermissionKey) -> bool {
        let added = self.members.write().insert(permission);
        self.changed();
        added
    }

    /// Adds several base members, preserving their order.
    ///
    /// Returns true if any of them was new.
    pub fn add_all(&self, permissions: impl IntoIterator<Item = PermissionKey>) -> bool {
        let added = {
            let mut members = self.members.write();
            permissions
                .into_iter()
                .fold(false, |any, permission| members.insert(permission) || any)
        };
        self.changed();
        added
    }

    /// Removes a base member. Returns true if it was present.
    pub fn remove(&self, permission: &PermissionKey) -> bool {
        let removed = self.members.write().remove(permission.as_str());
        self.changed();
        removed
    }

    /// Marks the flattened lookup stale without notifying anyone.
    ///
    /// Used when the resolver cache has been dropped; the owner notifies
    /// downstream calculators once for the whole graph change.
    pub fn invalidate(&self) {
        self.dirty.store(true, Ordering::Release);
    }

    fn changed(&self) {
        self.invalidate();
        self.notifier.on_graph_or_defaults_changed();
    }

    /// Looks up the default value of `permission` in this partition.
    pub fn lookup(&self, permission: &str) -> Tristate {
        let lookup = self.current();
        let value = lookup.get(&*normalize(permission)).copied();
        Tristate::from(value)
    }

    /// Returns the published lookup map, rebuilding it first if dirty.
    pub fn current(&self) -> Arc<Closure> {
        if !self.is_dirty() {
            if let Some(published) = self.published.read().clone() {
                return published;
            }
        }

        let _guard = match self.rebuild.try_lock() {
            Some(guard) => guard,
            None => {
                // Another caller is rebuilding; stale but consistent is fine.
                if let Some(published) = self.published.read().clone() {
                    return published;
                }
                self.rebuild.lock()
            }
        };

        // Clear before reading members so a concurrent mutation re-dirties.
        if self.dirty.swap(false, Ordering::AcqRel) {
            let rebuilt = Arc::new(self.build());
            *self.published.write() = Some(Arc::clone(&rebuilt));
            metrics::counter!("permgraph_defaults_rebuilds_total").increment(1);
            return rebuilt;
        }

        self.published.read().clone().unwrap_or_default()
    }

    fn build(&self) -> Closure {
        let members = self.members();
        let mut lookup = Closure::new();

        for member in &members {
            lookup.entry(member.clone()).or_insert(true);
            let closure = self.resolver.closure(member, true);
            for (permission, value) in closure.iter() {
                lookup.entry(permission.clone()).or_insert(*value);
            }
        }

        trace!(
            elevated = self.elevated,
            members = members.len(),
            entries = lookup.len(),
            "Rebuilt default permission lookup"
        );
        lookup
    }
}

/// The pair of default partitions, indexed by the elevated axis.
#[derive(Debug)]
pub struct DefaultPartitions {
    elevated: DefaultPartition,
    standard: DefaultPartition,
}

impl DefaultPartitions {
    /// Creates both partitions over the same resolver and notifier.
    pub fn new(resolver: Arc<dyn ClosureProvider>, notifier: Arc<dyn ChangeNotifier>) -> Self {
        Self {
            elevated: DefaultPartition::new(true, Arc::clone(&resolver), Arc::clone(&notifier)),
            standard: DefaultPartition::new(false, resolver, notifier),
        }
    }

    /// Returns the partition for one side of the elevated axis.
    pub fn get(&self, elevated: bool) -> &DefaultPartition {
        if elevated {
            &self.elevated
        } else {
            &self.standard
        }
    }

    /// Looks up a permission in the partition selected by `elevated`.
    pub fn lookup(&self, elevated: bool, permission: &str) -> Tristate {
        self.get(elevated).lookup(permission)
    }

    /// Marks both partitions stale.
    pub fn invalidate_all(&self) {
        self.elevated.invalidate();
        self.standard.invalidate();
    }
}
