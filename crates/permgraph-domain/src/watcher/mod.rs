//! Mutation tracking for permission implication adjacency.
//!
//! Each registered [`Permission`] owns its children as an [`ObservableMap`].
//! The [`MutationWatcher`] attaches the owning graph to that map so that any
//! `put`/`put_all`/`remove`/`clear` raises one coarse "changed" signal.
//!
//! # Granularity
//!
//! There is no per-root dependency tracking. Any edge change anywhere fires
//! the same signal and the resolver drops every memoized closure. In the
//! worst case the graph is transitively connected, so a single edge can
//! affect arbitrarily many roots.
//!
//! # Ownership
//!
//! The observer slot stores a [`Weak`] reference. A map never keeps its
//! observer alive, and a detached map holds no observer at all.

use std::borrow::Borrow;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::model::Permission;

/// Receives a notification whenever an observed container is mutated.
pub trait MutationObserver: Send + Sync {
    /// Called after a mutation has been applied and all container locks
    /// have been released.
    fn on_mutation(&self);
}

/// An insertion-ordered map that notifies an attached observer on mutation.
///
/// Entries keep the order in which their keys were first inserted; updating
/// an existing key keeps its position. Resolution order depends on this.
pub struct ObservableMap<K, V> {
    entries: RwLock<Vec<(K, V)>>,
    observer: RwLock<Option<Weak<dyn MutationObserver>>>,
}

impl<K, V> Default for ObservableMap<K, V> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            observer: RwLock::new(None),
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for ObservableMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservableMap")
            .field("entries", &*self.entries.read())
            .field("observed", &self.is_observed())
            .finish()
    }
}

impl<K, V> ObservableMap<K, V>
where
    K: Eq + Clone,
    V: Clone,
{
    /// Creates an empty, unobserved map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an unobserved map from initial entries.
    ///
    /// Later duplicates overwrite earlier values in place.
    pub fn from_entries(entries: impl IntoIterator<Item = (K, V)>) -> Self {
        let map = Self::new();
        {
            let mut guard = map.entries.write();
            for (key, value) in entries {
                upsert(&mut guard, key, value);
            }
        }
        map
    }

    /// Inserts or updates an entry, returning the previous value.
    pub fn put(&self, key: K, value: V) -> Option<V> {
        let previous = upsert(&mut self.entries.write(), key, value);
        self.notify();
        previous
    }

    /// Inserts or updates every entry, firing a single notification.
    pub fn put_all(&self, entries: impl IntoIterator<Item = (K, V)>) {
        {
            let mut guard = self.entries.write();
            for (key, value) in entries {
                upsert(&mut guard, key, value);
            }
        }
        self.notify();
    }

    /// Removes an entry, returning its value if present.
    pub fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
    {
        let removed = {
            let mut guard = self.entries.write();
            let index = guard.iter().position(|(k, _)| k.borrow() == key);
            index.map(|index| guard.remove(index).1)
        };
        self.notify();
        removed
    }

    /// Removes every entry.
    pub fn clear(&self) {
        self.entries.write().clear();
        self.notify();
    }

    /// Returns the value for a key.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
    {
        self.entries
            .read()
            .iter()
            .find(|(k, _)| k.borrow() == key)
            .map(|(_, v)| v.clone())
    }

    /// Returns whether the key is present.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
    {
        self.entries.read().iter().any(|(k, _)| k.borrow() == key)
    }

    /// Returns a point-in-time copy of the entries in insertion order.
    pub fn entries(&self) -> Vec<(K, V)> {
        self.entries.read().clone()
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns whether the map is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl<K, V> ObservableMap<K, V> {
    /// Returns whether an observer is currently attached and still alive.
    pub fn is_observed(&self) -> bool {
        self.observer
            .read()
            .as_ref()
            .is_some_and(|observer| observer.strong_count() > 0)
    }

    /// Replaces the observer slot. Attaching twice never nests observers.
    pub(crate) fn attach(&self, observer: Weak<dyn MutationObserver>) {
        *self.observer.write() = Some(observer);
    }

    /// Clears the observer slot, returning whether one was attached.
    pub(crate) fn detach(&self) -> bool {
        self.observer.write().take().is_some()
    }

    fn notify(&self) {
        // Upgrade under the read lock, call outside of it.
        let observer: Option<Arc<dyn MutationObserver>> =
            self.observer.read().as_ref().and_then(Weak::upgrade);
        if let Some(observer) = observer {
            observer.on_mutation();
        }
    }
}

fn upsert<K: Eq, V>(entries: &mut Vec<(K, V)>, key: K, value: V) -> Option<V> {
    match entries.iter_mut().find(|(k, _)| *k == key) {
        Some((_, existing)) => Some(std::mem::replace(existing, value)),
        None => {
            entries.push((key, value));
            None
        }
    }
}

/// Attaches and detaches the owning graph to permission adjacency.
pub struct MutationWatcher {
    observer: Weak<dyn MutationObserver>,
}

impl fmt::Debug for MutationWatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationWatcher")
            .field("observer_alive", &(self.observer.strong_count() > 0))
            .finish()
    }
}

impl MutationWatcher {
    /// Creates a watcher that routes every observed mutation to `observer`.
    pub fn new(observer: Weak<dyn MutationObserver>) -> Self {
        Self { observer }
    }

    /// Starts observing the permission's children.
    ///
    /// Idempotent: observing an already observed permission replaces the
    /// previous attachment.
    pub fn observe(&self, permission: &Permission) {
        permission.children().attach(self.observer.clone());
    }

    /// Stops observing the permission's children.
    ///
    /// Must be called before a permission leaves the graph.
    pub fn unobserve(&self, permission: &Permission) -> bool {
        permission.children().detach()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::model::PermissionKey;

    #[derive(Default)]
    struct CountingObserver {
        count: AtomicUsize,
    }

    impl MutationObserver for CountingObserver {
        fn on_mutation(&self) {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl CountingObserver {
        fn count(&self) -> usize {
            self.count.load(Ordering::SeqCst)
        }
    }

    fn key(s: &str) -> PermissionKey {
        PermissionKey::new(s).unwrap()
    }

    fn watcher_for(observer: &Arc<CountingObserver>) -> MutationWatcher {
        let weak: Weak<CountingObserver> = Arc::downgrade(observer);
        MutationWatcher::new(weak)
    }

    #[test]
    fn test_every_mutation_fires_exactly_one_notification() {
        let observer = Arc::new(CountingObserver::default());
        let watcher = watcher_for(&observer);
        let permission = Permission::new(key("root"));
        watcher.observe(&permission);

        permission.children().put(key("a"), true);
        permission
            .children()
            .put_all(vec![(key("b"), false), (key("c"), true)]);
        permission.children().remove("a");
        permission.children().clear();

        assert_eq!(observer.count(), 4);
        assert!(permission.children().is_empty());
    }

    #[test]
    fn test_observing_twice_does_not_nest_notifications() {
        let observer = Arc::new(CountingObserver::default());
        let watcher = watcher_for(&observer);
        let permission = Permission::new(key("root"));

        watcher.observe(&permission);
        watcher.observe(&permission);
        permission.children().put(key("a"), true);

        assert_eq!(observer.count(), 1);
    }

    #[test]
    fn test_unobserve_detaches_the_observer() {
        let observer = Arc::new(CountingObserver::default());
        let watcher = watcher_for(&observer);
        let permission = Permission::new(key("root"));

        watcher.observe(&permission);
        assert!(permission.children().is_observed());
        assert!(watcher.unobserve(&permission));
        assert!(!permission.children().is_observed());

        permission.children().put(key("a"), true);
        assert_eq!(observer.count(), 0);
        assert!(!watcher.unobserve(&permission));
    }

    #[test]
    fn test_dropped_observer_is_not_kept_alive() {
        let observer = Arc::new(CountingObserver::default());
        let watcher = watcher_for(&observer);
        let permission = Permission::new(key("root"));
        watcher.observe(&permission);

        drop(observer);

        assert!(!permission.children().is_observed());
        permission.children().put(key("a"), true);
        assert_eq!(permission.children().len(), 1);
    }

    #[test]
    fn test_updates_keep_insertion_position() {
        let map = ObservableMap::from_entries(vec![(key("a"), true), (key("b"), true)]);
        assert_eq!(map.put(key("a"), false), Some(true));

        let entries = map.entries();
        assert_eq!(entries[0], (key("a"), false));
        assert_eq!(entries[1], (key("b"), true));
        assert_eq!(map.get("a"), Some(false));
        assert!(map.contains_key("b"));
        assert!(!map.contains_key("c"));
    }
}
