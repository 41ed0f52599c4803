//! The permission graph: registered definitions and the components over them.
//!
//! [`PermissionGraph`] is the owning system. It stores host permission
//! definitions, feeds their names to the [`PermissionRegistry`], observes
//! their children through the [`MutationWatcher`], resolves closures with an
//! [`ImplicationResolver`] and serves the two [`DefaultPartitions`].
//!
//! # Invalidation Order
//!
//! Any observed mutation (or a register/unregister) runs, in order:
//!
//! 1. resolver closure cache swapped to empty
//! 2. both default partitions marked dirty
//! 3. [`ChangeNotifier::on_graph_or_defaults_changed`]
//!
//! # Wiring
//!
//! Dependencies are passed explicitly at construction. Adjacency observers
//! hold a `Weak` reference to the graph, so registered permissions never
//! keep it alive.

use std::sync::{Arc, Weak};

use dashmap::DashMap;
use tracing::debug;

use crate::cache::Closure;
use crate::defaults::DefaultPartitions;
use crate::model::{normalize, Permission, PermissionKey, Tristate};
use crate::registry::{PermissionRegistry, RegistryLimits, TreeSnapshot, TreeView};
use crate::resolver::{AdjacencySource, ClosureProvider, ImplicationResolver, ResolverConfig};
use crate::watcher::{MutationObserver, MutationWatcher};

/// Callback into the external authorization engine.
///
/// Invoked whenever memoized closures are dropped or a default partition
/// becomes dirty, so the engine can invalidate its own calculators.
/// Implementations must not block; deferring the work is fine.
pub trait ChangeNotifier: Send + Sync {
    /// The graph or a default partition changed.
    fn on_graph_or_defaults_changed(&self);
}

/// A notifier that does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl ChangeNotifier for NoopNotifier {
    fn on_graph_or_defaults_changed(&self) {}
}

/// Configuration for a [`PermissionGraph`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphConfig {
    /// Registry fan-out limits.
    pub registry: RegistryLimits,
    /// Resolver and closure cache settings.
    pub resolver: ResolverConfig,
}

impl GraphConfig {
    /// Sets the registry limits.
    pub fn with_registry(mut self, registry: RegistryLimits) -> Self {
        self.registry = registry;
        self
    }

    /// Sets the resolver configuration.
    pub fn with_resolver(mut self, resolver: ResolverConfig) -> Self {
        self.resolver = resolver;
        self
    }
}

/// Registered permission definitions, keyed by lowercase name.
#[derive(Debug, Default)]
pub struct PermissionMap {
    permissions: DashMap<PermissionKey, Arc<Permission>>,
}

impl PermissionMap {
    /// Returns the definition registered under `name`.
    pub fn get(&self, name: &str) -> Option<Arc<Permission>> {
        self.permissions
            .get(&*normalize(name))
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Returns the number of registered definitions.
    pub fn len(&self) -> usize {
        self.permissions.len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty()
    }

    fn insert(&self, permission: Arc<Permission>) -> Option<Arc<Permission>> {
        self.permissions
            .insert(permission.name().clone(), permission)
    }

    fn remove(&self, name: &str) -> Option<Arc<Permission>> {
        self.permissions
            .remove(&*normalize(name))
            .map(|(_, permission)| permission)
    }

    fn values(&self) -> Vec<Arc<Permission>> {
        self.permissions
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }
}

impl AdjacencySource for PermissionMap {
    fn children(&self, permission: &PermissionKey) -> Option<Vec<(PermissionKey, bool)>> {
        let definition = self
            .permissions
            .get(permission)
            .map(|entry| Arc::clone(entry.value()))?;
        Some(definition.children().entries())
    }
}

/// The owning system for permission definitions and their derived views.
pub struct PermissionGraph {
    registry: Arc<PermissionRegistry>,
    permissions: Arc<PermissionMap>,
    watcher: MutationWatcher,
    resolver: Arc<ImplicationResolver<PermissionMap>>,
    defaults: DefaultPartitions,
    notifier: Arc<dyn ChangeNotifier>,
}

impl std::fmt::Debug for PermissionGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionGraph")
            .field("registry", &self.registry)
            .field("permissions", &self.permissions.len())
            .field("resolver", &self.resolver)
            .field("defaults", &self.defaults)
            .finish()
    }
}

impl PermissionGraph {
    /// Builds an empty graph.
    pub fn new(config: GraphConfig, notifier: Arc<dyn ChangeNotifier>) -> Arc<Self> {
        Arc::new_cyclic(|this: &Weak<Self>| {
            let observer: Weak<dyn MutationObserver> = this.clone();
            let permissions = Arc::new(PermissionMap::default());
            let resolver = Arc::new(ImplicationResolver::with_config(
                Arc::clone(&permissions),
                config.resolver,
            ));
            let provider: Arc<dyn ClosureProvider> = resolver.clone();
            let defaults = DefaultPartitions::new(provider, Arc::clone(&notifier));

            Self {
                registry: Arc::new(PermissionRegistry::new(config.registry)),
                permissions,
                watcher: MutationWatcher::new(observer),
                resolver,
                defaults,
                notifier,
            }
        })
    }

    /// Returns the namespace registry.
    pub fn registry(&self) -> &Arc<PermissionRegistry> {
        &self.registry
    }

    /// Returns the registered definitions.
    pub fn permissions(&self) -> &PermissionMap {
        &self.permissions
    }

    /// Returns the definition registered under `name`.
    pub fn get(&self, name: &str) -> Option<Arc<Permission>> {
        self.permissions.get(name)
    }

    /// Returns the number of registered definitions.
    pub fn len(&self) -> usize {
        self.permissions.len()
    }

    /// Returns true if no definition is registered.
    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty()
    }

    /// Returns the implication resolver.
    pub fn resolver(&self) -> &ImplicationResolver<PermissionMap> {
        &self.resolver
    }

    /// Returns the default permission partitions.
    pub fn defaults(&self) -> &DefaultPartitions {
        &self.defaults
    }

    /// Registers a definition, replacing any previous one with the same name.
    ///
    /// The name is inserted into the registry right away and the children
    /// are observed from now on. No drain task is needed for registered
    /// names; only strings passed to [`PermissionRegistry::offer`] wait for
    /// one.
    pub fn register(&self, permission: Permission) -> Arc<Permission> {
        let permission = self.attach(permission);
        self.invalidate();
        permission
    }

    /// Registers several definitions with a single invalidation.
    pub fn register_all(
        &self,
        permissions: impl IntoIterator<Item = Permission>,
    ) -> Vec<Arc<Permission>> {
        let registered = permissions
            .into_iter()
            .map(|permission| self.attach(permission))
            .collect();
        self.invalidate();
        registered
    }

    fn attach(&self, permission: Permission) -> Arc<Permission> {
        let permission = Arc::new(permission);
        self.registry.insert_key(permission.name());
        self.watcher.observe(&permission);
        if let Some(previous) = self.permissions.insert(Arc::clone(&permission)) {
            self.watcher.unobserve(&previous);
        }
        permission
    }

    /// Removes a definition and stops observing its children.
    pub fn unregister(&self, name: &str) -> Option<Arc<Permission>> {
        let removed = self.permissions.remove(name)?;
        self.watcher.unobserve(&removed);
        self.invalidate();
        Some(removed)
    }

    /// Returns the closure of `permission` set to `value`.
    ///
    /// Invalid permission strings have an empty closure.
    pub fn closure(&self, permission: &str, value: bool) -> Arc<Closure> {
        match PermissionKey::new(permission) {
            Ok(root) => self.resolver.closure(&root, value),
            Err(e) => {
                debug!(error = %e, "Closure requested for invalid permission");
                Arc::default()
            }
        }
    }

    /// Looks up the default value of `permission` for one side of the
    /// elevated axis.
    pub fn lookup_default(&self, elevated: bool, permission: &str) -> Tristate {
        self.defaults.lookup(elevated, permission)
    }

    /// Returns an ordered snapshot of the registry at `root_path`.
    pub fn snapshot(&self, root_path: &str) -> Option<TreeSnapshot> {
        self.registry.snapshot(root_path)
    }

    /// Captures a renderable view of the registry at `root_path`.
    pub fn tree_view(&self, root_path: &str, max_level: usize) -> TreeView {
        TreeView::new(&self.registry, root_path, max_level)
    }

    /// Drops memoized closures, dirties both partitions and notifies the
    /// external engine.
    pub fn invalidate(&self) {
        self.resolver.invalidate();
        self.defaults.invalidate_all();
        self.notifier.on_graph_or_defaults_changed();
    }
}

impl MutationObserver for PermissionGraph {
    fn on_mutation(&self) {
        self.invalidate();
    }
}

impl Drop for PermissionGraph {
    fn drop(&mut self) {
        for permission in self.permissions.values() {
            self.watcher.unobserve(&permission);
        }
    }
}
