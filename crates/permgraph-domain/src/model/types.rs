//! Core type definitions for permission definitions and lookups.

use std::fmt;

use super::key::PermissionKey;
use crate::watcher::ObservableMap;

/// Implication adjacency of a single permission: child → value.
pub type Adjacency = ObservableMap<PermissionKey, bool>;

/// Three-valued result of a permission lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Tristate {
    /// The permission is explicitly granted.
    Granted,
    /// The permission is explicitly denied.
    Denied,
    /// No value is known for the permission.
    #[default]
    Unset,
}

impl Tristate {
    /// Returns the boolean value, or `None` when unset.
    pub fn as_bool(self) -> Option<bool> {
        match self {
            Tristate::Granted => Some(true),
            Tristate::Denied => Some(false),
            Tristate::Unset => None,
        }
    }

    /// Returns true for [`Tristate::Granted`] only.
    pub fn is_granted(self) -> bool {
        self == Tristate::Granted
    }
}

impl From<bool> for Tristate {
    fn from(value: bool) -> Self {
        if value {
            Tristate::Granted
        } else {
            Tristate::Denied
        }
    }
}

impl From<Option<bool>> for Tristate {
    fn from(value: Option<bool>) -> Self {
        value.map_or(Tristate::Unset, Tristate::from)
    }
}

impl fmt::Display for Tristate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Tristate::Granted => "granted",
            Tristate::Denied => "denied",
            Tristate::Unset => "unset",
        };
        f.write_str(s)
    }
}

/// A permission definition registered by the host.
///
/// The host owns the definition; the graph only observes its children and
/// reads them during resolution.
#[derive(Debug)]
pub struct Permission {
    name: PermissionKey,
    description: Option<String>,
    children: Adjacency,
}

impl Permission {
    /// Creates a permission with no children.
    pub fn new(name: PermissionKey) -> Self {
        Self {
            name,
            description: None,
            children: Adjacency::new(),
        }
    }

    /// Creates a permission with initial children, in iteration order.
    pub fn with_children(
        name: PermissionKey,
        children: impl IntoIterator<Item = (PermissionKey, bool)>,
    ) -> Self {
        Self {
            name,
            description: None,
            children: Adjacency::from_entries(children),
        }
    }

    /// Sets a human-readable description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Returns the permission name.
    pub fn name(&self) -> &PermissionKey {
        &self.name
    }

    /// Returns the description, if any.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the observable children of this permission.
    pub fn children(&self) -> &Adjacency {
        &self.children
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tristate_from_option() {
        assert_eq!(Tristate::from(Some(true)), Tristate::Granted);
        assert_eq!(Tristate::from(Some(false)), Tristate::Denied);
        assert_eq!(Tristate::from(None), Tristate::Unset);
        assert_eq!(Tristate::Denied.as_bool(), Some(false));
        assert!(!Tristate::Unset.is_granted());
    }

    #[test]
    fn test_permission_keeps_children_order() {
        let permission = Permission::with_children(
            PermissionKey::new("kit.admin").unwrap(),
            vec![
                (PermissionKey::new("kit.use").unwrap(), true),
                (PermissionKey::new("kit.delete").unwrap(), false),
            ],
        )
        .with_description("Admin kits");

        let names: Vec<String> = permission
            .children()
            .entries()
            .into_iter()
            .map(|(k, _)| k.to_string())
            .collect();
        assert_eq!(names, vec!["kit.use", "kit.delete"]);
        assert_eq!(permission.description(), Some("Admin kits"));
    }
}
