//! Property-based tests for the namespace registry.

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use crate::registry::PermissionRegistry;

    /// Strategy to generate lowercase dotted paths like "kit.use.daily"
    fn dotted_path_strategy() -> impl Strategy<Value = String> {
        prop::collection::vec("[a-z0-9]{1,6}", 1..5).prop_map(|parts| parts.join("."))
    }

    proptest! {
        #[test]
        fn test_reinserting_any_set_is_idempotent(
            paths in prop::collection::vec(dotted_path_strategy(), 1..20),
            repeats in 1usize..5,
        ) {
            let once = PermissionRegistry::default();
            for path in &paths {
                once.insert(path).unwrap();
            }

            let many = PermissionRegistry::default();
            for _ in 0..repeats {
                for path in &paths {
                    many.insert(path).unwrap();
                }
            }

            prop_assert_eq!(many.snapshot(""), once.snapshot(""));
        }

        #[test]
        fn test_every_inserted_path_is_known(
            paths in prop::collection::vec(dotted_path_strategy(), 1..20),
        ) {
            let registry = PermissionRegistry::default();
            for path in &paths {
                registry.insert(path).unwrap();
            }

            let known = registry.known_permissions();
            for path in &paths {
                prop_assert!(known.contains(path), "missing {}", path);
            }
        }

        #[test]
        fn test_case_variants_share_nodes(path in dotted_path_strategy()) {
            let registry = PermissionRegistry::default();
            registry.insert(&path).unwrap();
            let before = registry.snapshot("");

            registry.insert(&path.to_uppercase()).unwrap();
            prop_assert_eq!(registry.snapshot(""), before);
        }
    }
}
