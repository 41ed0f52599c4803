//! Property-based tests for permission keys.

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use crate::model::PermissionKey;

    /// Strategy to generate dotted permission paths like "Foo.bar.BAZ"
    fn dotted_path_strategy() -> impl Strategy<Value = String> {
        prop::collection::vec("[a-zA-Z0-9_-]{1,8}", 1..6).prop_map(|parts| parts.join("."))
    }

    proptest! {
        #[test]
        fn test_key_identity_is_case_insensitive(path in dotted_path_strategy()) {
            let lower = PermissionKey::new(&path.to_lowercase()).unwrap();
            let upper = PermissionKey::new(&path.to_uppercase()).unwrap();
            prop_assert_eq!(lower, upper);
        }

        #[test]
        fn test_segments_match_split_parts(path in dotted_path_strategy()) {
            let key = PermissionKey::new(&path).unwrap();
            let expected: Vec<String> = path.to_lowercase().split('.').map(str::to_string).collect();
            let actual: Vec<String> = key.segments().map(str::to_string).collect();
            prop_assert_eq!(actual, expected);
        }

        #[test]
        fn test_separator_only_strings_are_rejected(dots in "\\.{0,10}") {
            prop_assert!(PermissionKey::new(&dots).is_err());
        }
    }
}
