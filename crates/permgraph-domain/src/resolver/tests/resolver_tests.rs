//! Implication resolver test suite.
//!
//! Covers closure semantics (transitivity, sign inversion, first-write-wins,
//! cycles), the visit cap and cache behaviour.

use std::collections::HashMap;
use std::sync::Arc;

use super::mocks::{key, MockAdjacencySource};
use crate::cache::Closure;
use crate::resolver::{ClosureProvider, ImplicationResolver, ResolverConfig};

fn as_plain(closure: &Closure) -> HashMap<String, bool> {
    closure
        .iter()
        .map(|(k, v)| (k.to_string(), *v))
        .collect()
}

fn expected(entries: &[(&str, bool)]) -> HashMap<String, bool> {
    entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

// ========== Section 1: Direct and Transitive Implication ==========

#[test]
fn test_closure_of_unknown_permission_is_empty() {
    let source = Arc::new(MockAdjacencySource::new());
    let resolver = ImplicationResolver::new(source);

    let closure = resolver.closure(&key("nothing.here"), true);
    assert!(closure.is_empty());
}

#[test]
fn test_closure_follows_transitive_children() {
    let source = Arc::new(MockAdjacencySource::new());
    source.set_children("kit.*", &[("kit.use", true), ("kit.admin", true)]);
    source.set_children("kit.admin", &[("kit.delete", true)]);
    let resolver = ImplicationResolver::new(source);

    let closure = resolver.closure(&key("kit.*"), true);
    assert_eq!(
        as_plain(&closure),
        expected(&[("kit.use", true), ("kit.admin", true), ("kit.delete", true)])
    );
}

#[test]
fn test_root_is_excluded_from_its_closure() {
    let source = Arc::new(MockAdjacencySource::new());
    source.set_children("a", &[("a", false), ("b", true)]);
    let resolver = ImplicationResolver::new(source);

    let closure = resolver.closure(&key("a"), true);
    assert!(!closure.contains_key("a"));
    assert_eq!(as_plain(&closure), expected(&[("b", true)]));
}

#[test]
fn test_mixed_case_children_are_normalized() {
    let source = Arc::new(MockAdjacencySource::new());
    source.set_children("a", &[("Foo.BAR", true)]);
    source.set_children("foo.bar", &[("baz", true)]);
    let resolver = ImplicationResolver::new(source);

    let closure = resolver.closure(&key("A"), true);
    assert_eq!(
        as_plain(&closure),
        expected(&[("foo.bar", true), ("baz", true)])
    );
}

// ========== Section 2: Sign Inversion ==========

#[test]
fn test_sign_inversion_worked_example() {
    let source = Arc::new(MockAdjacencySource::new());
    source.set_children("a", &[("b", false)]);
    source.set_children("b", &[("c", true)]);
    let resolver = ImplicationResolver::new(source);

    let closure = resolver.closure(&key("a"), true);
    assert_eq!(as_plain(&closure), expected(&[("b", false), ("c", false)]));
}

#[test]
fn test_false_root_inverts_its_children() {
    let source = Arc::new(MockAdjacencySource::new());
    source.set_children("a", &[("b", true), ("c", false)]);
    let resolver = ImplicationResolver::new(source);

    let closure = resolver.closure(&key("a"), false);
    assert_eq!(as_plain(&closure), expected(&[("b", false), ("c", true)]));
}

#[test]
fn test_true_chain_keeps_values() {
    let source = Arc::new(MockAdjacencySource::new());
    source.set_children("a", &[("b", true)]);
    source.set_children("b", &[("c", true)]);
    source.set_children("c", &[("d", false)]);
    let resolver = ImplicationResolver::new(source);

    let closure = resolver.closure(&key("a"), true);
    assert_eq!(
        as_plain(&closure),
        expected(&[("b", true), ("c", true), ("d", false)])
    );
}

// ========== Section 3: First-Write-Wins and Cycles ==========

#[test]
fn test_two_node_cycle_terminates() {
    let source = Arc::new(MockAdjacencySource::new());
    source.set_children("a", &[("b", true)]);
    source.set_children("b", &[("a", true)]);
    let resolver = ImplicationResolver::new(source);

    let closure = resolver.closure(&key("a"), true);
    assert_eq!(as_plain(&closure), expected(&[("b", true)]));
}

#[test]
fn test_self_loop_terminates() {
    let source = Arc::new(MockAdjacencySource::new());
    source.set_children("a", &[("a", true)]);
    let resolver = ImplicationResolver::new(source);

    assert!(resolver.closure(&key("a"), true).is_empty());
}

#[test]
fn test_first_path_to_a_node_wins() {
    // a -> b(false) -> d(true)  gives d = true XOR true = false
    // a -> c(true)  -> d(true)  would give d = true XOR false = true
    let source = Arc::new(MockAdjacencySource::new());
    source.set_children("a", &[("b", false), ("c", true)]);
    source.set_children("b", &[("d", true)]);
    source.set_children("c", &[("d", true)]);
    let resolver = ImplicationResolver::new(Arc::clone(&source));

    let closure = resolver.closure(&key("a"), true);
    assert_eq!(closure.get("d"), Some(&false));

    // Reversing the child order flips the winner.
    source.set_children("a", &[("c", true), ("b", false)]);
    let reversed = resolver.resolve(&key("a"), true);
    assert_eq!(reversed.get("d"), Some(&true));
}

#[test]
fn test_large_cycle_visits_each_node_once() {
    let source = Arc::new(MockAdjacencySource::new());
    for i in 0..50 {
        let next = format!("n{}", (i + 1) % 50);
        source.set_children(&format!("n{i}"), &[(next.as_str(), true)]);
    }
    let resolver = ImplicationResolver::new(Arc::clone(&source));

    let closure = resolver.closure(&key("n0"), true);
    assert_eq!(closure.len(), 49);
    assert_eq!(source.reads(), 50);
}

// ========== Section 4: Safety Features ==========

#[test]
fn test_visit_cap_returns_partial_closure() {
    let source = Arc::new(MockAdjacencySource::new());
    let children: Vec<String> = (0..100).map(|i| format!("child{i}")).collect();
    let refs: Vec<(&str, bool)> = children.iter().map(|c| (c.as_str(), true)).collect();
    source.set_children("root", &refs);
    let config = ResolverConfig::default().with_max_visited(10);
    let resolver = ImplicationResolver::with_config(source, config);

    let closure = resolver.closure(&key("root"), true);

    // Root occupies one slot of the cap.
    assert_eq!(closure.len(), 9);
    for i in 0..9 {
        assert_eq!(closure.get(format!("child{i}").as_str()), Some(&true));
    }
}

#[test]
fn test_long_chain_does_not_overflow_stack() {
    let source = Arc::new(MockAdjacencySource::new());
    let depth = 20_000;
    for i in 0..depth {
        let next = format!("p{}", i + 1);
        source.set_children(&format!("p{i}"), &[(next.as_str(), true)]);
    }
    let config = ResolverConfig::default().with_max_visited(depth + 10);
    let resolver = ImplicationResolver::with_config(source, config);

    let closure = resolver.closure(&key("p0"), true);
    assert_eq!(closure.len(), depth);
    assert_eq!(closure.get(format!("p{depth}").as_str()), Some(&true));
}

// ========== Section 5: Memoization ==========

#[test]
fn test_repeated_closure_is_served_from_cache() {
    let source = Arc::new(MockAdjacencySource::new());
    source.set_children("a", &[("b", true)]);
    let resolver = ImplicationResolver::new(Arc::clone(&source));

    let first = resolver.closure(&key("a"), true);
    let reads_after_first = source.reads();
    let second = resolver.closure(&key("a"), true);

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(source.reads(), reads_after_first);
}

#[test]
fn test_invalidate_recomputes_against_new_graph() {
    let source = Arc::new(MockAdjacencySource::new());
    source.set_children("a", &[("b", true)]);
    let resolver = ImplicationResolver::new(Arc::clone(&source));
    assert_eq!(as_plain(&resolver.closure(&key("a"), true)), expected(&[("b", true)]));

    source.set_children("a", &[("c", false)]);
    // Still cached until invalidated.
    assert_eq!(as_plain(&resolver.closure(&key("a"), true)), expected(&[("b", true)]));

    resolver.invalidate();
    assert_eq!(as_plain(&resolver.closure(&key("a"), true)), expected(&[("c", false)]));
    assert_eq!(resolver.cache().generation(), 1);
}

#[test]
fn test_closure_provider_delegates_to_cache() {
    let source = Arc::new(MockAdjacencySource::new());
    source.set_children("a", &[("b", true)]);
    let resolver = ImplicationResolver::new(source);
    let provider: &dyn ClosureProvider = &resolver;

    let via_trait = provider.closure(&key("a"), true);
    let direct = resolver.closure(&key("a"), true);
    assert!(Arc::ptr_eq(&via_trait, &direct));
}

#[test]
fn test_concurrent_closures_agree() {
    let source = Arc::new(MockAdjacencySource::new());
    source.set_children("a", &[("b", false)]);
    source.set_children("b", &[("c", true)]);
    let resolver = Arc::new(ImplicationResolver::new(source));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let resolver = Arc::clone(&resolver);
            std::thread::spawn(move || as_plain(&resolver.closure(&key("a"), true)))
        })
        .collect();

    for handle in handles {
        assert_eq!(
            handle.join().unwrap(),
            expected(&[("b", false), ("c", false)])
        );
    }
}
