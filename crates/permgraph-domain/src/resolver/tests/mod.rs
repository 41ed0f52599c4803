//! Tests for the resolver module.
//!
//! Organized by functionality:
//! - Direct and transitive implication
//! - Sign inversion
//! - First-write-wins and cycles
//! - Safety features (visit cap, deep chains)
//! - Memoization and invalidation


#[cfg(test)]
mod resolver_tests;
