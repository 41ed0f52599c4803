//! Implication graph resolution.
//!
//! The resolver computes the flattened, sign-corrected closure of every
//! permission a root implies, with cycle detection, a visit cap and
//! memoization that is invalidated wholesale on any graph mutation.

mod config;
mod context;
mod graph_resolver;
mod traits;

#[cfg(test)]
mod tests;

pub use config::ResolverConfig;
pub use graph_resolver::ImplicationResolver;
pub use traits::{AdjacencySource, ClosureProvider};
