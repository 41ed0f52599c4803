//! Permission model types.
//!
//! This module contains:
//! - Normalized permission keys
//! - Permission definitions with observable children
//! - Tristate lookup results

mod key;
#[cfg(test)]
mod key_proptest;
mod types;

pub(crate) use key::{normalize, split_segments};
pub use key::{PermissionKey, SEGMENT_SEPARATOR};
pub use types::*;
