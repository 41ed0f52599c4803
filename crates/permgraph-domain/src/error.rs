//! Domain error types for permission graph operations.

use thiserror::Error;

/// Domain-specific errors for permission graph operations.
///
/// None of these are produced on the lookup path: closures and default
/// lookups are infallible and degrade to "no implied data" instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Permission string was empty or contained only separators/whitespace.
    #[error("invalid permission: {value:?}")]
    InvalidPermission { value: String },

    /// A tree view was rendered without any captured data.
    #[error("no permission tree data under '{root}'")]
    EmptyTreeView { root: String },
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
