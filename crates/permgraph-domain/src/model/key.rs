//! Normalized permission identifiers.

use std::borrow::{Borrow, Cow};
use std::fmt;
use std::str::FromStr;

use crate::error::{DomainError, DomainResult};

/// Separator between permission segments.
pub const SEGMENT_SEPARATOR: char = '.';

/// A lowercase, dot-delimited permission string (e.g., "essentials.home.set").
///
/// Identity is case-insensitive: the value is lowercased on construction, so
/// `"Foo.Bar"` and `"foo.bar"` are the same key. Segments are split on `.`
/// with empty segments discarded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PermissionKey(String);

impl PermissionKey {
    /// Creates a new key, rejecting input without any non-empty segment.
    pub fn new(value: &str) -> DomainResult<Self> {
        if value.trim().is_empty() || split_segments(value).next().is_none() {
            return Err(DomainError::InvalidPermission {
                value: value.to_string(),
            });
        }
        Ok(Self(value.to_lowercase()))
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterates over the non-empty segments of the key.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        split_segments(&self.0)
    }
}

/// Lowercases a raw permission for lookups, borrowing when already lowercase.
pub(crate) fn normalize(value: &str) -> Cow<'_, str> {
    if value.chars().any(char::is_uppercase) {
        Cow::Owned(value.to_lowercase())
    } else {
        Cow::Borrowed(value)
    }
}

/// Splits a raw permission path into its non-empty segments.
pub(crate) fn split_segments(value: &str) -> impl Iterator<Item = &str> {
    value.split(SEGMENT_SEPARATOR).filter(|s| !s.is_empty())
}

impl fmt::Display for PermissionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PermissionKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for PermissionKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl FromStr for PermissionKey {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<&str> for PermissionKey {
    type Error = DomainError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<String> for PermissionKey {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}
