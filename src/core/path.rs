//! Page path type - the crawl's deduplication key.

use std::borrow::Borrow;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Normalized absolute URL pathname.
///
/// Invariants:
/// - Always starts with `/`
/// - No `.`/`..` segments (resolved away during canonicalization)
/// - No query string or fragment
///
/// Two hrefs that canonicalize to the same `PagePath` name the same
/// page; equality is plain string equality, which makes this the
/// crawler's deduplication key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PagePath(Arc<str>);

impl PagePath {
    /// Wrap an already-normalized pathname.
    ///
    /// External callers go through
    /// [`canonicalize_href`](super::canonicalize_href), which upholds
    /// the invariants above.
    pub(crate) fn from_normalized(path: &str) -> Self {
        debug_assert!(path.starts_with('/'), "page path must be absolute: {path}");
        Self(Arc::from(path))
    }

    /// Get the pathname as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check if this path names a directory-style page (`/posts/`).
    #[inline]
    pub fn has_trailing_slash(&self) -> bool {
        self.0.ends_with('/')
    }

    /// Check if the path has the given file suffix (`.html` etc.).
    #[inline]
    pub fn has_suffix(&self, suffix: &str) -> bool {
        self.0.ends_with(suffix)
    }
}

impl std::fmt::Display for PagePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for PagePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for PagePath {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for PagePath {
    fn eq(&self, other: &str) -> bool {
        self.0.as_ref() == other
    }
}

impl PartialEq<&str> for PagePath {
    fn eq(&self, other: &&str) -> bool {
        self.0.as_ref() == *other
    }
}

impl Serialize for PagePath {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PagePath {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(super::canonicalize_href(&s, None).path)
    }
}
