//! URL-derived cache key generation.

use sha2::{Digest, Sha256};
use std::fmt;

/// Name under which a resource is stored on disk.
///
/// Derived from the URL string alone, byte for byte. Two URLs that differ only
/// in a fragment or in host casing map to different keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Compute the key for a resource URL.
    pub fn for_url(url: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(url.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
