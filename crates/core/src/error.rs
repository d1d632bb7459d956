//! Unified error types for offcache.

use std::path::PathBuf;

/// Unified error types for the offcache core.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Filesystem operation on the cache directory failed.
    #[error("CACHE_ERROR: {}: {source}", path.display())]
    CacheIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The media type marker of an entry is unreadable.
    #[error("CACHE_ERROR: corrupt media type marker at {}", path.display())]
    CorruptEntry { path: PathBuf },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::CacheIo { path: path.into(), source }
    }
}
