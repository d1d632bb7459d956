//! Disk-backed content cache for intercepted resources.
//!
//! Each entry is a pair of files in a flat directory:
//!
//! - `<key>` holds the raw response body
//! - `<key>_mime` holds the media type as plain text
//!
//! There is no index. An entry exists only while both files exist. Entries are
//! never evicted or expired by this crate.

pub mod hash;
pub mod store;

pub use crate::Error;

pub use hash::CacheKey;
pub use store::{ContentStore, StoredEntry};
