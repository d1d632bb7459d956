//! Content store reads and writes.
//!
//! Writes go to temporary files first and are published with `rename`. The
//! media type marker is removed before the new body is published and renamed
//! into place last, so an interrupted write leaves either the previous pair or
//! a body with no marker, which reads as absent.
//!
//! Rename alone cannot publish two files at once, so readers and writers of
//! the same key also share a lock stripe for the duration of the pair access.
//!
//! Replacement is best-effort: the old marker is dropped only once both
//! temporary files are written, but if a rename then fails the previous entry
//! is lost and the key reads as a miss rather than as the stale pair.

use super::hash::CacheKey;
use crate::Error;
use bytes::Bytes;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

/// Suffix of the media type marker file.
pub const MEDIA_TYPE_SUFFIX: &str = "_mime";

const TEMP_SUFFIX: &str = ".tmp";

const LOCK_STRIPES: usize = 64;

/// A complete cache entry read back from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEntry {
    pub body: Bytes,
    pub media_type: String,
}

/// Flat-directory cache of response bodies and their media types.
#[derive(Debug)]
pub struct ContentStore {
    root: PathBuf,
    stripes: Box<[RwLock<()>]>,
}

impl ContentStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub async fn open(root: impl AsRef<Path>) -> Result<Self, Error> {
        let root = root.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|e| Error::io(&root, e))?;

        let stripes = (0..LOCK_STRIPES).map(|_| RwLock::new(())).collect();

        tracing::debug!(root = %root.display(), "opened content store");

        Ok(Self { root, stripes })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the body file for `key`.
    pub fn body_path(&self, key: &CacheKey) -> PathBuf {
        self.root.join(key.as_str())
    }

    /// Path of the media type marker for `key`.
    pub fn media_type_path(&self, key: &CacheKey) -> PathBuf {
        self.root.join(format!("{}{MEDIA_TYPE_SUFFIX}", key.as_str()))
    }

    fn stripe(&self, key: &CacheKey) -> &RwLock<()> {
        let slot = key
            .as_str()
            .bytes()
            .fold(0usize, |acc, b| acc.wrapping_mul(31).wrapping_add(b as usize));
        &self.stripes[slot % self.stripes.len()]
    }

    /// Look up an entry, treating any failure as a miss.
    ///
    /// Read errors are logged at `warn` and never surface to the caller.
    pub async fn get(&self, key: &CacheKey) -> Option<StoredEntry> {
        match self.try_get(key).await {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "cache read failed, treating as miss");
                None
            }
        }
    }

    /// Look up an entry, reporting I/O failures.
    ///
    /// Returns `Ok(None)` when either file of the pair is missing.
    pub async fn try_get(&self, key: &CacheKey) -> Result<Option<StoredEntry>, Error> {
        let body_path = self.body_path(key);
        let media_type_path = self.media_type_path(key);

        let _guard = self.stripe(key).read().await;

        let Some(raw_media_type) = read_optional(&media_type_path).await? else {
            return Ok(None);
        };
        let Some(body) = read_optional(&body_path).await? else {
            return Ok(None);
        };

        let media_type = String::from_utf8(raw_media_type)
            .map_err(|_| Error::CorruptEntry { path: media_type_path.clone() })?
            .trim()
            .to_string();
        if media_type.is_empty() {
            return Err(Error::CorruptEntry { path: media_type_path });
        }

        Ok(Some(StoredEntry { body: Bytes::from(body), media_type }))
    }

    /// Store `body` and `media_type` under `key`, replacing any previous entry.
    pub async fn put(&self, key: &CacheKey, body: &[u8], media_type: &str) -> Result<(), Error> {
        let body_path = self.body_path(key);
        let media_type_path = self.media_type_path(key);
        let body_tmp = temp_path(&body_path);
        let media_type_tmp = temp_path(&media_type_path);

        let _guard = self.stripe(key).write().await;

        let result = publish_pair(&body_path, &body_tmp, body, &media_type_path, &media_type_tmp, media_type).await;
        if result.is_err() {
            let _ = tokio::fs::remove_file(&body_tmp).await;
            let _ = tokio::fs::remove_file(&media_type_tmp).await;
        } else {
            tracing::debug!(key = %key, bytes = body.len(), media_type, "stored cache entry");
        }
        result
    }
}

async fn publish_pair(
    body_path: &Path, body_tmp: &Path, body: &[u8], media_type_path: &Path, media_type_tmp: &Path, media_type: &str,
) -> Result<(), Error> {
    tokio::fs::write(body_tmp, body)
        .await
        .map_err(|e| Error::io(body_tmp, e))?;
    tokio::fs::write(media_type_tmp, media_type.as_bytes())
        .await
        .map_err(|e| Error::io(media_type_tmp, e))?;

    match tokio::fs::remove_file(media_type_path).await {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(Error::io(media_type_path, e)),
    }

    tokio::fs::rename(body_tmp, body_path)
        .await
        .map_err(|e| Error::io(body_path, e))?;
    tokio::fs::rename(media_type_tmp, media_type_path)
        .await
        .map_err(|e| Error::io(media_type_path, e))?;

    Ok(())
}

async fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, Error> {
    match tokio::fs::read(path).await {
        Ok(data) => Ok(Some(data)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::io(path, e)),
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(TEMP_SUFFIX);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    async fn open_temp() -> (tempfile::TempDir, ContentStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ContentStore::open(dir.path()).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let (_dir, store) = open_temp().await;
        let key = CacheKey::for_url("https://example.com/logo.png");

        store.put(&key, b"\x89PNG\r\n", "image/png").await.unwrap();

        let entry = store.get(&key).await.unwrap();
        assert_eq!(entry.body.as_ref(), b"\x89PNG\r\n");
        assert_eq!(entry.media_type, "image/png");
    }

    #[tokio::test]
    async fn test_get_missing() {
        let (_dir, store) = open_temp().await;
        let key = CacheKey::for_url("https://example.com/never-seen");
        assert!(store.get(&key).await.is_none());
        assert!(store.try_get(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_overwrite_replaces_both_artifacts() {
        let (_dir, store) = open_temp().await;
        let key = CacheKey::for_url("https://example.com/data");

        store.put(&key, b"<p>first</p>", "text/html").await.unwrap();
        store.put(&key, b"{\"second\":true}", "application/json").await.unwrap();

        let entry = store.get(&key).await.unwrap();
        assert_eq!(entry.body.as_ref(), b"{\"second\":true}");
        assert_eq!(entry.media_type, "application/json");
    }

    #[tokio::test]
    async fn test_body_without_marker_is_absent() {
        let (_dir, store) = open_temp().await;
        let key = CacheKey::for_url("https://example.com/orphan.js");

        tokio::fs::write(store.body_path(&key), b"console.log(1)").await.unwrap();

        assert!(store.get(&key).await.is_none());
    }

    #[tokio::test]
    async fn test_marker_without_body_is_absent() {
        let (_dir, store) = open_temp().await;
        let key = CacheKey::for_url("https://example.com/orphan.css");

        tokio::fs::write(store.media_type_path(&key), b"text/css").await.unwrap();

        assert!(store.get(&key).await.is_none());
    }

    #[tokio::test]
    async fn test_corrupt_marker_is_absent() {
        let (_dir, store) = open_temp().await;
        let key = CacheKey::for_url("https://example.com/broken");

        tokio::fs::write(store.body_path(&key), b"payload").await.unwrap();
        tokio::fs::write(store.media_type_path(&key), [0xff, 0xfe, 0xfd]).await.unwrap();

        assert!(matches!(store.try_get(&key).await, Err(Error::CorruptEntry { .. })));
        assert!(store.get(&key).await.is_none());
    }

    #[tokio::test]
    async fn test_failed_publish_reads_as_absent() {
        let (_dir, store) = open_temp().await;
        let key = CacheKey::for_url("https://example.com/app.js");
        store.put(&key, b"old", "text/javascript").await.unwrap();

        let body_path = store.body_path(&key);
        std::fs::remove_file(&body_path).unwrap();
        std::fs::create_dir(&body_path).unwrap();
        std::fs::write(body_path.join("blocker"), b"x").unwrap();

        assert!(store.put(&key, b"new", "text/javascript").await.is_err());

        assert_eq!(store.try_get(&key).await.unwrap(), None);
        assert!(!temp_path(&body_path).exists());
        assert!(!temp_path(&store.media_type_path(&key)).exists());
    }

    #[tokio::test]
    async fn test_on_disk_layout() {
        let (dir, store) = open_temp().await;
        let key = CacheKey::for_url("https://example.com/font.woff2");

        store.put(&key, b"wOF2", "font/woff2").await.unwrap();

        let body = std::fs::read(dir.path().join(key.as_str())).unwrap();
        let marker = std::fs::read_to_string(dir.path().join(format!("{}_mime", key.as_str()))).unwrap();
        assert_eq!(body, b"wOF2");
        assert_eq!(marker, "font/woff2");

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(TEMP_SUFFIX))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_open_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let store = ContentStore::open(&nested).await.unwrap();
        assert!(nested.is_dir());
        assert_eq!(store.root(), nested.as_path());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writes_never_tear() {
        let (_dir, store) = open_temp().await;
        let store = Arc::new(store);
        let key = CacheKey::for_url("https://example.com/contended");
        store.put(&key, b"AAAA", "text/a").await.unwrap();

        let mut handles = Vec::new();
        for i in 0..8 {
            let store = Arc::clone(&store);
            let key = key.clone();
            handles.push(tokio::spawn(async move {
                for _ in 0..25 {
                    if i % 2 == 0 {
                        store.put(&key, b"AAAA", "text/a").await.unwrap();
                    } else {
                        store.put(&key, b"BBBBBBBB", "text/b").await.unwrap();
                    }
                }
            }));
        }
        for _ in 0..4 {
            let store = Arc::clone(&store);
            let key = key.clone();
            handles.push(tokio::spawn(async move {
                for _ in 0..50 {
                    let entry = store.get(&key).await.expect("entry must stay present");
                    match entry.media_type.as_str() {
                        "text/a" => assert_eq!(entry.body.as_ref(), b"AAAA"),
                        "text/b" => assert_eq!(entry.body.as_ref(), b"BBBBBBBB"),
                        other => panic!("unexpected media type {other}"),
                    }
                }
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }
    }
}
