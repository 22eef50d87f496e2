//! Blob storage backends.
//!
//! A blob store persists a named byte payload and hands back a public URL
//! of the form `{base_url}/{name}`. The same URL is later used to delete
//! the blob, so ownership of a URL is decided purely by that prefix.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::error::{MediaError, MediaResult};

/// Blob storage capability used by the media interceptor.
pub trait BlobStore: Send + Sync + 'static {
    /// Public URL prefix for blobs in this store, without a trailing slash.
    fn base_url(&self) -> &str;

    /// Persist `data` under `name` and return its public URL.
    fn store(&self, name: &str, data: &[u8], mime_type: &str) -> MediaResult<String>;

    /// Delete the blob behind `url`. Deleting an absent blob succeeds.
    fn delete(&self, url: &str) -> MediaResult<()>;

    /// Whether `url` points into this store.
    fn owns(&self, url: &str) -> bool {
        blob_name(self.base_url(), url).is_some()
    }
}

/// Blob name encoded in `url`, if `url` lives under `base_url`.
pub fn blob_name<'a>(base_url: &str, url: &'a str) -> Option<&'a str> {
    url.strip_prefix(base_url)?
        .strip_prefix('/')
        .filter(|name| !name.is_empty())
}

/// Blob names are flat file names.
fn check_name(name: &str) -> MediaResult<()> {
    let flat = !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0']);
    if flat {
        Ok(())
    } else {
        Err(MediaError::InvalidName(name.to_string()))
    }
}

fn normalize_base_url(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}

// ── Filesystem ─────────────────────────────────────────────────────

/// Stores blobs as files in a single directory; an external web server
/// serves that directory under `base_url`.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
    base_url: String,
}

impl FsBlobStore {
    /// Open the store, creating `root` if needed.
    pub fn new(root: &Path, base_url: &str) -> MediaResult<Self> {
        std::fs::create_dir_all(root).map_err(|source| MediaError::Io {
            path: root.to_path_buf(),
            source,
        })?;
        debug!(?root, %base_url, "filesystem blob store opened");
        Ok(Self {
            root: root.to_path_buf(),
            base_url: normalize_base_url(base_url),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl BlobStore for FsBlobStore {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn store(&self, name: &str, data: &[u8], mime_type: &str) -> MediaResult<String> {
        check_name(name)?;
        let path = self.root.join(name);
        std::fs::write(&path, data).map_err(|source| MediaError::Io {
            path: path.clone(),
            source,
        })?;
        debug!(?path, %mime_type, bytes = data.len(), "blob stored");
        Ok(format!("{}/{name}", self.base_url))
    }

    fn delete(&self, url: &str) -> MediaResult<()> {
        let name = blob_name(&self.base_url, url)
            .ok_or_else(|| MediaError::ForeignUrl(url.to_string()))?;
        check_name(name)?;
        let path = self.root.join(name);
        match std::fs::remove_file(&path) {
            Ok(()) => {
                debug!(?path, "blob deleted");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(MediaError::Io { path, source }),
        }
    }
}

// ── In-memory ──────────────────────────────────────────────────────

/// A stored blob in [`MemoryBlobStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// Process-local blob store, used for tests and `--in-memory` serving.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    base_url: String,
    blobs: Mutex<BTreeMap<String, StoredBlob>>,
}

impl MemoryBlobStore {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: normalize_base_url(base_url),
            blobs: Mutex::new(BTreeMap::new()),
        }
    }

    fn blobs(&self) -> MutexGuard<'_, BTreeMap<String, StoredBlob>> {
        self.blobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The blob behind `url`, if stored.
    pub fn get(&self, url: &str) -> Option<StoredBlob> {
        let name = blob_name(&self.base_url, url)?;
        self.blobs().get(name).cloned()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.get(url).is_some()
    }

    pub fn len(&self) -> usize {
        self.blobs().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs().is_empty()
    }
}

impl BlobStore for MemoryBlobStore {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn store(&self, name: &str, data: &[u8], mime_type: &str) -> MediaResult<String> {
        check_name(name)?;
        self.blobs().insert(
            name.to_string(),
            StoredBlob {
                mime_type: mime_type.to_string(),
                data: data.to_vec(),
            },
        );
        Ok(format!("{}/{name}", self.base_url))
    }

    fn delete(&self, url: &str) -> MediaResult<()> {
        let name = blob_name(&self.base_url, url)
            .ok_or_else(|| MediaError::ForeignUrl(url.to_string()))?;
        self.blobs().remove(name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blob_name_requires_separator_after_base() {
        let base = "https://cdn.example.com/media";
        assert_eq!(blob_name(base, "https://cdn.example.com/media/a.png"), Some("a.png"));
        assert_eq!(blob_name(base, "https://cdn.example.com/media-old/a.png"), None);
        assert_eq!(blob_name(base, "https://cdn.example.com/media/"), None);
        assert_eq!(blob_name(base, "a.png"), None);
    }

    #[test]
    fn memory_store_round_trip() {
        let store = MemoryBlobStore::new("http://localhost/media/");
        let url = store.store("a.png", b"png", "image/png").unwrap();
        assert_eq!(url, "http://localhost/media/a.png");
        assert!(store.owns(&url));
        assert_eq!(store.get(&url).unwrap().mime_type, "image/png");

        store.delete(&url).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn foreign_urls_are_not_deleted() {
        let store = MemoryBlobStore::new("http://localhost/media");
        assert!(!store.owns("https://elsewhere.test/a.png"));
        assert!(matches!(
            store.delete("https://elsewhere.test/a.png"),
            Err(MediaError::ForeignUrl(_))
        ));
    }

    #[test]
    fn names_with_separators_are_rejected() {
        let store = MemoryBlobStore::new("http://localhost/media");
        assert!(store.store("../etc/passwd", b"x", "image/png").is_err());
        assert!(store.store("", b"x", "image/png").is_err());
        assert!(store.store("..", b"x", "image/png").is_err());
    }

    #[test]
    fn fs_store_writes_and_deletes_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("media");
        let store = FsBlobStore::new(&root, "https://cdn.example.com").unwrap();

        let url = store.store("cover.png", b"\x89PNG", "image/png").unwrap();
        assert_eq!(url, "https://cdn.example.com/cover.png");
        assert_eq!(std::fs::read(root.join("cover.png")).unwrap(), b"\x89PNG");

        store.delete(&url).unwrap();
        assert!(!root.join("cover.png").exists());
        // A second delete of the same URL is a no-op.
        store.delete(&url).unwrap();
    }

    #[test]
    fn fs_store_refuses_traversal_through_urls() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path(), "https://cdn.example.com").unwrap();
        assert!(matches!(
            store.delete("https://cdn.example.com/../secret"),
            Err(MediaError::InvalidName(_))
        ));
    }
}
