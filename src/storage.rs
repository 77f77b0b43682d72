//! Object storage for harvested document content.
//!
//! Keys are relative paths under a configurable root prefix. The relational
//! store holds only metadata; bytes live here.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors from object storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid object key: {0}")]
    InvalidKey(String),
    #[error("object not found: {0}")]
    NotFound(String),
    #[error("storage I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Key-addressed blob store.
pub trait ObjectStore: Send + Sync {
    /// Write bytes at a key, creating parents as needed.
    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError>;
    /// Read the bytes stored at a key.
    fn get(&self, key: &str) -> Result<Vec<u8>, StorageError>;
    /// Whether an object exists at the key.
    fn contains(&self, key: &str) -> bool;
}

/// Filesystem-backed object store rooted at a directory prefix.
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, StorageError> {
        if key.is_empty()
            || key.starts_with('/')
            || key.split('/').any(|part| part.is_empty() || part == "..")
        {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(key))
    }
}

impl ObjectStore for FsObjectStore {
    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, bytes)?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.resolve(key)?;
        if !path.exists() {
            return Err(StorageError::NotFound(key.to_string()));
        }
        Ok(std::fs::read(&path)?)
    }

    fn contains(&self, key: &str) -> bool {
        self.resolve(key).map(|p| p.exists()).unwrap_or(false)
    }
}

/// Map a URL's path extension to a storage extension.
///
/// Falls back to `bin` when the URL carries no recognizable extension.
pub fn extension_for_url(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let name = path.rsplit('/').next().unwrap_or(path);
    match name.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() && ext.len() <= 5 && ext.chars().all(char::is_alphanumeric) => ext,
        _ => "bin",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_put_get_round_trip() {
        let dir = tempdir().unwrap();
        let store = FsObjectStore::new(dir.path());
        store.put("lib/ab/one.pdf", b"content").unwrap();
        assert!(store.contains("lib/ab/one.pdf"));
        assert_eq!(store.get("lib/ab/one.pdf").unwrap(), b"content");
    }

    #[test]
    fn test_get_missing_key() {
        let dir = tempdir().unwrap();
        let store = FsObjectStore::new(dir.path());
        assert!(matches!(
            store.get("lib/missing.pdf"),
            Err(StorageError::NotFound(_))
        ));
        assert!(!store.contains("lib/missing.pdf"));
    }

    #[test]
    fn test_rejects_traversal_keys() {
        let dir = tempdir().unwrap();
        let store = FsObjectStore::new(dir.path());
        assert!(matches!(
            store.put("../escape.pdf", b"x"),
            Err(StorageError::InvalidKey(_))
        ));
        assert!(matches!(
            store.put("/absolute.pdf", b"x"),
            Err(StorageError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_extension_for_url() {
        assert_eq!(extension_for_url("https://x.org/a/b/paper.pdf"), "pdf");
        assert_eq!(extension_for_url("https://x.org/a/b/paper.pdf?dl=1"), "pdf");
        assert_eq!(extension_for_url("https://x.org/a/b/paper"), "bin");
        assert_eq!(extension_for_url("https://x.org/"), "bin");
    }
}
