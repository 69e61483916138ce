//! File storage port - the public disk behind avatars and featured images.

use async_trait::async_trait;

use crate::domain::UploadedFile;

/// Stores uploads under a directory and hands back a relative path.
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Store `file` under `directory` with a generated name and the given
    /// extension. Returns the path relative to the disk root, e.g. `posts/<id>.png`.
    async fn put(
        &self,
        directory: &str,
        file: &UploadedFile,
        extension: &str,
    ) -> Result<String, StorageError>;

    /// Remove a stored file. Missing files are not an error.
    async fn delete(&self, path: &str) -> Result<(), StorageError>;

    /// Public URL of a stored path.
    fn url(&self, path: &str) -> String;
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Invalid storage path: {0}")]
    InvalidPath(String),

    #[error("I/O error: {0}")]
    Io(String),
}
