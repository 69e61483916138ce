use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use uuid::Uuid;

use quill_core::domain::UploadedFile;
use quill_core::ports::{FileStorage, StorageError};

use super::{check_relative, public_url};

/// Files on the local filesystem under `root`, served at `{base_url}/storage/`.
pub struct LocalDiskStorage {
    root: PathBuf,
    base_url: String,
}

impl LocalDiskStorage {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into(),
        }
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }
}

#[async_trait]
impl FileStorage for LocalDiskStorage {
    async fn put(
        &self,
        directory: &str,
        file: &UploadedFile,
        extension: &str,
    ) -> Result<String, StorageError> {
        check_relative(directory)?;
        let relative = format!("{directory}/{}.{extension}", Uuid::new_v4());
        let target = self.root.join(&relative);

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::Io(e.to_string()))?;
        }
        tokio::fs::write(&target, &file.bytes)
            .await
            .map_err(|e| StorageError::Io(e.to_string()))?;

        tracing::debug!(path = %relative, bytes = file.bytes.len(), "Stored upload");
        Ok(relative)
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        check_relative(path)?;
        match tokio::fs::remove_file(self.root.join(path)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %path, "Stored file already gone");
                Ok(())
            }
            Err(e) => Err(StorageError::Io(e.to_string())),
        }
    }

    fn url(&self, path: &str) -> String {
        public_url(&self.base_url, path)
    }
}
