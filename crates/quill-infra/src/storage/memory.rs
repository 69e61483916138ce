use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use quill_core::domain::UploadedFile;
use quill_core::ports::{FileStorage, StorageError};

use super::{check_relative, public_url};

/// Storage kept in a map; used by tests and when no disk is configured.
pub struct InMemoryStorage {
    files: RwLock<HashMap<String, Vec<u8>>>,
    base_url: String,
}

impl InMemoryStorage {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            files: RwLock::new(HashMap::new()),
            base_url: base_url.into(),
        }
    }

    pub async fn contains(&self, path: &str) -> bool {
        self.files.read().await.contains_key(path)
    }

    pub async fn len(&self) -> usize {
        self.files.read().await.len()
    }
}

#[async_trait]
impl FileStorage for InMemoryStorage {
    async fn put(
        &self,
        directory: &str,
        file: &UploadedFile,
        extension: &str,
    ) -> Result<String, StorageError> {
        check_relative(directory)?;
        let path = format!("{directory}/{}.{extension}", Uuid::new_v4());
        self.files
            .write()
            .await
            .insert(path.clone(), file.bytes.clone());
        Ok(path)
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        check_relative(path)?;
        self.files.write().await.remove(path);
        Ok(())
    }

    fn url(&self, path: &str) -> String {
        public_url(&self.base_url, path)
    }
}
