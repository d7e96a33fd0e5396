use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use super::BlobStore;
use crate::error::{RegistryError, Result};

/// Blob store backed by a local directory served under a public URL prefix
pub struct LocalBlobStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if path.is_empty() || escapes {
            return Err(RegistryError::StorageUnavailable(format!(
                "refusing to store outside the blob root: {path:?}"
            )));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn upload(&self, path: &str, bytes: Vec<u8>) -> Result<String> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| RegistryError::StorageUnavailable(e.to_string()))?;
        }
        tokio::fs::write(&target, &bytes)
            .await
            .map_err(|e| RegistryError::StorageUnavailable(e.to_string()))?;

        debug!(path = %target.display(), size = bytes.len(), "Stored blob");
        Ok(format!("{}/{}", self.public_base_url, path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_upload_writes_file_and_returns_url() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        let store = LocalBlobStore::new(root, "https://files.example/");

        let url = store
            .upload("organizations/1/registration.docx", b"hello".to_vec())
            .await
            .unwrap();

        assert_eq!(url, "https://files.example/organizations/1/registration.docx");
        let written = tokio::fs::read(root.join("organizations/1/registration.docx"))
            .await
            .unwrap();
        assert_eq!(written, b"hello");
    }

    #[tokio::test]
    async fn test_upload_rejects_path_traversal() {
        let store = LocalBlobStore::new(std::env::temp_dir(), "https://files.example");
        let err = store.upload("../etc/passwd", Vec::new()).await.unwrap_err();
        assert!(matches!(err, RegistryError::StorageUnavailable(_)));
    }
}
