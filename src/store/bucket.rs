use super::ObjectStorage;
use crate::core::PipelineError;
use crate::core::config::StorageConfig;
use anyhow::Context;
use async_trait::async_trait;
use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, PutPayload};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Object storage bound to a single bucket.
pub struct BucketStorage {
    store: Arc<dyn ObjectStore>,
    bucket: String,
}

impl BucketStorage {
    pub fn new(store: Arc<dyn ObjectStore>, bucket: &str) -> Self {
        BucketStorage {
            store,
            bucket: bucket.to_string(),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemory::new()), "memory")
    }

    pub fn from_config(config: &StorageConfig) -> anyhow::Result<Self> {
        match config {
            StorageConfig::Gcs {
                project_id,
                credentials,
                bucket,
            } => {
                debug!(?project_id, bucket = %bucket, "Connecting to Google Cloud Storage");
                let store = GoogleCloudStorageBuilder::new()
                    .with_service_account_path(credentials)
                    .with_bucket_name(bucket)
                    .build()
                    .with_context(|| format!("Failed to create GCS client for bucket {bucket}"))?;
                Ok(Self::new(Arc::new(store), bucket))
            }
            StorageConfig::Local { root } => {
                std::fs::create_dir_all(root)
                    .with_context(|| format!("Failed to create storage root: {root}"))?;
                let store = LocalFileSystem::new_with_prefix(root)
                    .with_context(|| format!("Failed to open storage root: {root}"))?;
                Ok(Self::new(Arc::new(store), root))
            }
            StorageConfig::Memory => Ok(Self::in_memory()),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }
}

#[async_trait]
impl ObjectStorage for BucketStorage {
    async fn upload(&self, local_path: &Path, remote_key: &str) -> Result<(), PipelineError> {
        let bytes = tokio::fs::read(local_path)
            .await
            .map_err(|source| PipelineError::Filesystem {
                path: local_path.to_path_buf(),
                source,
            })?;
        let size = bytes.len();

        self.store
            .put(&ObjectPath::from(remote_key), PutPayload::from(bytes))
            .await
            .map_err(|source| PipelineError::Transport {
                key: remote_key.to_string(),
                source,
            })?;

        info!(bucket = %self.bucket, key = remote_key, size, "Uploaded object");
        Ok(())
    }

    async fn download(&self, remote_key: &str, local_path: &Path) -> Result<(), PipelineError> {
        let transport = |source| PipelineError::Transport {
            key: remote_key.to_string(),
            source,
        };
        let bytes = self
            .store
            .get(&ObjectPath::from(remote_key))
            .await
            .map_err(transport)?
            .bytes()
            .await
            .map_err(transport)?;

        tokio::fs::write(local_path, &bytes)
            .await
            .map_err(|source| PipelineError::Filesystem {
                path: local_path.to_path_buf(),
                source,
            })?;

        debug!(key = remote_key, path = %local_path.display(), "Downloaded object");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_upload_then_download() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("source.parquet");
        std::fs::write(&source, b"PAR1 payload").unwrap();

        let storage = BucketStorage::in_memory();
        storage
            .upload(&source, "USD/2024-07-01.parquet")
            .await
            .unwrap();

        let target = dir.path().join("copy.parquet");
        storage
            .download("USD/2024-07-01.parquet", &target)
            .await
            .unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"PAR1 payload");
    }

    #[tokio::test]
    async fn test_upload_missing_file() {
        let dir = TempDir::new().unwrap();
        let storage = BucketStorage::in_memory();

        let err = storage
            .upload(&dir.path().join("missing.parquet"), "USD/missing.parquet")
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Filesystem { .. }));
    }

    #[tokio::test]
    async fn test_download_missing_key() {
        let dir = TempDir::new().unwrap();
        let storage = BucketStorage::in_memory();

        let err = storage
            .download("USD/1999-01-01.parquet", &dir.path().join("out.parquet"))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Transport { ref key, .. } if key == "USD/1999-01-01.parquet"));
    }

    #[tokio::test]
    async fn test_local_storage_mirrors_keys_as_paths() {
        let dir = TempDir::new().unwrap();
        let bucket_root = dir.path().join("bucket");
        let config = StorageConfig::Local {
            root: bucket_root.to_string_lossy().into_owned(),
        };
        let storage = BucketStorage::from_config(&config).unwrap();

        let source = dir.path().join("rates.parquet");
        std::fs::write(&source, b"rates").unwrap();
        storage
            .upload(&source, "USD/2024-07-01.parquet")
            .await
            .unwrap();

        assert_eq!(
            std::fs::read(bucket_root.join("USD").join("2024-07-01.parquet")).unwrap(),
            b"rates"
        );
    }
}
