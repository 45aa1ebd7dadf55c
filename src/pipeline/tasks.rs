//! The four daily tasks. Each takes the previous task's output and returns
//! the next task's input.

use crate::core::{PipelineError, RateProvider, RateRecord};
use crate::store::{ObjectStorage, parquet};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Fetches and validates the rates for `date`.
pub async fn fetch_exchange_rates(
    provider: &dyn RateProvider,
    date: NaiveDate,
) -> Result<RateRecord, PipelineError> {
    let record = provider.historical(date).await?;
    if record.date != date {
        debug!(requested = %date, published = %record.date, "Provider dated rates differently");
    }
    Ok(record)
}

/// Materializes the record as `{data_root}/{base}/{date}.parquet`.
pub fn process_data(data_root: &Path, record: &RateRecord) -> Result<PathBuf, PipelineError> {
    parquet::write_rates(data_root, record)
}

/// A local file and the object key it was uploaded to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    pub path: PathBuf,
    pub key: String,
}

/// Uploads the local file under its path relative to `data_root` and hands
/// the same local path on for cleanup.
pub async fn store_data(
    storage: &dyn ObjectStorage,
    data_root: &Path,
    local_path: PathBuf,
) -> Result<Published, PipelineError> {
    let key = parquet::remote_key(data_root, &local_path)?;
    storage.upload(&local_path, &key).await?;
    Ok(Published {
        path: local_path,
        key,
    })
}

/// Removes the local temporary file. Missing files are not an error.
pub fn cleanup_temporary_storage(local_path: &Path) -> Result<(), PipelineError> {
    if local_path.exists() {
        std::fs::remove_file(local_path).map_err(|source| PipelineError::Filesystem {
            path: local_path.to_path_buf(),
            source,
        })?;
        debug!(path = %local_path.display(), "Removed temporary file");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::BucketStorage;
    use object_store::ObjectStore;
    use tempfile::TempDir;

    #[test]
    fn test_cleanup_missing_path_is_noop() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("USD").join("2024-07-01.parquet");
        assert!(cleanup_temporary_storage(&path).is_ok());
    }

    #[test]
    fn test_cleanup_removes_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("2024-07-01.parquet");
        std::fs::write(&path, b"x").unwrap();

        cleanup_temporary_storage(&path).unwrap();
        assert!(!path.exists());

        // A second cleanup of the same path stays quiet
        cleanup_temporary_storage(&path).unwrap();
    }

    #[tokio::test]
    async fn test_store_data_passes_path_through() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("USD")).unwrap();
        let local = dir.path().join("USD").join("2024-07-01.parquet");
        std::fs::write(&local, b"rates").unwrap();
        let storage = BucketStorage::in_memory();

        let returned = store_data(&storage, dir.path(), local.clone())
            .await
            .unwrap();

        assert_eq!(returned.path, local);
        assert_eq!(returned.key, "USD/2024-07-01.parquet");
        assert!(local.exists());
        let object = storage
            .store()
            .get(&object_store::path::Path::from("USD/2024-07-01.parquet"))
            .await
            .unwrap()
            .bytes()
            .await
            .unwrap();
        assert_eq!(&object[..], b"rates");
    }

    #[tokio::test]
    async fn test_store_data_rejects_path_outside_root() {
        let root = TempDir::new().unwrap();
        let other = TempDir::new().unwrap();
        let local = other.path().join("2024-07-01.parquet");
        std::fs::write(&local, b"rates").unwrap();

        let err = store_data(&BucketStorage::in_memory(), root.path(), local)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Precondition { .. }));
    }
}
