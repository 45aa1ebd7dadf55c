pub mod bucket;
pub mod parquet;

use crate::core::PipelineError;
use async_trait::async_trait;
use std::path::Path;

pub use bucket::BucketStorage;

/// Key-addressed blob store bound to one bucket.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Uploads the bytes of `local_path` to `remote_key`, replacing any object there.
    async fn upload(&self, local_path: &Path, remote_key: &str) -> Result<(), PipelineError>;

    async fn download(&self, remote_key: &str, local_path: &Path) -> Result<(), PipelineError>;
}
