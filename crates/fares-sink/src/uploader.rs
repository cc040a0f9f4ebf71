use crate::error::{Result, SinkError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Destination storage for finished artifacts.
#[async_trait]
pub trait Uploader: Send + Sync {
    /// Copy the file at `local_path` to `destination_key`, replacing whatever
    /// is stored there, and return the URI of the stored object.
    async fn upload(&self, local_path: &Path, destination_key: &str) -> Result<String>;
}

/// Stores artifacts under a root directory on the local filesystem.
pub struct LocalDirUploader {
    root: PathBuf,
}

impl LocalDirUploader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn full_path(&self, key: &str) -> PathBuf {
        key.split('/')
            .filter(|part| !part.is_empty())
            .fold(self.root.clone(), |path, part| path.join(part))
    }
}

#[async_trait]
impl Uploader for LocalDirUploader {
    async fn upload(&self, local_path: &Path, destination_key: &str) -> Result<String> {
        let upload_error = |reason: String| SinkError::Upload {
            path: local_path.to_path_buf(),
            key: destination_key.to_string(),
            reason,
        };

        if destination_key.split('/').any(|part| part == "..") {
            return Err(upload_error("key escapes the destination root".to_string()));
        }

        let target = self.full_path(destination_key);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| upload_error(e.to_string()))?;
        }
        fs::copy(local_path, &target)
            .await
            .map_err(|e| upload_error(e.to_string()))?;

        let absolute = fs::canonicalize(&target).await.unwrap_or(target);
        Ok(format!("file://{}", absolute.display()))
    }
}
