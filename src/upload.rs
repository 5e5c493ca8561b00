//! Upload sink boundary and a local-directory implementation.

use crate::error::AppError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// A file received with a request.
#[derive(Clone, Debug)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn is_image(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|t| t.to_ascii_lowercase().starts_with("image/"))
            .unwrap_or(false)
    }

    fn extension(&self) -> Option<&str> {
        Path::new(&self.file_name)
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| e.chars().all(|c| c.is_ascii_alphanumeric()))
    }
}

/// Stores uploaded files and returns the reference saved in the record.
#[async_trait]
pub trait UploadSink: Send + Sync {
    async fn store(&self, resource: &str, file: &UploadedFile) -> Result<String, AppError>;
}

/// Writes files to `{root}/{resource}/{uuid}.{ext}` and returns `{resource}/{uuid}.{ext}`.
#[derive(Clone, Debug)]
pub struct LocalUploadSink {
    root: PathBuf,
}

impl LocalUploadSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        LocalUploadSink { root: root.into() }
    }
}

#[async_trait]
impl UploadSink for LocalUploadSink {
    async fn store(&self, resource: &str, file: &UploadedFile) -> Result<String, AppError> {
        let dir = self.root.join(resource);
        tokio::fs::create_dir_all(&dir).await?;
        let stem = uuid::Uuid::new_v4().to_string();
        let name = match file.extension() {
            Some(ext) => format!("{}.{}", stem, ext),
            None => stem,
        };
        tokio::fs::write(dir.join(&name), &file.bytes).await?;
        tracing::debug!(resource, file = %file.file_name, stored = %name, bytes = file.bytes.len(), "upload stored");
        Ok(format!("{}/{}", resource, name))
    }
}
