use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur when talking to blob storage.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BlobError {
    #[error("Invalid blob name: {0}")]
    InvalidName(String),
    #[error("Blob storage I/O failed: {0}")]
    Io(String),
}

pub type Result<T> = std::result::Result<T, BlobError>;

/// Object storage for user avatars.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stores `content` as `{base_name}{extension of file_name}` and returns
    /// the blob name. When `previous` is given, that blob is removed first.
    async fn upload_blob(
        &self,
        content: &[u8],
        file_name: &str,
        base_name: &str,
        previous: Option<&str>,
    ) -> Result<String>;

    /// Short-lived signed URL for reading the blob, `None` if it does not exist.
    async fn get_blob_url(&self, blob_name: &str) -> Result<Option<String>>;

    /// Removes the blob. Missing blobs are not an error.
    async fn remove_blob(&self, blob_name: &str) -> Result<()>;
}

/// Computes the stored blob name: `base_name` plus the extension of the
/// uploaded file (including the dot), if any.
///
/// ```
/// use shoplist_core::integrations::blob_name;
///
/// assert_eq!(blob_name("avatar.PNG", "42"), "42.PNG");
/// assert_eq!(blob_name("avatar", "42"), "42");
/// ```
pub fn blob_name(file_name: &str, base_name: &str) -> String {
    match Path::new(file_name).extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{base_name}.{ext}"),
        None => base_name.to_string(),
    }
}
