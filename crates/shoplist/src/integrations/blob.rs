//! Filesystem blob store with HMAC-signed, expiring read links.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use url::Url;

use shoplist_core::integrations::{blob_name, BlobError, BlobStore};

type HmacSha256 = Hmac<Sha256>;

/// Stores avatars as files under one directory.
pub struct FsBlobStore {
    dir: PathBuf,
    base_url: Url,
    url_ttl: Duration,
    secret: SecretString,
}

impl FsBlobStore {
    /// `base_url` must end with `/` so blob names resolve beneath it.
    pub fn new(dir: PathBuf, base_url: Url, url_ttl: Duration, secret: SecretString) -> Self {
        Self {
            dir,
            base_url,
            url_ttl,
            secret,
        }
    }

    fn path_for(&self, name: &str) -> Result<PathBuf, BlobError> {
        check_name(name)?;
        Ok(self.dir.join(name))
    }

    fn sign(&self, name: &str, expires: i64) -> Result<HmacSha256, BlobError> {
        let mut mac = HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|e| BlobError::Io(e.to_string()))?;
        mac.update(format!("{name}:{expires}").as_bytes());
        Ok(mac)
    }

    /// Signed link to `name` valid until `expires` (unix seconds).
    fn signed_url(&self, name: &str, expires: i64) -> Result<String, BlobError> {
        let signature = hex::encode(self.sign(name, expires)?.finalize().into_bytes());
        let mut url = self
            .base_url
            .join(name)
            .map_err(|_| BlobError::InvalidName(name.to_string()))?;
        url.query_pairs_mut()
            .append_pair("expires", &expires.to_string())
            .append_pair("sig", &signature);
        Ok(url.into())
    }

    /// Checks a link produced by `get_blob_url`. The comparison runs in
    /// constant time.
    pub fn verify(&self, name: &str, expires: i64, signature: &str, now: i64) -> bool {
        if expires < now {
            return false;
        }
        let Ok(expected) = hex::decode(signature) else {
            return false;
        };
        match self.sign(name, expires) {
            Ok(mac) => mac.verify_slice(&expected).is_ok(),
            Err(_) => false,
        }
    }

    /// Blob contents, `None` if it does not exist.
    pub async fn read(&self, name: &str) -> Result<Option<Vec<u8>>, BlobError> {
        match tokio::fs::read(self.path_for(name)?).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(BlobError::Io(e.to_string())),
        }
    }
}

/// Rejects names that could escape the blob directory.
fn check_name(name: &str) -> Result<(), BlobError> {
    if name.is_empty()
        || name.starts_with('.')
        || name.contains(['/', '\\'])
        || name.contains("..")
    {
        return Err(BlobError::InvalidName(name.to_string()));
    }
    Ok(())
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn upload_blob(
        &self,
        content: &[u8],
        file_name: &str,
        base_name: &str,
        previous: Option<&str>,
    ) -> Result<String, BlobError> {
        if let Some(previous) = previous {
            self.remove_blob(previous).await?;
        }

        let name = blob_name(file_name, base_name);
        let path = self.path_for(&name)?;
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| BlobError::Io(e.to_string()))?;
        tokio::fs::write(&path, content)
            .await
            .map_err(|e| BlobError::Io(e.to_string()))?;

        tracing::debug!(blob = %name, bytes = content.len(), "Blob uploaded");
        Ok(name)
    }

    async fn get_blob_url(&self, blob_name: &str) -> Result<Option<String>, BlobError> {
        let exists = tokio::fs::try_exists(self.path_for(blob_name)?)
            .await
            .map_err(|e| BlobError::Io(e.to_string()))?;
        if !exists {
            return Ok(None);
        }

        let ttl = i64::try_from(self.url_ttl.as_secs()).unwrap_or(i64::MAX);
        let expires = Utc::now().timestamp().saturating_add(ttl);
        self.signed_url(blob_name, expires).map(Some)
    }

    async fn remove_blob(&self, blob_name: &str) -> Result<(), BlobError> {
        match tokio::fs::remove_file(self.path_for(blob_name)?).await {
            Ok(()) => {
                tracing::debug!(blob = %blob_name, "Blob removed");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(BlobError::Io(e.to_string())),
        }
    }
}
