use std::time::Duration;

use async_trait::async_trait;

use super::Result;

/// Byte store behind the cached repositories.
///
/// Keys come from [`entity_key`](super::entity_key) and
/// [`page_key`](super::page_key); values are JSON from
/// [`serialize`](super::serialize). Implementations need not be durable.
#[async_trait]
pub trait Cache: Send + Sync {
    /// `None` when the key is absent or has expired.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Overwrites any previous value. Without a `ttl` the entry lives until
    /// deleted or evicted.
    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<()>;

    /// Deleting a missing key succeeds.
    async fn delete(&self, key: &str) -> Result<()>;
}
