use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::service::ItemResponse;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SearchError {
    #[error("Invalid index name: {0}")]
    InvalidIndexName(String),
    #[error("Search backend failed: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, SearchError>;

/// Full-text index over item responses.
///
/// Document operations target the default index, which is created on first
/// write.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    async fn create_index_if_not_exists(&self, index_name: &str) -> Result<()>;

    async fn delete_index_if_exists(&self, index_name: &str) -> Result<()>;

    async fn add_or_update(&self, item: &ItemResponse) -> Result<()>;

    async fn add_or_update_bulk(&self, items: &[ItemResponse]) -> Result<()>;

    async fn get(&self, id: Uuid) -> Result<Option<ItemResponse>>;

    /// Returns whether a document was removed.
    async fn remove(&self, id: Uuid) -> Result<bool>;

    /// Returns the number of removed documents.
    async fn remove_all(&self) -> Result<u64>;

    /// Items whose name, notes or category name match a query term, best
    /// matches first. A query with no terms finds nothing.
    async fn search(&self, query: &str, skip: usize, limit: usize) -> Result<Vec<ItemResponse>>;
}
