//! Application state.
//!
//! This module defines the shared application state that is passed to all
//! request handlers. The storage and cache backends are chosen via feature
//! flags; repositories are built per request on top of them.

use std::sync::Arc;
use std::time::Duration;

use shoplist_auth::{AuthService, TokenService};
use shoplist_core::cache::Cache;
use shoplist_core::entity::{Entity, Item, ItemCategory, ShoppingList, User};
use shoplist_core::integrations::{EmailSender, MessageQueue, SearchIndex};
use shoplist_core::service::{CategoryService, ItemService, ShoppingListService, UserService};
use shoplist_core::storage::{EntitySet, GenericRepository};

use crate::config::Config;
use crate::integrations::{
    ChannelQueue, FsBlobStore, InMemorySearchIndex, LogEmailSender, SmtpEmailSender,
};
use crate::storage::{CachedRepository, Store};

// ============================================================================
// Compile-time feature validation
// ============================================================================

// Storage features: exactly one must be enabled, they are mutually exclusive
#[cfg(all(feature = "sqlite", feature = "inmemory"))]
compile_error!("Cannot enable both 'sqlite' and 'inmemory' storage features");

#[cfg(not(any(feature = "inmemory", feature = "sqlite")))]
compile_error!("Must enable exactly one storage feature: 'inmemory' or 'sqlite'");

// Cache features: exactly one must be enabled, they are mutually exclusive
#[cfg(all(feature = "memory", feature = "redis"))]
compile_error!("Cannot enable both 'memory' and 'redis' cache features");

#[cfg(not(any(feature = "memory", feature = "redis")))]
compile_error!("Must enable exactly one cache feature: 'memory' or 'redis'");

/// Cached unit-of-work repository for one request.
pub type Repo<E> = CachedRepository<E, GenericRepository<E, Store>, dyn Cache>;

/// Shared application state.
///
/// Cloned for each request handler. Holds the shared store and cache plus the
/// integration collaborators.
#[derive(Clone)]
pub struct AppState {
    store: Arc<Store>,
    cache: Arc<dyn Cache>,
    cache_ttl: Duration,
    pub tokens: Arc<TokenService>,
    pub blobs: Arc<FsBlobStore>,
    pub queue: Arc<dyn MessageQueue>,
    pub search: Arc<dyn SearchIndex>,
}

impl AppState {
    /// Wires the collaborators shared by every backend combination and
    /// starts the email worker.
    fn build(store: Arc<Store>, cache: Arc<dyn Cache>, config: &Config) -> anyhow::Result<Self> {
        let sender: Arc<dyn EmailSender> = match &config.smtp {
            Some(smtp) => Arc::new(SmtpEmailSender::new(smtp, &config.email_from)?),
            None => {
                tracing::warn!("SMTP_HOST is not set, outgoing email will only be logged");
                Arc::new(LogEmailSender)
            }
        };
        // The worker stops once the last queue handle is dropped
        let (queue, _worker) = ChannelQueue::spawn(config.queue_capacity, sender);

        let blobs = FsBlobStore::new(
            config.blob_dir.clone(),
            config.blob_base_url.clone(),
            config.blob_url_ttl(),
            config.blob_signing_secret.clone(),
        );

        Ok(Self {
            store,
            cache,
            cache_ttl: config.cache_ttl(),
            tokens: Arc::new(TokenService::new(config.token.clone())),
            blobs: Arc::new(blobs),
            queue: Arc::new(queue),
            search: Arc::new(InMemorySearchIndex::new()),
        })
    }

    /// A fresh cached repository over the shared store.
    pub fn repository<E>(&self) -> Repo<E>
    where
        E: Entity,
        Store: EntitySet<E>,
    {
        CachedRepository::new(
            Arc::new(GenericRepository::new(self.store.clone())),
            self.cache.clone(),
            self.cache_ttl,
        )
    }

    pub fn items(&self) -> ItemService<Repo<Item>> {
        ItemService::new(self.repository())
    }

    pub fn categories(&self) -> CategoryService<Repo<ItemCategory>> {
        CategoryService::new(self.repository())
    }

    pub fn shopping_lists(&self) -> ShoppingListService<Repo<ShoppingList>> {
        ShoppingListService::new(self.repository())
    }

    pub fn users(&self) -> UserService<Repo<User>> {
        UserService::new(self.repository())
    }

    pub fn auth(&self) -> AuthService<Repo<User>> {
        AuthService::new(
            self.repository(),
            self.tokens.clone(),
            self.blobs.clone(),
            self.queue.clone(),
        )
    }
}

// ============================================================================
// Factory functions for different backend combinations
// ============================================================================

#[cfg(all(feature = "inmemory", feature = "memory"))]
mod inmemory_memory {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::storage::InMemoryStore;

    impl AppState {
        /// Creates AppState with in-memory storage and in-memory cache.
        pub async fn new(config: &Config) -> Result<Self, anyhow::Error> {
            let store = Arc::new(InMemoryStore::new());
            let cache = Arc::new(MemoryCache::new(config.cache_max_entries));
            Self::build(store, cache, config)
        }
    }
}

#[cfg(all(feature = "inmemory", feature = "redis"))]
mod inmemory_redis {
    use super::*;
    use crate::cache::RedisCache;
    use crate::storage::InMemoryStore;

    impl AppState {
        /// Creates AppState with in-memory storage and Redis cache.
        pub async fn new(config: &Config) -> Result<Self, anyhow::Error> {
            let store = Arc::new(InMemoryStore::new());
            let cache = Arc::new(RedisCache::new(&config.redis_url).await?);
            Self::build(store, cache, config)
        }
    }
}

#[cfg(all(feature = "sqlite", feature = "memory"))]
mod sqlite_memory {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::storage::SqliteStore;

    impl AppState {
        /// Creates AppState with SQLite storage and in-memory cache.
        pub async fn new(config: &Config) -> Result<Self, anyhow::Error> {
            let store = Arc::new(SqliteStore::new(&config.sqlite_path).await?);
            let cache = Arc::new(MemoryCache::new(config.cache_max_entries));
            Self::build(store, cache, config)
        }
    }
}

#[cfg(all(feature = "sqlite", feature = "redis"))]
mod sqlite_redis {
    use super::*;
    use crate::cache::RedisCache;
    use crate::storage::SqliteStore;

    impl AppState {
        /// Creates AppState with SQLite storage and Redis cache.
        pub async fn new(config: &Config) -> Result<Self, anyhow::Error> {
            let store = Arc::new(SqliteStore::new(&config.sqlite_path).await?);
            let cache = Arc::new(RedisCache::new(&config.redis_url).await?);
            Self::build(store, cache, config)
        }
    }
}
