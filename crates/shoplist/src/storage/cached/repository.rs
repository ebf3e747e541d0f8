use std::collections::HashSet;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use shoplist_core::cache::{deserialize, entity_key, page_key, serialize, Cache};
use shoplist_core::entity::{Entity, Filter, Includes, Mutation};
use shoplist_core::storage::{Repository, Result};

/// Cached repository decorator.
///
/// By-id reads and default-include pages are served from the cache. Entries
/// written through by `post`, `update` and `delete` are tracked until the
/// next `save_changes`: a successful commit re-reads them from the inner
/// repository, a failed one evicts them.
///
/// The cache fails open. Errors are logged and treated as misses.
///
/// # Type Parameters
///
/// * `E` - The entity type
/// * `R` - The underlying repository implementation
/// * `C` - The cache implementation (may be `dyn Cache`)
pub struct CachedRepository<E, R, C>
where
    E: Entity,
    R: Repository<E>,
    C: Cache + ?Sized,
{
    repository: Arc<R>,
    cache: Arc<C>,
    ttl: Duration,
    written: Mutex<HashSet<Uuid>>,
    _entity: PhantomData<fn() -> E>,
}

impl<E, R, C> CachedRepository<E, R, C>
where
    E: Entity,
    R: Repository<E>,
    C: Cache + ?Sized,
{
    /// Creates a new cached repository.
    ///
    /// # Arguments
    ///
    /// * `repository` - The underlying repository to cache
    /// * `cache` - The cache implementation
    /// * `ttl` - Time-to-live for every cached entry
    pub fn new(repository: Arc<R>, cache: Arc<C>, ttl: Duration) -> Self {
        Self {
            repository,
            cache,
            ttl,
            written: Mutex::new(HashSet::new()),
            _entity: PhantomData,
        }
    }

    async fn cache_entity(&self, entity: &E) {
        let key = entity_key(E::KIND, entity.id());
        match serialize(entity) {
            Ok(bytes) => {
                if let Err(err) = self.cache.set(&key, &bytes, Some(self.ttl)).await {
                    tracing::warn!(entity = E::KIND, id = %entity.id(), error = %err, "Failed to cache entity");
                }
            }
            Err(err) => {
                tracing::warn!(entity = E::KIND, id = %entity.id(), error = %err, "Entity serialization failed");
            }
        }
    }

    async fn evict(&self, id: Uuid) {
        let key = entity_key(E::KIND, id);
        if let Err(err) = self.cache.delete(&key).await {
            tracing::warn!(entity = E::KIND, id = %id, error = %err, "Failed to invalidate entity cache");
        }
    }

    /// Re-reads a committed entity so the cache holds exactly what the store
    /// returns, loaded relations included.
    async fn refresh(&self, id: Uuid) {
        match self.repository.get_by_id(id).await {
            Ok(Some(entity)) => self.cache_entity(&entity).await,
            Ok(None) => self.evict(id).await,
            Err(err) => {
                tracing::warn!(entity = E::KIND, id = %id, error = %err, "Failed to refresh cached entity");
                self.evict(id).await;
            }
        }
    }

    async fn track(&self, id: Uuid) {
        self.written.lock().await.insert(id);
    }

    async fn cached<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.cache.get(key).await {
            Ok(Some(bytes)) => match deserialize(&bytes) {
                Ok(value) => return Some(value),
                // Undecodable entry - treat as cache miss
                Err(err) => {
                    tracing::warn!(entity = E::KIND, key = %key, error = %err, "Cache deserialization failed");
                }
            },
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(entity = E::KIND, key = %key, error = %err, "Cache read failed");
            }
        }
        None
    }
}

#[async_trait]
impl<E, R, C> Repository<E> for CachedRepository<E, R, C>
where
    E: Entity,
    R: Repository<E> + 'static,
    C: Cache + ?Sized + 'static,
{
    async fn get_all(&self, include: Includes) -> Result<Vec<E>> {
        self.repository.get_all(include).await
    }

    async fn get_all_paginated(&self, skip: i64, limit: i64, include: Includes) -> Result<Vec<E>> {
        if !include.is_empty() {
            return self
                .repository
                .get_all_paginated(skip, limit, include)
                .await;
        }

        let cache_key = page_key(E::KIND, skip, limit);
        if let Some(page) = self.cached::<Vec<E>>(&cache_key).await {
            tracing::trace!(entity = E::KIND, skip, limit, "Cache hit for page");
            return Ok(page);
        }

        tracing::trace!(entity = E::KIND, skip, limit, "Cache miss for page");
        let page = self
            .repository
            .get_all_paginated(skip, limit, include)
            .await?;

        match serialize(page.as_slice()) {
            Ok(bytes) => {
                if let Err(err) = self.cache.set(&cache_key, &bytes, Some(self.ttl)).await {
                    tracing::warn!(entity = E::KIND, error = %err, "Failed to cache page");
                }
            }
            Err(err) => {
                tracing::warn!(entity = E::KIND, error = %err, "Page serialization failed");
            }
        }

        Ok(page)
    }

    async fn count(&self) -> Result<u64> {
        self.repository.count().await
    }

    async fn get_first_or_default(
        &self,
        filter: Option<Filter>,
        include: Includes,
    ) -> Result<Option<E>> {
        self.repository.get_first_or_default(filter, include).await
    }

    async fn get_first(&self, filter: Option<Filter>, include: Includes) -> Result<E> {
        self.repository.get_first(filter, include).await
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<E>> {
        let cache_key = entity_key(E::KIND, id);

        if let Some(entity) = self.cached::<E>(&cache_key).await {
            tracing::trace!(entity = E::KIND, id = %id, "Cache hit");
            return Ok(Some(entity));
        }

        tracing::trace!(entity = E::KIND, id = %id, "Cache miss");
        let entity = self.repository.get_by_id(id).await?;

        // Only found values are cached
        if let Some(ref e) = entity {
            self.cache_entity(e).await;
        }

        Ok(entity)
    }

    async fn get_where(
        &self,
        filter: Option<Filter>,
        include: Includes,
        ignore_default_includes: bool,
    ) -> Result<Vec<E>> {
        self.repository
            .get_where(filter, include, ignore_default_includes)
            .await
    }

    async fn post(&self, entity: E) -> Result<E> {
        let staged = self.repository.post(entity).await?;
        self.cache_entity(&staged).await;
        self.track(staged.id()).await;
        Ok(staged)
    }

    async fn update(&self, entity: E) -> Result<E> {
        let staged = self.repository.update(entity).await?;
        self.cache_entity(&staged).await;
        self.track(staged.id()).await;
        Ok(staged)
    }

    async fn delete(&self, entity: &E) -> Result<()> {
        self.repository.delete(entity).await?;
        self.evict(entity.id()).await;
        self.track(entity.id()).await;
        Ok(())
    }

    async fn delete_all(&self, entities: &[E]) -> Result<()> {
        self.repository.delete_all(entities).await?;
        for entity in entities {
            self.evict(entity.id()).await;
            self.track(entity.id()).await;
        }
        Ok(())
    }

    async fn update_many(&self, filter: Filter, mutation: Mutation) -> Result<u64> {
        self.repository.update_many(filter, mutation).await
    }

    async fn save_changes(&self) -> Result<()> {
        let written = std::mem::take(&mut *self.written.lock().await);

        match self.repository.save_changes().await {
            Ok(()) => {
                for id in written {
                    self.refresh(id).await;
                }
                Ok(())
            }
            Err(err) => {
                if err.is_persistence_failure() {
                    tracing::debug!(entity = E::KIND, evicted = written.len(), error = %err, "Commit rejected");
                }
                // A rejected write must never be served from the cache
                for id in written {
                    self.evict(id).await;
                }
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use shoplist_core::cache::{CacheError, Result as CacheResult};
    use shoplist_core::entity::{ItemCategory, User};
    use shoplist_core::storage::{
        Change, EntitySet, GenericRepository, Query, RepositoryError,
    };

    use shoplist_core::service::{CategoryService, ItemCategoryResponse};

    use crate::cache::MemoryCache;
    use crate::storage::InMemoryStore;

    // Store wrapper that counts reads and can reject commits
    #[derive(Default)]
    struct CountingStore {
        inner: InMemoryStore,
        fetches: AtomicUsize,
        reject_commits: AtomicBool,
    }

    impl CountingStore {
        fn fetches(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl EntitySet<ItemCategory> for CountingStore {
        async fn fetch(&self, query: Query) -> Result<Vec<ItemCategory>> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.inner.fetch(query).await
        }

        async fn count(&self) -> Result<u64> {
            EntitySet::<ItemCategory>::count(&self.inner).await
        }

        async fn commit(&self, changes: Vec<Change<ItemCategory>>) -> Result<()> {
            if self.reject_commits.load(Ordering::SeqCst) {
                return Err(RepositoryError::QueryFailed("disk full".to_string()));
            }
            self.inner.commit(changes).await
        }

        async fn update_where(&self, filter: &Filter, mutation: &Mutation) -> Result<u64> {
            EntitySet::<ItemCategory>::update_where(&self.inner, filter, mutation).await
        }
    }

    // Cache that fails every operation
    struct BrokenCache;

    #[async_trait]
    impl Cache for BrokenCache {
        async fn get(&self, _key: &str) -> CacheResult<Option<Vec<u8>>> {
            Err(CacheError::Unavailable("refused".to_string()))
        }

        async fn set(&self, _key: &str, _value: &[u8], _ttl: Option<Duration>) -> CacheResult<()> {
            Err(CacheError::Unavailable("refused".to_string()))
        }

        async fn delete(&self, _key: &str) -> CacheResult<()> {
            Err(CacheError::Unavailable("refused".to_string()))
        }
    }

    // Repository that answers get_by_id from a script and counts the calls
    #[derive(Default)]
    struct ScriptedRepository {
        answers: std::sync::Mutex<VecDeque<Option<ItemCategory>>>,
        get_by_id_calls: AtomicUsize,
    }

    impl ScriptedRepository {
        fn answering(answers: impl IntoIterator<Item = Option<ItemCategory>>) -> Self {
            Self {
                answers: std::sync::Mutex::new(answers.into_iter().collect()),
                get_by_id_calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.get_by_id_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Repository<ItemCategory> for ScriptedRepository {
        async fn get_all(&self, _include: Includes) -> Result<Vec<ItemCategory>> {
            unimplemented!()
        }

        async fn get_all_paginated(
            &self,
            _skip: i64,
            _limit: i64,
            _include: Includes,
        ) -> Result<Vec<ItemCategory>> {
            unimplemented!()
        }

        async fn count(&self) -> Result<u64> {
            unimplemented!()
        }

        async fn get_first_or_default(
            &self,
            _filter: Option<Filter>,
            _include: Includes,
        ) -> Result<Option<ItemCategory>> {
            unimplemented!()
        }

        async fn get_first(
            &self,
            _filter: Option<Filter>,
            _include: Includes,
        ) -> Result<ItemCategory> {
            unimplemented!()
        }

        async fn get_by_id(&self, _id: Uuid) -> Result<Option<ItemCategory>> {
            self.get_by_id_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.answers.lock().unwrap().pop_front().flatten())
        }

        async fn get_where(
            &self,
            _filter: Option<Filter>,
            _include: Includes,
            _ignore_default_includes: bool,
        ) -> Result<Vec<ItemCategory>> {
            unimplemented!()
        }

        async fn post(&self, _entity: ItemCategory) -> Result<ItemCategory> {
            unimplemented!()
        }

        async fn update(&self, _entity: ItemCategory) -> Result<ItemCategory> {
            unimplemented!()
        }

        async fn delete(&self, _entity: &ItemCategory) -> Result<()> {
            unimplemented!()
        }

        async fn delete_all(&self, _entities: &[ItemCategory]) -> Result<()> {
            unimplemented!()
        }

        async fn update_many(&self, _filter: Filter, _mutation: Mutation) -> Result<u64> {
            unimplemented!()
        }

        async fn save_changes(&self) -> Result<()> {
            unimplemented!()
        }
    }

    type Inner = GenericRepository<ItemCategory, CountingStore>;

    fn cached_over<C: Cache + ?Sized>(
        store: &Arc<CountingStore>,
        cache: Arc<C>,
    ) -> CachedRepository<ItemCategory, Inner, C> {
        CachedRepository::new(
            Arc::new(GenericRepository::new(store.clone())),
            cache,
            Duration::from_secs(60),
        )
    }

    async fn seed(store: &CountingStore, name: &str) -> ItemCategory {
        let category = ItemCategory::new(name).with_id(Uuid::new_v4());
        store
            .inner
            .commit(vec![Change::Insert(category.clone())])
            .await
            .unwrap();
        category
    }

    #[tokio::test]
    async fn test_get_by_id_second_read_is_served_from_cache() {
        let store = Arc::new(CountingStore::default());
        let cache = Arc::new(MemoryCache::new(100));
        let category = seed(&store, "Dairy").await;
        let repo = cached_over(&store, cache);

        assert_eq!(repo.get_by_id(category.id).await.unwrap(), Some(category.clone()));
        assert_eq!(repo.get_by_id(category.id).await.unwrap(), Some(category));
        assert_eq!(store.fetches(), 1);
    }

    #[tokio::test]
    async fn test_get_by_id_miss_is_not_cached() {
        let store = Arc::new(CountingStore::default());
        let cache = Arc::new(MemoryCache::new(100));
        let repo = cached_over(&store, cache.clone());
        let id = Uuid::new_v4();

        assert_eq!(repo.get_by_id(id).await.unwrap(), None);
        assert_eq!(repo.get_by_id(id).await.unwrap(), None);
        assert_eq!(store.fetches(), 2);
        assert!(cache.get(&entity_key("item_category", id)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_shared_cache_serves_other_repositories() {
        let store = Arc::new(CountingStore::default());
        let cache = Arc::new(MemoryCache::new(100));
        let category = seed(&store, "Dairy").await;

        cached_over(&store, cache.clone())
            .get_by_id(category.id)
            .await
            .unwrap();
        cached_over(&store, cache)
            .get_by_id(category.id)
            .await
            .unwrap();
        assert_eq!(store.fetches(), 1);
    }

    #[tokio::test]
    async fn test_page_is_cached_until_expiry() {
        let store = Arc::new(CountingStore::default());
        let cache = Arc::new(MemoryCache::new(100));
        seed(&store, "a").await;
        let repo = cached_over(&store, cache);

        let first = repo.get_all_paginated(0, 10, Includes::NONE).await.unwrap();
        seed(&store, "b").await;
        let second = repo.get_all_paginated(0, 10, Includes::NONE).await.unwrap();

        // Stale until the TTL elapses
        assert_eq!(first, second);
        assert_eq!(second.len(), 1);
        assert_eq!(store.fetches(), 1);
    }

    #[tokio::test]
    async fn test_page_with_extra_includes_bypasses_cache() {
        let store = Arc::new(CountingStore::default());
        let cache = Arc::new(MemoryCache::new(100));
        seed(&store, "a").await;
        let repo = cached_over(&store, cache);

        repo.get_all_paginated(0, 10, Includes::ITEMS).await.unwrap();
        repo.get_all_paginated(0, 10, Includes::ITEMS).await.unwrap();
        assert_eq!(store.fetches(), 2);
    }

    #[tokio::test]
    async fn test_post_writes_through_and_commit_refreshes() {
        let store = Arc::new(CountingStore::default());
        let cache = Arc::new(MemoryCache::new(100));
        let repo = cached_over(&store, cache);

        let staged = repo.post(ItemCategory::new("Bakery")).await.unwrap();
        repo.save_changes().await.unwrap();
        let fetches = store.fetches();

        assert_eq!(repo.get_by_id(staged.id).await.unwrap(), Some(staged));
        assert_eq!(store.fetches(), fetches);
    }

    #[tokio::test]
    async fn test_failed_commit_evicts_written_entries() {
        let store = Arc::new(CountingStore::default());
        let cache = Arc::new(MemoryCache::new(100));
        let category = seed(&store, "Dairy").await;
        let repo = cached_over(&store, cache.clone());

        let renamed = ItemCategory::new("Milk").with_id(category.id);
        repo.update(renamed).await.unwrap();
        store.reject_commits.store(true, Ordering::SeqCst);

        let result = repo.save_changes().await;
        assert!(matches!(result, Err(RepositoryError::QueryFailed(_))));
        assert!(cache
            .get(&entity_key("item_category", category.id))
            .await
            .unwrap()
            .is_none());
        assert_eq!(repo.get_by_id(category.id).await.unwrap(), Some(category));
    }

    #[tokio::test]
    async fn test_delete_evicts() {
        let store = Arc::new(CountingStore::default());
        let cache = Arc::new(MemoryCache::new(100));
        let category = seed(&store, "Dairy").await;
        let repo = cached_over(&store, cache);

        repo.get_by_id(category.id).await.unwrap();
        repo.delete(&category).await.unwrap();
        repo.save_changes().await.unwrap();

        assert_eq!(repo.get_by_id(category.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_all_evicts_every_entity() {
        let store = Arc::new(CountingStore::default());
        let cache = Arc::new(MemoryCache::new(100));
        let dairy = seed(&store, "Dairy").await;
        let bakery = seed(&store, "Bakery").await;
        let repo = cached_over(&store, cache);

        repo.get_by_id(dairy.id).await.unwrap();
        repo.get_by_id(bakery.id).await.unwrap();
        repo.delete_all(&[dairy.clone(), bakery.clone()]).await.unwrap();
        repo.save_changes().await.unwrap();

        assert_eq!(repo.get_by_id(dairy.id).await.unwrap(), None);
        assert_eq!(repo.get_by_id(bakery.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_broken_cache_fails_open() {
        let store = Arc::new(CountingStore::default());
        let category = seed(&store, "Dairy").await;
        let repo = cached_over(&store, Arc::new(BrokenCache));

        assert_eq!(repo.get_by_id(category.id).await.unwrap(), Some(category));
        assert_eq!(
            repo.get_all_paginated(0, 5, Includes::NONE).await.unwrap().len(),
            1
        );
        repo.post(ItemCategory::new("Bakery")).await.unwrap();
        repo.save_changes().await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_works_over_dyn_cache() {
        let store = Arc::new(CountingStore::default());
        let category = seed(&store, "Dairy").await;
        let cache: Arc<dyn Cache> = Arc::new(MemoryCache::new(100));
        let repo = cached_over(&store, cache);

        repo.get_by_id(category.id).await.unwrap();
        repo.get_by_id(category.id).await.unwrap();
        assert_eq!(store.fetches(), 1);
    }

    #[tokio::test]
    async fn test_undecodable_entry_is_a_miss() {
        let store = Arc::new(CountingStore::default());
        let cache = Arc::new(MemoryCache::new(100));
        let category = seed(&store, "Dairy").await;
        cache
            .set(&entity_key("item_category", category.id), b"not json", None)
            .await
            .unwrap();
        let repo = cached_over(&store, cache);

        assert_eq!(repo.get_by_id(category.id).await.unwrap(), Some(category));
        assert_eq!(store.fetches(), 1);
    }

    #[tokio::test]
    async fn test_find_by_id_reaches_repository_once_per_miss() {
        let id = Uuid::new_v4();
        let dairy = ItemCategory::new("Dairy").with_id(id);
        let milk = ItemCategory::new("Milk").with_id(id);
        let inner = Arc::new(ScriptedRepository::answering([
            Some(dairy),
            Some(milk),
            Some(ItemCategory::new("Cheese").with_id(id)),
        ]));
        let cache = Arc::new(MemoryCache::new(100));
        let service = CategoryService::new(CachedRepository::new(
            inner.clone(),
            cache.clone(),
            Duration::from_secs(60),
        ));
        let name = |found: Option<ItemCategoryResponse>| found.map(|c| c.name);

        // Miss, then hits while the repository would already answer differently
        assert_eq!(name(service.find_by_id(id).await.unwrap()).as_deref(), Some("Dairy"));
        assert_eq!(name(service.find_by_id(id).await.unwrap()).as_deref(), Some("Dairy"));
        assert_eq!(name(service.find_by_id(id).await.unwrap()).as_deref(), Some("Dairy"));
        assert_eq!(inner.calls(), 1);

        cache.delete(&entity_key("item_category", id)).await.unwrap();

        assert_eq!(name(service.find_by_id(id).await.unwrap()).as_deref(), Some("Milk"));
        assert_eq!(name(service.find_by_id(id).await.unwrap()).as_deref(), Some("Milk"));
        assert_eq!(inner.calls(), 2);
    }

    #[tokio::test]
    async fn test_find_by_id_absent_answer_is_asked_again() {
        let id = Uuid::new_v4();
        let inner = Arc::new(ScriptedRepository::answering([
            None,
            Some(ItemCategory::new("Dairy").with_id(id)),
        ]));
        let service = CategoryService::new(CachedRepository::new(
            inner.clone(),
            Arc::new(MemoryCache::new(100)),
            Duration::from_secs(60),
        ));

        assert_eq!(service.find_by_id(id).await.unwrap(), None);
        let found = service.find_by_id(id).await.unwrap();
        assert_eq!(found.map(|c| c.name).as_deref(), Some("Dairy"));
        service.find_by_id(id).await.unwrap();
        assert_eq!(inner.calls(), 2);
    }

    #[tokio::test]
    async fn test_update_commit_refreshes_and_serves_from_cache() {
        let store = Arc::new(CountingStore::default());
        let cache = Arc::new(MemoryCache::new(100));
        let category = seed(&store, "Dairy").await;
        let repo = cached_over(&store, cache);

        repo.get_by_id(category.id).await.unwrap();
        let renamed = ItemCategory::new("Milk").with_id(category.id);
        repo.update(renamed.clone()).await.unwrap();
        repo.save_changes().await.unwrap();
        let fetches = store.fetches();

        assert_eq!(repo.get_by_id(category.id).await.unwrap(), Some(renamed.clone()));
        assert_eq!(repo.get_by_id(category.id).await.unwrap(), Some(renamed));
        assert_eq!(store.fetches(), fetches);
    }

    #[tokio::test]
    async fn test_cached_user_holds_no_password_hash() {
        let store = Arc::new(InMemoryStore::new());
        let cache = Arc::new(MemoryCache::new(100));
        let repo: CachedRepository<User, _, _> = CachedRepository::new(
            Arc::new(GenericRepository::<User, InMemoryStore>::new(store.clone())),
            cache.clone(),
            Duration::from_secs(60),
        );

        let user = repo
            .post(User::new("ann", "ann@example.com").with_password_hash("$argon2id$secret"))
            .await
            .unwrap();
        repo.save_changes().await.unwrap();

        let bytes = cache.get(&entity_key("user", user.id)).await.unwrap().unwrap();
        assert!(!String::from_utf8_lossy(&bytes).contains("argon2id"));
        let cached = repo.get_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(cached.password_hash, None);

        let stored: Vec<User> = store.fetch(Query::new(Includes::NONE)).await.unwrap();
        assert_eq!(stored[0].password_hash.as_deref(), Some("$argon2id$secret"));
    }
}
