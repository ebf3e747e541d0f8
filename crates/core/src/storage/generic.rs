//! The single repository implementation shared by every entity type.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::entity::{Entity, Filter, Includes, Mutation};

use super::{Change, EntitySet, Query, Repository, RepositoryError, Result};

/// Unit-of-work repository over an [`EntitySet`].
///
/// Holds its own staging buffer, so one instance should serve one logical
/// operation (an HTTP request). The store behind it is shared.
pub struct GenericRepository<E, S>
where
    E: Entity,
    S: EntitySet<E>,
{
    store: Arc<S>,
    staged: Mutex<Vec<Change<E>>>,
}

impl<E, S> GenericRepository<E, S>
where
    E: Entity,
    S: EntitySet<E>,
{
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            staged: Mutex::new(Vec::new()),
        }
    }

    /// Number of changes waiting for `save_changes`.
    pub async fn pending(&self) -> usize {
        self.staged.lock().await.len()
    }

    async fn stage(&self, change: Change<E>) {
        self.staged.lock().await.push(change);
    }
}

fn with_defaults<E: Entity>(include: Includes, ignore_default_includes: bool) -> Includes {
    if ignore_default_includes {
        include
    } else {
        E::DEFAULT_INCLUDES | include
    }
}

fn require_id<E: Entity>(entity: &E) -> Result<Uuid> {
    let id = entity.id();
    if id.is_nil() {
        return Err(RepositoryError::InvalidArgument(format!(
            "{} has no id",
            E::KIND
        )));
    }
    Ok(id)
}

#[async_trait]
impl<E, S> Repository<E> for GenericRepository<E, S>
where
    E: Entity,
    S: EntitySet<E> + 'static,
{
    async fn get_all(&self, include: Includes) -> Result<Vec<E>> {
        self.store
            .fetch(Query::new(with_defaults::<E>(include, false)))
            .await
    }

    async fn get_all_paginated(&self, skip: i64, limit: i64, include: Includes) -> Result<Vec<E>> {
        if skip < 0 || limit <= 0 {
            return Ok(Vec::new());
        }
        let query =
            Query::new(with_defaults::<E>(include, false)).page(skip as usize, limit as usize);
        self.store.fetch(query).await
    }

    async fn count(&self) -> Result<u64> {
        self.store.count().await
    }

    async fn get_first_or_default(
        &self,
        filter: Option<Filter>,
        include: Includes,
    ) -> Result<Option<E>> {
        if let Some(filter) = &filter {
            filter.check_fields(E::FIELDS)?;
        }
        let query = Query::new(with_defaults::<E>(include, false))
            .with_filter(filter)
            .page(0, 1);
        Ok(self.store.fetch(query).await?.into_iter().next())
    }

    async fn get_first(&self, filter: Option<Filter>, include: Includes) -> Result<E> {
        let id = filter
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_else(|| "*".to_string());
        self.get_first_or_default(filter, include)
            .await?
            .ok_or(RepositoryError::NotFound {
                entity_type: E::KIND,
                id,
            })
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<E>> {
        self.get_first_or_default(Some(Filter::id(id)), Includes::NONE)
            .await
    }

    async fn get_where(
        &self,
        filter: Option<Filter>,
        include: Includes,
        ignore_default_includes: bool,
    ) -> Result<Vec<E>> {
        let Some(filter) = filter else {
            return Err(RepositoryError::InvalidArgument(
                "a filter is required".to_string(),
            ));
        };
        filter.check_fields(E::FIELDS)?;
        let query = Query::new(with_defaults::<E>(include, ignore_default_includes))
            .with_filter(Some(filter));
        self.store.fetch(query).await
    }

    async fn post(&self, mut entity: E) -> Result<E> {
        entity.validate()?;
        if entity.id().is_nil() {
            entity.set_id(Uuid::new_v4());
        }
        self.stage(Change::Insert(entity.clone())).await;
        Ok(entity)
    }

    async fn update(&self, entity: E) -> Result<E> {
        require_id(&entity)?;
        entity.validate()?;
        self.stage(Change::Update(entity.clone())).await;
        Ok(entity)
    }

    async fn delete(&self, entity: &E) -> Result<()> {
        let id = require_id(entity)?;
        self.stage(Change::Delete(id)).await;
        Ok(())
    }

    async fn delete_all(&self, entities: &[E]) -> Result<()> {
        let ids = entities.iter().map(require_id).collect::<Result<Vec<_>>>()?;
        let mut staged = self.staged.lock().await;
        staged.extend(ids.into_iter().map(Change::Delete));
        Ok(())
    }

    async fn update_many(&self, filter: Filter, mutation: Mutation) -> Result<u64> {
        filter.check_fields(E::FIELDS)?;
        mutation.check_fields(E::FIELDS)?;
        self.store.update_where(&filter, &mutation).await
    }

    async fn save_changes(&self) -> Result<()> {
        // The buffer is emptied before the commit so a failed commit does not
        // leave stale changes behind for the next call.
        let changes = std::mem::take(&mut *self.staged.lock().await);
        if changes.is_empty() {
            return Ok(());
        }
        self.store.commit(changes).await
    }
}
