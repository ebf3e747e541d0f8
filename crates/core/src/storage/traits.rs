use async_trait::async_trait;
use uuid::Uuid;

use crate::entity::{Entity, Filter, Includes, Mutation};

use super::{Change, Query, Result};

/// Data access for one entity type.
///
/// Writes (`post`, `update`, `patch`, `delete`, `delete_all`) are staged and
/// only reach the store on [`Repository::save_changes`]. `update_many` is the
/// exception: it executes immediately.
#[async_trait]
pub trait Repository<E: Entity>: Send + Sync {
    /// Every entity, with default includes plus `include`.
    async fn get_all(&self, include: Includes) -> Result<Vec<E>>;

    /// The `[skip, skip + limit)` slice in store order.
    ///
    /// A negative `skip` or a non-positive `limit` yields an empty page.
    async fn get_all_paginated(&self, skip: i64, limit: i64, include: Includes) -> Result<Vec<E>>;

    /// Number of persisted entities.
    async fn count(&self) -> Result<u64>;

    /// First entity matching `filter` (or the first row when `None`).
    async fn get_first_or_default(
        &self,
        filter: Option<Filter>,
        include: Includes,
    ) -> Result<Option<E>>;

    /// Like [`Repository::get_first_or_default`], failing with `NotFound`
    /// when nothing matches.
    async fn get_first(&self, filter: Option<Filter>, include: Includes) -> Result<E>;

    async fn get_by_id(&self, id: Uuid) -> Result<Option<E>>;

    /// Entities matching `filter`. The filter is required.
    async fn get_where(
        &self,
        filter: Option<Filter>,
        include: Includes,
        ignore_default_includes: bool,
    ) -> Result<Vec<E>>;

    /// Stages an insert, assigning a fresh id when the entity has none.
    async fn post(&self, entity: E) -> Result<E>;

    /// Stages a full replace keyed by id.
    async fn update(&self, entity: E) -> Result<E>;

    async fn patch(&self, entity: E) -> Result<E> {
        self.update(entity).await
    }

    async fn delete(&self, entity: &E) -> Result<()>;

    async fn delete_all(&self, entities: &[E]) -> Result<()>;

    /// Applies `mutation` to every row matching `filter`, bypassing staging.
    /// Returns the number of affected rows.
    async fn update_many(&self, filter: Filter, mutation: Mutation) -> Result<u64>;

    /// Commits all staged changes atomically.
    async fn save_changes(&self) -> Result<()>;
}

/// Storage backend for one entity type.
///
/// Backends own referential integrity, cascades and relation loading.
#[async_trait]
pub trait EntitySet<E: Entity>: Send + Sync {
    async fn fetch(&self, query: Query) -> Result<Vec<E>>;

    async fn count(&self) -> Result<u64>;

    /// Applies all changes or none of them.
    ///
    /// An update or delete targeting a missing row fails with
    /// `ConcurrencyConflict`.
    async fn commit(&self, changes: Vec<Change<E>>) -> Result<()>;

    async fn update_where(&self, filter: &Filter, mutation: &Mutation) -> Result<u64>;
}
