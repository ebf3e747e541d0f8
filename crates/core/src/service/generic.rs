use std::marker::PhantomData;

use uuid::Uuid;

use crate::entity::{Entity, Includes};
use crate::storage::{Repository, Result};

use super::{FromEntity, IntoEntity, PaginatedResponse, ToEntity};

/// CRUD service over one entity type.
///
/// `Req` is the shape accepted on insert, `Resp` the shape returned to
/// callers and accepted back on update/delete. Every write commits
/// immediately; failures from the repository are returned unchanged.
pub struct GenericService<E, Req, Resp, R> {
    repository: R,
    _shapes: PhantomData<fn() -> (E, Req, Resp)>,
}

impl<E, Req, Resp, R> GenericService<E, Req, Resp, R>
where
    E: Entity,
    Req: IntoEntity<E>,
    Resp: FromEntity<E> + ToEntity<E>,
    R: Repository<E>,
{
    pub fn new(repository: R) -> Self {
        Self {
            repository,
            _shapes: PhantomData,
        }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub async fn get_all(&self) -> Result<Vec<Resp>> {
        let entities = self.repository.get_all(Includes::NONE).await?;
        Ok(entities.into_iter().map(Resp::from_entity).collect())
    }

    /// One page plus the true row count. `next_link` is left for the caller
    /// to fill, since only it knows the public URL.
    pub async fn get_all_paginated(
        &self,
        skip: i64,
        limit: i64,
    ) -> Result<PaginatedResponse<Resp>> {
        let entities = self
            .repository
            .get_all_paginated(skip, limit, Includes::NONE)
            .await?;
        let total_count = self.repository.count().await?;

        Ok(PaginatedResponse {
            entities: entities.into_iter().map(Resp::from_entity).collect(),
            total_count,
            limit,
            skip,
            next_link: None,
        })
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Resp>> {
        let entity = self.repository.get_by_id(id).await?;
        Ok(entity.map(Resp::from_entity))
    }

    pub async fn insert(&self, request: Req) -> Result<Resp> {
        let staged = self.repository.post(request.into_entity()).await?;
        self.repository.save_changes().await?;
        Ok(Resp::from_entity(staged))
    }

    /// Full replace. Returns `response` as given rather than re-reading it.
    pub async fn update(&self, response: Resp) -> Result<Resp> {
        self.repository.update(response.to_entity()).await?;
        self.repository.save_changes().await?;
        Ok(response)
    }

    pub async fn delete(&self, response: &Resp) -> Result<()> {
        self.repository.delete(&response.to_entity()).await?;
        self.repository.save_changes().await
    }
}
