pub mod blobs;
pub mod categories;
pub mod error;
pub mod health;
pub mod items;
pub mod shopping_lists;
pub mod users;

use serde::Deserialize;
use uuid::Uuid;

use shoplist_core::entity::{Entity, Filter, Includes, Item};
use shoplist_core::service::{
    FromEntity, GenericService, IntoEntity, PaginatedResponse, ToEntity,
};
use shoplist_core::storage::{Repository, RepositoryError};

use crate::state::AppState;

pub use error::AppError;

/// `skip`/`limit` query parameters shared by the paginated listings.
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    10
}

/// Fills `next_link` with the listing URL of the following page, when there
/// is one.
pub(crate) fn with_next_link<T>(page: PaginatedResponse<T>, path: &str) -> PaginatedResponse<T> {
    let link = page
        .next_skip()
        .map(|skip| format!("{path}?skip={skip}&limit={}", page.limit));
    page.with_next_link(link)
}

/// Full replace of the entity at `id`.
///
/// The body must carry the same id. When the row vanished before the commit
/// the request answers 404 instead of 409.
pub(crate) async fn replace<E, Req, Resp, R>(
    service: &GenericService<E, Req, Resp, R>,
    id: Uuid,
    body: Resp,
) -> Result<Resp, AppError>
where
    E: Entity,
    Req: IntoEntity<E>,
    Resp: FromEntity<E> + ToEntity<E>,
    R: Repository<E>,
{
    if body.to_entity().id() != id {
        return Err(AppError::bad_request("Route id does not match body id"));
    }

    match service.update(body).await {
        Ok(updated) => Ok(updated),
        Err(err @ RepositoryError::ConcurrencyConflict { .. }) => {
            if service.find_by_id(id).await?.is_none() {
                return Err(AppError::not_found(E::KIND, id));
            }
            Err(err.into())
        }
        Err(err) => Err(err.into()),
    }
}

/// Deletes every item matching `filter` through the item repository, so their
/// cache entries and search documents go with them. Runs before a delete
/// that would otherwise cascade to those items in the store.
pub(crate) async fn delete_items(state: &AppState, filter: Filter) -> Result<usize, AppError> {
    let items = state.repository::<Item>();
    let doomed = items.get_where(Some(filter), Includes::NONE, true).await?;
    if doomed.is_empty() {
        return Ok(0);
    }

    items.delete_all(&doomed).await?;
    items.save_changes().await?;
    for item in &doomed {
        state.search.remove(item.id).await?;
    }

    Ok(doomed.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(skip: i64, len: usize, total: u64) -> PaginatedResponse<u32> {
        PaginatedResponse {
            entities: vec![0; len],
            total_count: total,
            limit: 2,
            skip,
            next_link: None,
        }
    }

    #[test]
    fn test_next_link_points_at_following_page() {
        let linked = with_next_link(page(0, 2, 5), "/api/items");
        assert_eq!(
            linked.next_link.as_deref(),
            Some("/api/items?skip=2&limit=2")
        );
    }

    #[test]
    fn test_last_page_has_no_link() {
        assert_eq!(with_next_link(page(4, 1, 5), "/api/items").next_link, None);
    }
}
