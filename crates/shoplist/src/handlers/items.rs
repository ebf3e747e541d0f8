use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use shoplist_core::entity::{Entity, Item};
use shoplist_core::service::{ItemRequest, ItemResponse, PaginatedResponse};

use super::{replace, with_next_link, AppError, PageQuery};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub skip: usize,
    #[serde(default = "default_search_limit")]
    pub limit: usize,
}

fn default_search_limit() -> usize {
    10
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexQuery {
    #[serde(alias = "index_name")]
    pub index_name: String,
}

/// List one page of items (GET /api/items).
///
/// The returned page is pushed into the search index.
pub async fn list_items(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> Result<Json<PaginatedResponse<ItemResponse>>, AppError> {
    let page = state.items().get_all_paginated(page.skip, page.limit).await?;
    state.search.add_or_update_bulk(&page.entities).await?;

    Ok(Json(with_next_link(page, "/api/items")))
}

/// Full-text search over indexed items (GET /api/items/search).
pub async fn search_items(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<Vec<ItemResponse>>, AppError> {
    let query = params.query.unwrap_or_default();
    if query.trim().is_empty() {
        return Err(AppError::bad_request("Query parameter cannot be empty."));
    }

    let items = state
        .search
        .search(&query, params.skip, params.limit)
        .await?;
    Ok(Json(items))
}

/// Create a search index (POST /api/items/create-index).
pub async fn create_index(
    State(state): State<AppState>,
    Query(params): Query<IndexQuery>,
) -> Result<Json<String>, AppError> {
    state
        .search
        .create_index_if_not_exists(&params.index_name)
        .await?;

    tracing::info!(index = %params.index_name, "Created search index");

    Ok(Json(format!("Index {} was created", params.index_name)))
}

/// Get a single item by ID (GET /api/items/{id}).
pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ItemResponse>, AppError> {
    state
        .items()
        .find_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found(Item::KIND, id))
}

/// Create a new item (POST /api/items).
pub async fn create_item(
    State(state): State<AppState>,
    Json(payload): Json<ItemRequest>,
) -> Result<impl IntoResponse, AppError> {
    let service = state.items();
    let staged = service.insert(payload).await?;

    // Re-read so the response and the indexed document carry the category name
    let created = service.find_by_id(staged.id).await?.unwrap_or(staged);
    state.search.add_or_update(&created).await?;

    tracing::info!(item_id = %created.id, name = %created.name, "Created new item");

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, format!("/api/items/{}", created.id))],
        Json(created),
    ))
}

/// Replace an item (PUT /api/items/{id}).
pub async fn update_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ItemResponse>,
) -> Result<StatusCode, AppError> {
    let service = state.items();
    let updated = replace(&service, id, payload).await?;

    let indexed = service.find_by_id(id).await?.unwrap_or(updated);
    state.search.add_or_update(&indexed).await?;

    tracing::info!(item_id = %id, "Updated item");

    Ok(StatusCode::NO_CONTENT)
}

/// Delete an item (DELETE /api/items/{id}).
pub async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let service = state.items();
    let item = service
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found(Item::KIND, id))?;

    service.delete(&item).await?;
    state.search.remove(id).await?;

    tracing::info!(item_id = %id, "Deleted item");

    Ok(StatusCode::NO_CONTENT)
}
