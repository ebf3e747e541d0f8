use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use shoplist_core::entity::{Entity, Filter, ShoppingList};
use shoplist_core::service::{PaginatedResponse, ShoppingListRequest, ShoppingListResponse};

use super::{delete_items, replace, with_next_link, AppError, PageQuery};
use crate::state::AppState;

/// List one page of shopping lists (GET /api/shopping-lists).
pub async fn list_shopping_lists(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> Result<Json<PaginatedResponse<ShoppingListResponse>>, AppError> {
    let page = state
        .shopping_lists()
        .get_all_paginated(page.skip, page.limit)
        .await?;

    Ok(Json(with_next_link(page, "/api/shopping-lists")))
}

/// Get a single shopping list by ID (GET /api/shopping-lists/{id}).
pub async fn get_shopping_list(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ShoppingListResponse>, AppError> {
    state
        .shopping_lists()
        .find_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found(ShoppingList::KIND, id))
}

/// Create a new shopping list (POST /api/shopping-lists).
pub async fn create_shopping_list(
    State(state): State<AppState>,
    Json(payload): Json<ShoppingListRequest>,
) -> Result<impl IntoResponse, AppError> {
    let created = state.shopping_lists().insert(payload).await?;

    tracing::info!(shopping_list_id = %created.id, user_id = %created.user_id, "Created new shopping list");

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, format!("/api/shopping-lists/{}", created.id))],
        Json(created),
    ))
}

/// Replace a shopping list (PUT /api/shopping-lists/{id}).
///
/// Only the list's own fields are written; `items` in the body is ignored.
pub async fn update_shopping_list(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ShoppingListResponse>,
) -> Result<StatusCode, AppError> {
    replace(&state.shopping_lists(), id, payload).await?;

    tracing::info!(shopping_list_id = %id, "Updated shopping list");

    Ok(StatusCode::NO_CONTENT)
}

/// Delete a shopping list by ID (DELETE /api/shopping-lists/{id}).
///
/// Also deletes all items on this list.
pub async fn delete_shopping_list(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let service = state.shopping_lists();
    let list = service
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found(ShoppingList::KIND, id))?;

    let items = delete_items(&state, Filter::eq("shopping_list_id", id)).await?;
    service.delete(&list).await?;

    tracing::info!(shopping_list_id = %id, items, "Deleted shopping list and its items");

    Ok(StatusCode::NO_CONTENT)
}
