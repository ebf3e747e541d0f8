use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use shoplist_core::entity::{Entity, Filter, ItemCategory};
use shoplist_core::service::{ItemCategoryRequest, ItemCategoryResponse};

use super::{delete_items, replace, AppError};
use crate::state::AppState;

/// List all categories (GET /api/item-categories).
pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<ItemCategoryResponse>>, AppError> {
    Ok(Json(state.categories().get_all().await?))
}

/// Get a single category by ID (GET /api/item-categories/{id}).
pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ItemCategoryResponse>, AppError> {
    state
        .categories()
        .find_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found(ItemCategory::KIND, id))
}

/// Create a new category (POST /api/item-categories).
pub async fn create_category(
    State(state): State<AppState>,
    Json(payload): Json<ItemCategoryRequest>,
) -> Result<impl IntoResponse, AppError> {
    let created = state.categories().insert(payload).await?;

    tracing::info!(category_id = %created.id, name = %created.name, "Created new category");

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, format!("/api/item-categories/{}", created.id))],
        Json(created),
    ))
}

/// Replace a category (PUT /api/item-categories/{id}).
pub async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ItemCategoryResponse>,
) -> Result<StatusCode, AppError> {
    replace(&state.categories(), id, payload).await?;

    tracing::info!(category_id = %id, "Updated category");

    Ok(StatusCode::NO_CONTENT)
}

/// Delete a category by ID (DELETE /api/item-categories/{id}).
///
/// Also deletes all items in this category.
pub async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let service = state.categories();
    let category = service
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found(ItemCategory::KIND, id))?;

    let items = delete_items(&state, Filter::eq("item_category_id", id)).await?;
    service.delete(&category).await?;

    tracing::info!(category_id = %id, items, "Deleted category and its items");

    Ok(StatusCode::NO_CONTENT)
}
