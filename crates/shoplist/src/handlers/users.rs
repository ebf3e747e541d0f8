use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use shoplist_auth::{AuthResponse, LoginRequest, RegisterRequest};
use shoplist_core::entity::{
    Entity, Filter, Includes, ShoppingList, User, DEFAULT_IMAGE_NAME,
};
use shoplist_core::integrations::BlobStore;
use shoplist_core::service::ShoppingListResponse;
use shoplist_core::storage::Repository;

use super::{delete_items, AppError};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageQuery {
    #[serde(alias = "file_name")]
    pub file_name: String,
}

/// Register a new account (POST /api/users/register).
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    Ok(Json(state.auth().register(payload).await?))
}

/// Exchange credentials for a token (POST /api/users/login).
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    Ok(Json(state.auth().login(payload).await?))
}

/// Upload a user's avatar (POST /api/users/{id}/image?file_name=...).
///
/// The request body is the raw image. A previous custom avatar is replaced.
pub async fn upload_image(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<ImageQuery>,
    body: Bytes,
) -> Result<Json<String>, AppError> {
    let users = state.repository::<User>();
    let mut user = users
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found(User::KIND, id))?;

    let previous = (!user.has_default_image()).then(|| user.image_name.clone());
    let blob_name = state
        .blobs
        .upload_blob(&body, &params.file_name, &id.to_string(), previous.as_deref())
        .await?;

    user.image_name = blob_name.clone();
    users.update(user).await?;
    users.save_changes().await?;

    tracing::info!(user_id = %id, blob = %blob_name, size = body.len(), "Uploaded user image");

    Ok(Json(format!(
        "Image upload was successful, blob name: {blob_name}"
    )))
}

/// Every shopping list owned by a user (GET /api/users/{id}/shopping-lists).
pub async fn user_shopping_lists(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ShoppingListResponse>>, AppError> {
    if state.users().find_by_id(id).await?.is_none() {
        return Err(AppError::bad_request("User not found"));
    }

    Ok(Json(state.shopping_lists().get_by_user_id(id).await?))
}

/// Delete a user by ID (DELETE /api/users/{id}).
///
/// Removes the user's avatar, then the user together with their lists and
/// the items on them.
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let service = state.users();
    let user = service
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found(User::KIND, id))?;

    if user.image_name != DEFAULT_IMAGE_NAME {
        state.blobs.remove_blob(&user.image_name).await?;
    }

    let lists = state.repository::<ShoppingList>();
    let owned = lists
        .get_where(Some(Filter::eq("user_id", id)), Includes::NONE, true)
        .await?;
    let mut items = 0;
    if !owned.is_empty() {
        let on_owned = Filter::Or(
            owned
                .iter()
                .map(|list| Filter::eq("shopping_list_id", list.id))
                .collect(),
        );
        items = delete_items(&state, on_owned).await?;
        lists.delete_all(&owned).await?;
        lists.save_changes().await?;
    }

    service.delete(&user).await?;

    tracing::info!(user_id = %id, lists = owned.len(), items, "Deleted user");

    Ok(StatusCode::NO_CONTENT)
}
