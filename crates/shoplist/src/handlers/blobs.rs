use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
};
use chrono::Utc;
use serde::Deserialize;

use super::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SignedQuery {
    pub expires: i64,
    pub sig: String,
}

/// Serve a blob behind a signed link (GET /blobs/{name}?expires=..&sig=..).
pub async fn get_blob(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(signed): Query<SignedQuery>,
) -> Result<impl IntoResponse, AppError> {
    if !state
        .blobs
        .verify(&name, signed.expires, &signed.sig, Utc::now().timestamp())
    {
        return Err(AppError::forbidden("Invalid or expired link"));
    }

    let bytes = state
        .blobs
        .read(&name)
        .await?
        .ok_or_else(|| AppError::not_found("blob", &name))?;

    Ok(([(header::CONTENT_TYPE, content_type(&name))], bytes))
}

fn content_type(name: &str) -> &'static str {
    match name.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase()) {
        Some(ext) if ext == "png" => "image/png",
        Some(ext) if ext == "jpg" || ext == "jpeg" => "image/jpeg",
        Some(ext) if ext == "gif" => "image/gif",
        Some(ext) if ext == "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}
