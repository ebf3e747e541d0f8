//! Liveness endpoint.

use axum::http::StatusCode;

/// GET /livez - Liveness check.
///
/// Returns 200 immediately. Used to check if the server is accepting connections.
pub async fn livez() -> StatusCode {
    StatusCode::OK
}
