//! # Handlers
//!
//! Routes owned by the server itself.

use crate::error::AppError;
use crate::observability::metrics::gather_text;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;

/// `GET /`: liveness, empty 200
pub async fn root() -> StatusCode {
    StatusCode::OK
}

/// `GET /metrics`: Prometheus text exposition
pub async fn metrics() -> Result<impl IntoResponse, AppError> {
    let body = gather_text()?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    ))
}

pub async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}
