//! # Error Envelope
//!
//! Errors returned by HTTP handlers are either *managed* or *unmanaged*.
//!
//! - A [`ManagedError`] is an expected, client-facing failure. It is rendered as
//!   HTTP 400 with the JSON body `{"code": ..., "message": ..., "data": ...}`.
//! - Anything else is unmanaged. It is rendered as HTTP 500 and tagged with an
//!   [`UnmanagedError`] response extension so the error middleware can log it.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Machine-readable error code
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ErrCode(String);

impl ErrCode {
    pub const DEFAULT: &'static str = "default";

    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ErrCode {
    fn default() -> Self {
        Self::new(Self::DEFAULT)
    }
}

impl fmt::Display for ErrCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Client-facing error
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManagedError {
    pub code: ErrCode,
    pub message: String,
    pub data: Value,
}

impl ManagedError {
    pub fn new(code: ErrCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: Value::Null,
        }
    }

    /// Error with the default code
    pub fn message(message: impl Into<String>) -> Self {
        Self::new(ErrCode::default(), message)
    }

    #[must_use]
    pub fn with_data(mut self, data: impl Into<Value>) -> Self {
        self.data = data.into();
        self
    }
}

impl fmt::Display for ManagedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ManagedError {}

/// Marker placed in the extensions of responses produced from unmanaged errors
#[derive(Debug, Clone)]
pub struct UnmanagedError(pub Arc<anyhow::Error>);

/// Handler error
#[derive(Debug)]
pub enum AppError {
    Managed(ManagedError),
    Unmanaged(anyhow::Error),
}

impl AppError {
    pub fn is_managed(&self) -> bool {
        matches!(self, AppError::Managed(_))
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Managed(err) => fmt::Display::fmt(err, f),
            AppError::Unmanaged(err) => fmt::Display::fmt(err, f),
        }
    }
}

impl From<ManagedError> for AppError {
    fn from(err: ManagedError) -> Self {
        AppError::Managed(err)
    }
}

impl From<anyhow::Error> for AppError {
    /// Recognises a [`ManagedError`] anywhere in the chain
    fn from(err: anyhow::Error) -> Self {
        match err.chain().find_map(|cause| cause.downcast_ref::<ManagedError>()) {
            Some(managed) => AppError::Managed(managed.clone()),
            None => AppError::Unmanaged(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Managed(err) => (StatusCode::BAD_REQUEST, Json(err)).into_response(),
            AppError::Unmanaged(err) => {
                let mut response = (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    StatusCode::INTERNAL_SERVER_ERROR
                        .canonical_reason()
                        .unwrap_or_default(),
                )
                    .into_response();
                response
                    .extensions_mut()
                    .insert(UnmanagedError(Arc::new(err)));
                response
            }
        }
    }
}
