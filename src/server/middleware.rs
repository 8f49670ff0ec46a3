//! # Middleware
//!
//! - [`translate_errors`] (outermost) logs responses produced from unmanaged errors.
//! - [`access_log`] builds the [`RequestContext`], logs the access line, records
//!   HTTP metrics and runs the rest of the stack inside the `request` span.

use super::AppState;
use crate::constants::TRACE_ID_HEADER;
use crate::error::UnmanagedError;
use crate::observability::metrics::observe_http_request;
use crate::observability::RequestContext;
use axum::extract::{Request, State};
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use std::time::Instant;
use tracing::{error, info, Instrument};

pub async fn access_log(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let context = RequestContext::from_request(&request, state.local_addr);
    request.extensions_mut().insert(context.clone());

    let started = Instant::now();
    let mut response = async {
        info!(
            target: "access",
            method = %context.method,
            localAddr = %context.local_addr,
            remoteAddr = %context.remote_addr,
            uri = %context.uri,
            trace_id = %context.trace_id,
            "access"
        );
        next.run(request).await
    }
    .instrument(context.span())
    .await;

    observe_http_request(
        &context.method,
        response.status().as_u16(),
        started.elapsed().as_secs_f64(),
    );

    if let Ok(value) = HeaderValue::from_str(&context.trace_id) {
        response.headers_mut().insert(TRACE_ID_HEADER, value);
    }
    response.extensions_mut().insert(context);
    response
}

pub async fn translate_errors(request: Request, next: Next) -> Response {
    let response = next.run(request).await;

    if let Some(UnmanagedError(err)) = response.extensions().get::<UnmanagedError>() {
        let span = response
            .extensions()
            .get::<RequestContext>()
            .map_or_else(tracing::Span::none, RequestContext::span);
        let message = format!("{err:#}");
        span.in_scope(|| error!(error = %message, "Received unmanaged error"));
    }

    response
}
