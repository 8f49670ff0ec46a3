//! # Request Context
//!
//! Per-request attributes attached to every log entry written while the
//! request is handled.

use crate::constants::TRACE_ID_HEADER;
use axum::extract::{ConnectInfo, Request};
use std::net::SocketAddr;
use tracing::{info_span, Span};
use uuid::Uuid;

/// Request attributes carried by the `request` span and by request extensions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub method: String,
    pub local_addr: String,
    pub remote_addr: String,
    pub uri: String,
    pub trace_id: String,
    /// `true` when the caller sent no `X-Trace-ID` and one was generated
    pub generated_trace_id: bool,
}

impl RequestContext {
    /// Build the context of an incoming request
    ///
    /// The remote address comes from axum's [`ConnectInfo`]; it is empty when the
    /// router is driven without a connection (tests).
    pub fn from_request(request: &Request, local_addr: SocketAddr) -> Self {
        let remote_addr = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.to_string())
            .unwrap_or_default();

        let supplied = request
            .headers()
            .get(TRACE_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty());
        let (trace_id, generated_trace_id) = match supplied {
            Some(trace_id) => (trace_id.to_string(), false),
            None => (Uuid::new_v4().to_string(), true),
        };

        Self {
            method: request.method().to_string(),
            local_addr: local_addr.to_string(),
            remote_addr,
            uri: request.uri().to_string(),
            trace_id,
            generated_trace_id,
        }
    }

    /// Span whose fields are copied onto every entry logged inside it
    pub fn span(&self) -> Span {
        info_span!(
            "request",
            method = %self.method,
            localAddr = %self.local_addr,
            remoteAddr = %self.remote_addr,
            uri = %self.uri,
            trace_id = %self.trace_id,
        )
    }
}
