//! # HTTP Server
//!
//! Router construction and serving.
//!
//! ## Routes
//!
//! - `GET /` - liveness, empty 200
//! - `GET /metrics` - Prometheus metrics
//! - `/v1` - vendor bot routes, see [`bot`]
//!
//! Anything else is a 404.

pub mod bot;
pub mod handlers;
pub mod middleware;

pub use bot::{install_bot, Bot, BotRequest, RouteParams};

use axum::routing::get;
use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared server state
#[derive(Clone)]
pub struct AppState {
    /// Address the listener is bound to
    pub local_addr: SocketAddr,
    /// Installed vendor bots
    pub bots: Vec<Arc<dyn Bot>>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("local_addr", &self.local_addr)
            .field(
                "bots",
                &self.bots.iter().map(|bot| bot.bot_type()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl AppState {
    pub fn new(local_addr: SocketAddr) -> Self {
        Self {
            local_addr,
            bots: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_bot(mut self, bot: Arc<dyn Bot>) -> Self {
        self.bots.push(bot);
        self
    }
}

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/", get(handlers::root))
        .route("/metrics", get(handlers::metrics));

    if !state.bots.is_empty() {
        let v1 = state
            .bots
            .iter()
            .cloned()
            .fold(Router::new(), install_bot);
        router = router.nest("/v1", v1);
    }

    router
        .fallback(handlers::not_found)
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn(middleware::translate_errors))
                .layer(axum::middleware::from_fn_with_state(
                    state.clone(),
                    middleware::access_log,
                ))
                .layer(TraceLayer::new_for_http()),
        )
        .with_state(state)
}

/// Serve `router` on `listener` until `shutdown` resolves
///
/// In-flight requests are allowed to finish after `shutdown` resolves.
///
/// # Errors
///
/// I/O errors of the listener.
pub async fn start_server<F>(listener: TcpListener, router: Router, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    info!(target: "main", "Listening on {}", addr);

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
}
