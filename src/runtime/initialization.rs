//! # Initialization
//!
//! Service startup and the serve/shutdown lifecycle.
//!
//! Startup order:
//! 1. `.env` and environment configuration
//! 2. Logging
//! 3. Metrics registration
//! 4. Closer registry and document store (connected and probed)
//! 5. Listener and router
//!
//! Every step failure is reported as `failed to init {name}` and is fatal.

use crate::config::{AppConfig, Env};
use crate::datastore::Datastore;
use crate::observability::{self, init_logging};
use crate::runtime::closer::CloserRegistry;
use crate::runtime::shutdown::{drain_within, termination_signal};
use crate::server::{build_router, start_server, AppState};
use anyhow::{Context, Result};
use axum::Router;
use retry::CancelSignal;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info};

/// Everything [`run`] needs, produced by [`initialize`]
#[derive(Debug)]
pub struct AppContext {
    pub config: AppConfig,
    pub closers: CloserRegistry,
    pub datastore: Arc<Datastore>,
    pub listener: TcpListener,
    pub router: Router,
    /// Fires on SIGINT/SIGTERM
    pub shutdown: CancelSignal,
}

/// Initialize the service
///
/// # Errors
///
/// The first failing step, with context `failed to init {name}`.
pub async fn initialize() -> Result<AppContext> {
    let dotenv = dotenvy::dotenv();

    let config = AppConfig::from_env(&Env::process()).context("failed to init config")?;
    let format =
        init_logging(&config.app_env, &config.log_level).context("failed to init logger")?;

    info!(
        target: "main",
        app_env = %config.app_env,
        log_format = ?format,
        "Starting partpicker-api v{}",
        env!("CARGO_PKG_VERSION")
    );
    match dotenv {
        Ok(path) => info!(target: "main", "Loaded environment from {}", path.display()),
        Err(e) => debug!(target: "main", "No .env file loaded: {}", e),
    }

    observability::metrics::register_metrics().context("failed to init metrics")?;

    // Termination during startup must interrupt the store probe
    let shutdown = CancelSignal::new();
    let on_signal = shutdown.clone();
    tokio::spawn(async move {
        termination_signal().await;
        on_signal.cancel();
    });

    let closers = CloserRegistry::new();
    let datastore = Arc::new(Datastore::new(closers.clone(), shutdown.child()));
    datastore
        .get_or_connect(&config.database)
        .await
        .context("failed to init MongoDB")?;

    let listener = TcpListener::bind(config.server.listen_address())
        .await
        .context("failed to init listener")?;
    let local_addr = listener.local_addr().context("failed to init listener")?;
    let router = build_router(AppState::new(local_addr));

    info!(target: "main", "Service initialized on {}", local_addr);

    Ok(AppContext {
        config,
        closers,
        datastore,
        listener,
        router,
        shutdown,
    })
}

/// Serve until a termination signal, then shut down
///
/// In-flight requests get the configured grace period, then every registered
/// closer is drained in reverse registration order.
///
/// # Errors
///
/// The server's error when it stops on its own or fails while draining.
pub async fn run(context: AppContext) -> Result<()> {
    let AppContext {
        config,
        closers,
        listener,
        router,
        shutdown,
        ..
    } = context;

    let stop = shutdown.token().clone().cancelled_owned();
    let mut server = tokio::spawn(start_server(listener, router, stop));

    let stopped_early = tokio::select! {
        cause = shutdown.cancelled() => {
            info!(target: "main", %cause, "Shutting down");
            None
        }
        joined = &mut server => Some(joined),
    };

    let served = match stopped_early {
        Some(joined) => joined
            .context("server task failed")
            .and_then(|served| served.context("server stopped unexpectedly")),
        None => drain_within(server, config.server.shutdown_grace())
            .await
            .map(|_drained| ()),
    };

    let failures = closers.drain().await;
    info!(target: "main", failures, "Shutdown complete");

    served
}
