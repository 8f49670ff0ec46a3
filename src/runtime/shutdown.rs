//! # Shutdown
//!
//! Termination signal handling and the bounded grace period for in-flight requests.

use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Resolves on SIGINT (Ctrl-C) or, on Unix, SIGTERM
pub async fn termination_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(target: "main", "Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(target: "main", "Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!(target: "main", "Received SIGINT"),
        () = terminate => info!(target: "main", "Received SIGTERM"),
    }
}

/// How a served task ended once shutdown started
#[derive(Debug, PartialEq, Eq)]
pub enum Drained {
    /// The task finished within the grace period
    Completed,
    /// The grace period elapsed first; the task was aborted
    Aborted,
}

/// Wait at most `grace` for `task` to finish, aborting it afterwards
///
/// # Errors
///
/// The task's own error, or a join error if it panicked.
pub async fn drain_within<E>(
    task: JoinHandle<Result<(), E>>,
    grace: Duration,
) -> anyhow::Result<Drained>
where
    E: std::error::Error + Send + Sync + 'static,
{
    let abort = task.abort_handle();
    match tokio::time::timeout(grace, task).await {
        Ok(joined) => {
            joined??;
            Ok(Drained::Completed)
        }
        Err(_elapsed) => {
            warn!(
                target: "main",
                "In-flight requests did not finish within {:?}, aborting",
                grace
            );
            abort.abort();
            Ok(Drained::Aborted)
        }
    }
}
