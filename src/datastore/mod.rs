//! # Datastore
//!
//! Document store bootstrap: client creation, liveness probe with retry, and
//! the process-wide client cache.
//!
//! The first call to [`Datastore::get_or_connect`] creates the client, probes it
//! with the default retry profile and registers its shutdown with the
//! [`CloserRegistry`]. Later calls return the cached client.

mod mongo;

pub use mongo::MongoStore;

use crate::config::DatabaseConfig;
use crate::constants::STORE_CLOSER_KEY;
use crate::observability::metrics::{increment_store_ping_attempts, increment_store_ping_failures};
use crate::runtime::closer::{Closer, CloserError, CloserRegistry};
use async_trait::async_trait;
use mongodb::bson::{doc, Document};
use retry::{CancelSignal, ErrorObserver, RetryError, RetryOption, Retrier};
use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{info, warn};

/// Failure reported by a store client
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Driver(#[from] mongodb::error::Error),
    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to create document store client: {0}")]
    Connect(#[source] mongodb::error::Error),

    #[error("document store is unreachable: {0}")]
    Unreachable(#[source] RetryError<ClientError>),

    #[error("invalid probe retry configuration: {0}")]
    Retry(#[from] retry::ConfigError),

    #[error(transparent)]
    Closer(#[from] CloserError),
}

/// Handle on a document store deployment
#[async_trait]
pub trait StoreClient: Send + Sync {
    fn database_name(&self) -> &str;

    /// Round trip to the server
    async fn ping(&self) -> Result<(), ClientError>;

    /// Release connections
    async fn shutdown(&self) -> Result<(), ClientError>;
}

/// Probe `client` until it answers, using the default retry profile
///
/// Every failed ping is logged on the `repository` target with its try count.
///
/// # Errors
///
/// [`StoreError::Unreachable`] wrapping the terminal retry error.
pub async fn ping_store(client: &dyn StoreClient, signal: &CancelSignal) -> Result<(), StoreError> {
    ping_store_with(client, signal, Vec::new()).await
}

/// [`ping_store`] with extra retry options applied on top of the default profile
///
/// An error observer among `options` is called after the built-in failure logging.
///
/// # Errors
///
/// [`StoreError::Retry`] for an invalid option, otherwise as [`ping_store`].
pub async fn ping_store_with(
    client: &dyn StoreClient,
    signal: &CancelSignal,
    options: Vec<RetryOption<ClientError>>,
) -> Result<(), StoreError> {
    // Caller observers are chained after the failure logging
    let mut caller_observer: Option<ErrorObserver<ClientError>> = None;
    let mut builder = Retrier::builder();
    for option in options {
        match option {
            RetryOption::ErrorObserver(Some(observer)) => caller_observer = Some(observer),
            other => builder = builder.option(other),
        }
    }

    let tries = Arc::new(AtomicU32::new(0));
    let observed = Arc::clone(&tries);
    let retrier = builder
        .error_observer(move |e: &ClientError| {
            let count = observed.fetch_add(1, Ordering::Relaxed) + 1;
            increment_store_ping_failures();
            warn!(target: "repository", error = %e, "failed to ping to database, try count {}", count);
            if let Some(observer) = &caller_observer {
                observer(e);
            }
        })
        .build()?;

    retrier
        .run(signal, |_signal| async move {
            increment_store_ping_attempts();
            client.ping().await
        })
        .await
        .map_err(StoreError::Unreachable)?;

    info!(
        target: "repository",
        database = client.database_name(),
        tries = tries.load(Ordering::Relaxed) + 1,
        "document store is reachable"
    );
    Ok(())
}

/// Base query filter
///
/// With `ignore_deleted` the soft-delete marker is ignored and every document
/// matches. Otherwise documents carrying a non-null `deleted_at` are excluded.
pub fn soft_delete_filter(ignore_deleted: bool) -> Document {
    if ignore_deleted {
        Document::new()
    } else {
        doc! {
            "$or": [
                { "deleted_at": { "$exists": false } },
                { "deleted_at": null },
            ]
        }
    }
}

struct StoreCloser(Arc<dyn StoreClient>);

#[async_trait]
impl Closer for StoreCloser {
    async fn close(&self) -> anyhow::Result<()> {
        self.0.shutdown().await?;
        Ok(())
    }
}

/// Process-wide store client cache
pub struct Datastore {
    client: OnceCell<Arc<dyn StoreClient>>,
    closers: CloserRegistry,
    signal: CancelSignal,
}

impl std::fmt::Debug for Datastore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Datastore")
            .field("connected", &self.client.initialized())
            .finish_non_exhaustive()
    }
}

impl Datastore {
    /// `signal` aborts the liveness probe, e.g. on a termination signal
    pub fn new(closers: CloserRegistry, signal: CancelSignal) -> Self {
        Self {
            client: OnceCell::new(),
            closers,
            signal,
        }
    }

    /// The MongoDB client for `config`, created and probed on first use
    ///
    /// # Errors
    ///
    /// Any [`StoreError`] raised while connecting, probing or registering the closer.
    pub async fn get_or_connect(
        &self,
        config: &DatabaseConfig,
    ) -> Result<Arc<dyn StoreClient>, StoreError> {
        self.get_or_init_with(|| async {
            let store = MongoStore::connect(config).await?;
            Ok(Arc::new(store) as Arc<dyn StoreClient>)
        })
        .await
    }

    /// Like [`Datastore::get_or_connect`] with a custom client factory
    ///
    /// # Errors
    ///
    /// Errors of `connect`, of the probe, or of closer registration.
    pub async fn get_or_init_with<F, Fut>(
        &self,
        connect: F,
    ) -> Result<Arc<dyn StoreClient>, StoreError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Arc<dyn StoreClient>, StoreError>>,
    {
        self.client
            .get_or_try_init(|| async {
                let client = connect().await?;
                if let Err(err) = self.probe_and_register(&client).await {
                    // Not registered with the closers
                    if let Err(e) = client.shutdown().await {
                        warn!(target: "repository", error = %e, "failed to shut down document store client");
                    }
                    return Err(err);
                }
                Ok::<_, StoreError>(client)
            })
            .await
            .cloned()
    }

    async fn probe_and_register(&self, client: &Arc<dyn StoreClient>) -> Result<(), StoreError> {
        ping_store(client.as_ref(), &self.signal).await?;
        self.closers
            .register(STORE_CLOSER_KEY, Arc::new(StoreCloser(Arc::clone(client))))
            .await?;
        Ok(())
    }

    pub fn get(&self) -> Option<Arc<dyn StoreClient>> {
        self.client.get().cloned()
    }
}
