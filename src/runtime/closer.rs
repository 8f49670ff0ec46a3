//! # Closer Registry
//!
//! Resources that must be released at shutdown register a [`Closer`] under a
//! unique key. At shutdown the registry is drained once, closing resources in
//! reverse registration order.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{error, info};

/// A resource released at shutdown
#[async_trait]
pub trait Closer: Send + Sync {
    async fn close(&self) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CloserError {
    #[error("closer {0:?} is already registered")]
    Duplicate(String),
}

/// Ordered set of closers, shared by every component that owns a resource
#[derive(Default, Clone)]
pub struct CloserRegistry {
    entries: Arc<Mutex<Vec<(String, Arc<dyn Closer>)>>>,
}

impl std::fmt::Debug for CloserRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloserRegistry").finish_non_exhaustive()
    }
}

impl CloserRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    ///
    /// [`CloserError::Duplicate`] when `key` is already taken.
    pub async fn register(
        &self,
        key: impl Into<String>,
        closer: Arc<dyn Closer>,
    ) -> Result<(), CloserError> {
        let key = key.into();
        let mut entries = self.entries.lock().await;
        if entries.iter().any(|(existing, _)| *existing == key) {
            return Err(CloserError::Duplicate(key));
        }
        info!(target: "closer", "{} closer is registered", key);
        entries.push((key, closer));
        Ok(())
    }

    /// Registered keys, in registration order
    pub async fn keys(&self) -> Vec<String> {
        self.entries
            .lock()
            .await
            .iter()
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Close everything in reverse registration order and empty the registry
    ///
    /// Failures are logged and do not stop the drain. Returns the number of failures.
    pub async fn drain(&self) -> usize {
        let entries = std::mem::take(&mut *self.entries.lock().await);
        let mut failures = 0;
        for (key, closer) in entries.into_iter().rev() {
            match closer.close().await {
                Ok(()) => info!(target: "closer", "{} closed", key),
                Err(e) => {
                    failures += 1;
                    error!(target: "closer", error = %e, "failed to close {}", key);
                }
            }
        }
        failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    struct Recording {
        name: &'static str,
        log: Arc<StdMutex<Vec<&'static str>>>,
        fail: bool,
    }

    #[async_trait]
    impl Closer for Recording {
        async fn close(&self) -> anyhow::Result<()> {
            self.log.lock().unwrap().push(self.name);
            if self.fail {
                anyhow::bail!("{} refused to close", self.name);
            }
            Ok(())
        }
    }

    fn recording(
        name: &'static str,
        log: &Arc<StdMutex<Vec<&'static str>>>,
        fail: bool,
    ) -> Arc<dyn Closer> {
        Arc::new(Recording {
            name,
            log: Arc::clone(log),
            fail,
        })
    }

    #[tokio::test]
    async fn test_drain_runs_in_reverse_order() {
        let log = Arc::new(StdMutex::new(Vec::new()));
        let registry = CloserRegistry::new();
        registry.register("first", recording("first", &log, false)).await.unwrap();
        registry.register("second", recording("second", &log, true)).await.unwrap();
        registry.register("third", recording("third", &log, false)).await.unwrap();
        assert_eq!(registry.keys().await, ["first", "second", "third"]);

        let failures = registry.drain().await;

        assert_eq!(failures, 1);
        assert_eq!(*log.lock().unwrap(), ["third", "second", "first"]);
        assert!(registry.keys().await.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_key_is_rejected() {
        let log = Arc::new(StdMutex::new(Vec::new()));
        let registry = CloserRegistry::new();
        registry.register("db", recording("a", &log, false)).await.unwrap();

        let err = registry
            .register("db", recording("b", &log, false))
            .await
            .unwrap_err();
        assert_eq!(err, CloserError::Duplicate("db".into()));
        assert_eq!(registry.keys().await, ["db"]);
    }

    #[tokio::test]
    async fn test_clones_share_entries() {
        let log = Arc::new(StdMutex::new(Vec::new()));
        let registry = CloserRegistry::new();
        let handle = registry.clone();
        handle.register("db", recording("db", &log, false)).await.unwrap();

        assert_eq!(registry.drain().await, 0);
        assert_eq!(*log.lock().unwrap(), ["db"]);
    }
}
