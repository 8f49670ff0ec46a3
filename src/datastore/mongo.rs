//! # MongoDB Client
//!
//! Client factory for the document store.

use super::{ClientError, StoreClient, StoreError};
use crate::config::DatabaseConfig;
use async_trait::async_trait;
use mongodb::bson::doc;
use mongodb::options::{ClientOptions, Credential, ReadPreference, SelectionCriteria};
use mongodb::{Client, Database};
use tracing::debug;

/// Connection to one database of a MongoDB deployment
#[derive(Debug, Clone)]
pub struct MongoStore {
    client: Client,
    database: String,
}

impl MongoStore {
    /// Build a client for `config`
    ///
    /// The local profile connects without credentials. Remote deployments read
    /// from the primary and authenticate against the configured database.
    /// No I/O happens here; use [`StoreClient::ping`] to check liveness.
    ///
    /// # Errors
    ///
    /// [`StoreError::Connect`] when the URI or options are invalid.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let mut options = ClientOptions::parse(config.uri())
            .await
            .map_err(StoreError::Connect)?;

        if let DatabaseConfig::Remote {
            username,
            password,
            name,
            ..
        } = config
        {
            options.selection_criteria = Some(SelectionCriteria::ReadPreference(
                ReadPreference::Primary,
            ));
            options.credential = Some(
                Credential::builder()
                    .username(username.clone())
                    .password(password.clone())
                    .source(name.clone())
                    .build(),
            );
        }

        let client = Client::with_options(options).map_err(StoreError::Connect)?;
        debug!(target: "repository", database = config.name(), "document store client created");

        Ok(Self {
            client,
            database: config.name().to_string(),
        })
    }

    pub fn database(&self) -> Database {
        self.client.database(&self.database)
    }
}

#[async_trait]
impl StoreClient for MongoStore {
    fn database_name(&self) -> &str {
        &self.database
    }

    async fn ping(&self) -> Result<(), ClientError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await?;
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), ClientError> {
        self.client.clone().shutdown().await;
        Ok(())
    }
}
