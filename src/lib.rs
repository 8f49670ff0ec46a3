//! Part Picker API Library
//!
//! HTTP API scaffold for the part-picker bot calendar service: environment
//! configuration, structured logging, the managed error envelope, the document
//! store bootstrap and the router that vendor bots are mounted on.
//!
//! Retries use the workspace `retry` crate.

pub mod config;
pub mod constants;
pub mod datastore;
pub mod error;
pub mod observability;
pub mod runtime;
pub mod server;

pub use error::{AppError, ErrCode, ManagedError};
