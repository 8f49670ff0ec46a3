//! # Constants
//!
//! Environment variable names and default values shared across the service.

// Environment variable names
pub const ENV_APP_ENV: &str = "APP_ENV";
pub const ENV_LOG_LEVEL: &str = "LOG_LEVEL";
pub const ENV_DB_URI: &str = "DB_URI";
pub const ENV_DB_USERNAME: &str = "DB_USERNAME";
pub const ENV_DB_PASSWORD: &str = "DB_PASSWORD";
pub const ENV_DB_NAME: &str = "DB_NAME";
pub const ENV_BIND_ADDRESS: &str = "BIND_ADDRESS";
pub const ENV_PORT: &str = "PORT";
pub const ENV_SHUTDOWN_GRACE_SECS: &str = "SHUTDOWN_GRACE_SECS";

/// Profile assumed when `APP_ENV` is not set
pub const DEFAULT_APP_ENV: &str = "test";

/// Default server bind address
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";

/// Default server port
pub const DEFAULT_PORT: u16 = 8080;

/// Default time in-flight requests get to finish after a termination signal
pub const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 3;

/// Document store used by the `test` profile
pub const LOCAL_DB_URI: &str = "mongodb://localhost:27017";
pub const LOCAL_DB_NAME: &str = "test";

/// Request header carrying the caller's trace id
pub const TRACE_ID_HEADER: &str = "x-trace-id";

/// Closer key of the document store connection
pub const STORE_CLOSER_KEY: &str = "MongoDB connection";
