//! # Part Picker API
//!
//! HTTP API for the part-picker bot calendar service.
//!
//! ## Overview
//!
//! 1. **Configuration** - Reads `APP_ENV`, `LOG_LEVEL`, `DB_*`, `BIND_ADDRESS`, `PORT`
//!    and `SHUTDOWN_GRACE_SECS` (a `.env` file is loaded first when present)
//! 2. **Document store** - Connects to MongoDB and probes it with retry before serving
//! 3. **HTTP** - Serves `/`, `/metrics` and the `/v1` vendor bot routes
//! 4. **Shutdown** - On SIGINT/SIGTERM, lets in-flight requests finish within the
//!    grace period, then closes registered resources in reverse order

use anyhow::Result;
use partpicker_api::runtime::{initialize, run};
use tracing::error;

#[tokio::main]
async fn main() -> Result<()> {
    let context = match initialize().await {
        Ok(context) => context,
        Err(e) => {
            error!(target: "main", "{:#}", e);
            return Err(e);
        }
    };

    run(context).await
}
