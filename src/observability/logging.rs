//! # Logging
//!
//! Tracing subscriber setup.
//!
//! Deployed profiles (`dev`, `stg`, `prd`) log one JSON object per line in the
//! shape Google Cloud Logging understands:
//!
//! ```json
//! {"msg":"access","severity":"INFO","timestamp":"2024-05-01T10:00:00.000Z","name":"access","caller":"src/server/middleware.rs:42","method":"GET"}
//! ```
//!
//! Other profiles get the human-readable formatter at debug level.
//!
//! `RUST_LOG` overrides the computed filter in every profile. Named loggers are
//! tracing targets (`main`, `access`, `closer`, `repository`).

use crate::config::AppEnv;
use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;
use tracing::field::{Field, Visit};
use tracing::{warn, Event, Level, Subscriber};
use tracing_subscriber::fmt::format::{JsonFields, Writer};
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields, FormattedFields};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoggingError {
    #[error("unsupported log level: {0:?}")]
    UnsupportedLevel(String),
}

/// Minimum severity written by the JSON formatter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Case-insensitive; the empty string means `info`
    ///
    /// # Errors
    ///
    /// [`LoggingError::UnsupportedLevel`] for anything but `debug`, `info`, `warn`, `error`.
    pub fn parse(value: &str) -> Result<Self, LoggingError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "" | "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(LoggingError::UnsupportedLevel(value.to_string())),
        }
    }

    pub fn as_filter_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// GCP structured JSON
    Json,
    /// Human-readable, debug level
    Development,
}

impl LogFormat {
    pub fn for_env(app_env: &AppEnv) -> Self {
        if app_env.is_cloud() {
            LogFormat::Json
        } else {
            LogFormat::Development
        }
    }
}

/// Install the global subscriber
///
/// A second call keeps the first subscriber and only logs a warning.
///
/// # Errors
///
/// [`LoggingError::UnsupportedLevel`] when `level` is not a known level.
pub fn init_logging(app_env: &AppEnv, level: &str) -> Result<LogFormat, LoggingError> {
    let level = LogLevel::parse(level)?;
    let format = LogFormat::for_env(app_env);
    let default_filter = match format {
        LogFormat::Json => level.as_filter_str(),
        LogFormat::Development => LogLevel::Debug.as_filter_str(),
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());

    let installed = match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .fmt_fields(JsonFields::new())
                    .event_format(GcpJsonFormat),
            )
            .try_init(),
        LogFormat::Development => tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_file(true)
                    .with_line_number(true),
            )
            .try_init(),
    };
    if let Err(e) = installed {
        warn!("Tracing subscriber already initialized: {}", e);
    }

    Ok(format)
}

/// Severity names used by Google Cloud Logging
pub fn gcp_severity(level: Level) -> &'static str {
    match level {
        Level::TRACE | Level::DEBUG => "DEBUG",
        Level::INFO => "INFO",
        Level::WARN => "WARNING",
        Level::ERROR => "ERROR",
    }
}

/// Event formatter writing one GCP-style JSON object per line
///
/// Span fields must be recorded with [`JsonFields`] to be included.
#[derive(Debug, Clone, Copy, Default)]
pub struct GcpJsonFormat;

impl<S, N> FormatEvent<S, N> for GcpJsonFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();

        let mut fields = Map::new();
        event.record(&mut JsonVisitor(&mut fields));
        let message = fields.remove("message").unwrap_or(Value::String(String::new()));

        let mut entry = Map::new();
        entry.insert("msg".into(), message);
        entry.insert("severity".into(), gcp_severity(*metadata.level()).into());
        entry.insert(
            "timestamp".into(),
            Utc::now()
                .to_rfc3339_opts(SecondsFormat::Millis, true)
                .into(),
        );
        entry.insert("name".into(), metadata.target().into());
        if let (Some(file), Some(line)) = (metadata.file(), metadata.line()) {
            entry.insert("caller".into(), format!("{file}:{line}").into());
        }

        if let Some(scope) = ctx.event_scope() {
            for span in scope.from_root() {
                let extensions = span.extensions();
                let Some(recorded) = extensions.get::<FormattedFields<N>>() else {
                    continue;
                };
                if let Ok(Value::Object(span_fields)) =
                    serde_json::from_str::<Value>(recorded.fields.as_str())
                {
                    entry.extend(span_fields);
                }
            }
        }
        entry.extend(fields);

        let line = serde_json::to_string(&entry).map_err(|_serialize_error| fmt::Error)?;
        writeln!(writer, "{line}")
    }
}

struct JsonVisitor<'a>(&'a mut Map<String, Value>);

impl Visit for JsonVisitor<'_> {
    fn record_f64(&mut self, field: &Field, value: f64) {
        self.0.insert(field.name().into(), value.into());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.0.insert(field.name().into(), value.into());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.0.insert(field.name().into(), value.into());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.0.insert(field.name().into(), value.into());
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().into(), value.into());
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.0.insert(field.name().into(), value.to_string().into());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.0
            .insert(field.name().into(), format!("{value:?}").into());
    }
}
