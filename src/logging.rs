//! # Structured Logging Module
//!
//! Environment-aware structured logging that outputs to both console and files,
//! plus the event logger the reconciler reports business and fatal events to.

use crate::constants::{LogEventType, LogLevel};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::process;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging with environment-specific configuration
pub fn init_structured_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let log_level = get_log_level(&environment);

        let log_dir = PathBuf::from("log");
        if let Err(e) = fs::create_dir_all(&log_dir) {
            eprintln!("Failed to create log directory {}: {e}", log_dir.display());
        }

        let pid = process::id();
        let timestamp = Utc::now().format("%Y%m%d_%H%M%S").to_string();
        let log_filename = format!("{environment}.{pid}.{timestamp}.log");
        let log_path = log_dir.join(&log_filename);

        let file_appender = tracing_appender::rolling::never(&log_dir, log_filename);
        let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

        let subscriber = tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_level(true)
                    .with_ansi(true)
                    .with_filter(EnvFilter::new(log_level.clone())),
            )
            .with(
                fmt::layer()
                    .with_writer(file_writer)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_level(true)
                    .with_ansi(false)
                    .json()
                    .with_filter(EnvFilter::new(log_level)),
            );

        if subscriber.try_init().is_err() {
            tracing::debug!("Global tracing subscriber already initialized, keeping it");
        }

        tracing::info!(
            pid = pid,
            environment = %environment,
            log_file = %log_path.display(),
            "Structured logging initialized with file output"
        );

        // The writer flushes on drop; keep it for the life of the process.
        std::mem::forget(guard);
    });
}

/// Get current environment from environment variables
pub fn get_environment() -> String {
    std::env::var("RECONCILER_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

/// Get log level based on environment
fn get_log_level(environment: &str) -> String {
    if let Ok(filter) = std::env::var("RUST_LOG") {
        return filter;
    }
    match environment {
        "production" => "info".to_string(),
        _ => "debug".to_string(),
    }
}

/// A business or run-level event reported by the reconciler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEvent {
    pub event_type: LogEventType,
    pub level: LogLevel,
    pub message: String,
    pub cause: Option<String>,
    pub order_id: Option<i64>,
    pub event_time: DateTime<Utc>,
}

impl LogEvent {
    pub fn new(event_type: LogEventType, level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            event_type,
            level,
            message: message.into(),
            cause: None,
            order_id: None,
            event_time: Utc::now(),
        }
    }

    pub fn with_cause(mut self, cause: impl std::fmt::Display) -> Self {
        self.cause = Some(cause.to_string());
        self
    }

    pub fn with_order(mut self, order_id: i64) -> Self {
        self.order_id = Some(order_id);
        self
    }

    pub fn at(mut self, event_time: DateTime<Utc>) -> Self {
        self.event_time = event_time;
        self
    }
}

/// Sink for reconciler events.
///
/// Delivery is best effort: implementations must not fail back into the
/// caller and must not require the caller to wait.
pub trait EventLogger: Send + Sync {
    fn log_event(&self, event: LogEvent);
}

/// Forwards events to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventLogger;

impl EventLogger for TracingEventLogger {
    fn log_event(&self, event: LogEvent) {
        emit_to_tracing(&event);
    }
}

pub(crate) fn emit_to_tracing(event: &LogEvent) {
    let event_type = event.event_type.as_str();
    let cause = event.cause.as_deref();
    match event.level {
        LogLevel::Debug => tracing::debug!(
            event_type,
            order_id = event.order_id,
            cause,
            "{}",
            event.message
        ),
        LogLevel::Info => tracing::info!(
            event_type,
            order_id = event.order_id,
            cause,
            "{}",
            event.message
        ),
        LogLevel::Warning => tracing::warn!(
            event_type,
            order_id = event.order_id,
            cause,
            "{}",
            event.message
        ),
        LogLevel::Error => tracing::error!(
            event_type,
            order_id = event.order_id,
            cause,
            "{}",
            event.message
        ),
        LogLevel::Fatal => tracing::error!(
            event_type,
            order_id = event.order_id,
            cause,
            fatal = true,
            "{}",
            event.message
        ),
    }
}
