//! Logging Setup
//!
//! `TigerStyle`: Opt-in subscriber installation with graceful failure. Never
//! panics when a global subscriber already exists.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use vecbridge::telemetry::{init_logging, LogFormat, LoggingConfig};
//!
//! // Defaults: RUST_LOG or "info", pretty output on stderr
//! init_logging(&LoggingConfig::default()).expect("logging init");
//!
//! // Or configure explicitly
//! let config = LoggingConfig::builder()
//!     .service_name("ingest-worker")
//!     .filter("vecbridge=debug,info")
//!     .format(LogFormat::Json)
//!     .build();
//! ```
//!
//! ## Environment Variables
//!
//! - `RUST_LOG` - Filter directives (default: "info")

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use thiserror::Error;
use tracing::Subscriber;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

/// Filter used when neither the config nor `RUST_LOG` sets one.
pub const LOG_FILTER_DEFAULT: &str = "info";

/// Logging setup errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// Filter directives did not parse
    #[error("invalid log filter '{filter}': {reason}")]
    InvalidFilter {
        /// The rejected directives
        filter: String,
        /// Parser message
        reason: String,
    },

    /// Log file could not be opened
    #[error("cannot open log file {path}: {source}")]
    LogFile {
        /// Requested path
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// A global subscriber is already installed
    #[error("logging initialization failed: {reason}")]
    InitFailed {
        /// The reason for the failure
        reason: String,
    },
}

/// Result type for logging setup
pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Output layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Multi-line, human oriented
    #[default]
    Pretty,
    /// Single-line
    Compact,
    /// Newline-delimited JSON
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Recorded on the startup event
    pub service_name: String,
    /// `EnvFilter` directives
    pub filter: String,
    /// Output layout
    pub format: LogFormat,
    /// Colored output (ignored for files)
    pub ansi: bool,
    /// Append to this file instead of stderr
    pub log_file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            service_name: "vecbridge".to_string(),
            filter: std::env::var("RUST_LOG")
                .ok()
                .filter(|f| !f.trim().is_empty())
                .unwrap_or_else(|| LOG_FILTER_DEFAULT.to_string()),
            format: LogFormat::default(),
            ansi: true,
            log_file: None,
        }
    }
}

impl LoggingConfig {
    /// Create a new builder for `LoggingConfig`
    #[must_use]
    pub fn builder() -> LoggingConfigBuilder {
        LoggingConfigBuilder::default()
    }

    fn env_filter(&self) -> Result<EnvFilter> {
        EnvFilter::try_new(&self.filter).map_err(|e| TelemetryError::InvalidFilter {
            filter: self.filter.clone(),
            reason: e.to_string(),
        })
    }

    fn writer(&self) -> Result<BoxMakeWriter> {
        let Some(path) = &self.log_file else {
            return Ok(BoxMakeWriter::new(std::io::stderr));
        };
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| TelemetryError::LogFile {
                path: path.clone(),
                source,
            })?;
        Ok(BoxMakeWriter::new(Mutex::new(file)))
    }
}

/// Builder for `LoggingConfig`
#[derive(Default)]
pub struct LoggingConfigBuilder {
    service_name: Option<String>,
    filter: Option<String>,
    format: Option<LogFormat>,
    ansi: Option<bool>,
    log_file: Option<PathBuf>,
}

impl LoggingConfigBuilder {
    /// Set the service name
    #[must_use]
    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = Some(name.into());
        self
    }

    /// Set the filter directives
    #[must_use]
    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Set the output layout
    #[must_use]
    pub fn format(mut self, format: LogFormat) -> Self {
        self.format = Some(format);
        self
    }

    /// Enable or disable colors
    #[must_use]
    pub fn ansi(mut self, ansi: bool) -> Self {
        self.ansi = Some(ansi);
        self
    }

    /// Write to a file
    #[must_use]
    pub fn log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }

    /// Build the `LoggingConfig`
    #[must_use]
    pub fn build(self) -> LoggingConfig {
        let default = LoggingConfig::default();
        LoggingConfig {
            service_name: self.service_name.unwrap_or(default.service_name),
            filter: self.filter.unwrap_or(default.filter),
            format: self.format.unwrap_or(default.format),
            ansi: self.ansi.unwrap_or(default.ansi),
            log_file: self.log_file.or(default.log_file),
        }
    }
}

/// Build a `fmt` subscriber for `config` without installing it.
///
/// # Errors
///
/// Returns `InvalidFilter` or `LogFile` when the config cannot be realised.
pub fn build_subscriber(config: &LoggingConfig) -> Result<Box<dyn Subscriber + Send + Sync>> {
    let filter = config.env_filter()?;
    let writer = config.writer()?;
    let ansi = config.ansi && config.log_file.is_none();

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(ansi)
        .with_target(true);

    let subscriber: Box<dyn Subscriber + Send + Sync> = match config.format {
        LogFormat::Pretty => Box::new(builder.pretty().finish()),
        LogFormat::Compact => Box::new(builder.compact().finish()),
        LogFormat::Json => Box::new(builder.json().finish()),
    };
    Ok(subscriber)
}

/// Install the subscriber for `config` as the global default.
///
/// # Errors
///
/// Returns `InitFailed` if a global subscriber is already set, or any error
/// from [`build_subscriber`].
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let subscriber = build_subscriber(config)?;
    tracing::subscriber::set_global_default(subscriber).map_err(|e| {
        TelemetryError::InitFailed {
            reason: format!("failed to set global subscriber: {e}"),
        }
    })?;

    tracing::info!(
        service_name = %config.service_name,
        filter = %config.filter,
        "logging initialized"
    );
    Ok(())
}
