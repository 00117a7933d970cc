use std::fmt;

use tracing_subscriber::EnvFilter;

use crate::error::ConfigError;

/// Request-scoped logger.
///
/// `RequestLog` is obtained from `RequestContext::log()` and borrows the
/// context, so it cannot outlive the request it describes.
///
/// Secret values are redacted when logged due to their `Debug` and
/// `Display` implementations.
///
/// All log messages include the request ID as a structured field.
#[derive(Debug, Clone, Copy)]
pub struct RequestLog<'a> {
    request_id: &'a str,
}

impl<'a> RequestLog<'a> {
    /// Creates a logger for a request ID.
    ///
    /// This is `pub(crate)` - only `RequestContext` can create it.
    pub(crate) fn new(request_id: &'a str) -> Self {
        Self { request_id }
    }

    /// Returns the request ID associated with this logger.
    pub fn request_id(&self) -> &str {
        self.request_id
    }

    /// Logs an info-level message with request ID.
    ///
    /// Use with `format_args!` for efficient formatting:
    /// ```
    /// # use request_guard::{web::RequestContext, Secret};
    /// let ctx = RequestContext::new("req-1");
    /// let key = Secret::new("password");
    /// ctx.log().info(format_args!("checking with key: {:?}", key));
    /// ```
    pub fn info(&self, args: fmt::Arguments<'_>) {
        tracing::info!(request_id = %self.request_id, "{}", args);
    }

    /// Logs a warning-level message with request ID.
    pub fn warn(&self, args: fmt::Arguments<'_>) {
        tracing::warn!(request_id = %self.request_id, "{}", args);
    }

    /// Logs an error-level message with request ID.
    pub fn error(&self, args: fmt::Arguments<'_>) {
        tracing::error!(request_id = %self.request_id, "{}", args);
    }

    /// Logs a debug-level message with request ID.
    pub fn debug(&self, args: fmt::Arguments<'_>) {
        tracing::debug!(request_id = %self.request_id, "{}", args);
    }
}

/// Installs a formatted `tracing` subscriber filtered by `filter`
/// (e.g. `"info"` or `"request_guard=debug"`).
///
/// # Errors
///
/// Returns `ConfigError::Logging` if the directive is invalid or a global
/// subscriber is already installed.
pub fn init_tracing(filter: &str) -> Result<(), ConfigError> {
    let filter = EnvFilter::try_new(filter).map_err(|e| ConfigError::Logging(e.to_string()))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| ConfigError::Logging(e.to_string()))
}
