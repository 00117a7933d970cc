//! Sinks for errors that are soft-failed instead of propagated.

use std::cell::RefCell;
use std::error::Error as StdError;

/// Receives errors that the guard swallowed on the caller's behalf.
///
/// Decode failures and store outages during optional checks are turned
/// into denials or "unknown" results; the underlying error is handed here
/// so the application can still record it.
pub trait ErrorReporter {
    /// Records an error. Must not panic.
    fn report(&self, error: &dyn StdError);
}

/// Reports errors as `tracing` events at `error` level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&self, error: &dyn StdError) {
        match error.source() {
            Some(source) => {
                tracing::error!(error = %error, source = %source, "request guard error")
            }
            None => tracing::error!(error = %error, "request guard error"),
        }
    }
}

/// Keeps reported errors in memory, in report order.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    messages: RefCell<Vec<String>>,
}

impl RecordingReporter {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the display strings of all reported errors.
    pub fn messages(&self) -> Vec<String> {
        self.messages.borrow().clone()
    }

    /// Returns the number of reported errors.
    pub fn len(&self) -> usize {
        self.messages.borrow().len()
    }

    /// Returns `true` if nothing was reported.
    pub fn is_empty(&self) -> bool {
        self.messages.borrow().is_empty()
    }
}

impl ErrorReporter for RecordingReporter {
    fn report(&self, error: &dyn StdError) {
        self.messages.borrow_mut().push(error.to_string());
    }
}
