//! User-facing error channel
//!
//! Listing failures during aggregation, per-PR rebase failures and rebase
//! cleanup warnings are reported here rather than returned, so one failure
//! never hides the results of its siblings.

use anstream::eprintln;
use owo_colors::OwoColorize;

/// Receives errors and warnings as they happen
pub trait ErrorSink: Send + Sync {
    /// Report a failure
    fn error(&self, message: &str);

    /// Report a non-fatal problem
    fn warning(&self, message: &str);
}

/// Writes to stderr, coloured when the terminal supports it
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrSink;

impl ErrorSink for StderrSink {
    fn error(&self, message: &str) {
        eprintln!("{} {message}", "error:".red().bold());
    }

    fn warning(&self, message: &str) {
        eprintln!("{} {message}", "warning:".yellow().bold());
    }
}
