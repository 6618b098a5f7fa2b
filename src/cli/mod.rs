//! CLI command implementations

mod config;
mod context;
mod parse;
mod rebase;
mod render;
pub mod style;

pub use config::{
    RepoEdit, run_init_config, run_profile_add, run_profile_update, run_repo_edit,
    run_repo_suggest,
};
pub use context::CommandContext;
pub use parse::{ParseOptions, run_parse};
pub use rebase::{AutoRebaseOptions, run_auto_rebase};

use indicatif::ProgressBar;
use prp::report::{ErrorSink, StderrSink};

/// Error sink that keeps messages from tearing through an active spinner
pub struct CliSink {
    spinner: Option<ProgressBar>,
}

impl CliSink {
    /// Sink that writes straight to stderr
    pub const fn plain() -> Self {
        Self { spinner: None }
    }

    /// Sink that suspends `spinner` while writing
    pub const fn with_spinner(spinner: ProgressBar) -> Self {
        Self {
            spinner: Some(spinner),
        }
    }

    fn emit(&self, write: impl FnOnce()) {
        match &self.spinner {
            Some(spinner) => spinner.suspend(write),
            None => write(),
        }
    }
}

impl ErrorSink for CliSink {
    fn error(&self, message: &str) {
        self.emit(|| StderrSink.error(message));
    }

    fn warning(&self, message: &str) {
        self.emit(|| StderrSink.warning(message));
    }
}
