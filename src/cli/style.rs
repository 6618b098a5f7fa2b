//! Terminal styling helpers
//!
//! Output goes through `anstream`, which strips these escapes when stdout
//! is not a terminal.

use indicatif::ProgressStyle;
use owo_colors::{OwoColorize, Style, Styled};

/// Check mark used in summaries
pub const CHECK: &str = "\u{2713}";

/// Semantic styles for CLI output
pub trait Stylize: OwoColorize + Sized {
    /// De-emphasised text
    fn muted(&self) -> Styled<&Self> {
        self.style(Style::new().dimmed())
    }

    /// Headings
    fn emphasis(&self) -> Styled<&Self> {
        self.style(Style::new().bold())
    }

    /// Names and counts worth noticing
    fn accent(&self) -> Styled<&Self> {
        self.style(Style::new().cyan())
    }

    /// Good outcome
    fn success(&self) -> Styled<&Self> {
        self.style(Style::new().green())
    }
}

impl<T: std::fmt::Display> Stylize for T {}

/// Green check mark
pub fn check() -> Styled<&'static str> {
    Style::new().green().style(CHECK)
}

/// Bullet arrow for lists
pub fn arrow() -> Styled<&'static str> {
    Style::new().dimmed().style("\u{2192}")
}

/// Spinner shown while talking to GitHub
pub fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}
