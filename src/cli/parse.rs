//! Parse command - report open pull requests across tracked repos

use crate::cli::CliSink;
use crate::cli::context::CommandContext;
use crate::cli::render::{render_table, sort_records};
use crate::cli::style::{Stylize, spinner_style};
use anstream::{print, println};
use indicatif::ProgressBar;
use prp::aggregate::{AggregateOptions, Aggregator};
use prp::cancel::CancelToken;
use prp::error::{Error, Result};
use prp::filter::RecordFilter;
use prp::types::RepoRef;
use std::sync::Arc;
use std::time::Duration;

/// Options for the parse command
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// Only PRs authored by this login
    pub owner: Option<String>,
    /// Only PRs in these repositories
    pub repos: Vec<RepoRef>,
    /// Only PRs behind their target branch
    pub need_rebase: bool,
    /// Full titles and label names
    pub wide: bool,
    /// JSON instead of a table
    pub json: bool,
    /// Keep filtered-out PRs, dimmed
    pub show_hidden: bool,
}

/// Run the parse command
pub async fn run_parse(
    ctx: &CommandContext,
    options: ParseOptions,
    cancel: CancelToken,
) -> Result<()> {
    let profile = ctx.profile()?;
    if profile.tracked_repos.is_empty() {
        println!(
            "{}",
            "No repositories tracked. Add one with 'prp repo add <owner> <name>'.".muted()
        );
        return Ok(());
    }

    let platform = ctx.platform().await?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(spinner_style());
    spinner.set_message(format!(
        "Fetching pull requests from {} repositories...",
        profile.tracked_repos.len().accent()
    ));
    spinner.enable_steady_tick(Duration::from_millis(80));

    let viewer = platform.get_viewer().await?;

    let limits = ctx.config.limits;
    let aggregator = Aggregator::new(
        platform,
        Arc::new(CliSink::with_spinner(spinner.clone())),
        AggregateOptions {
            max_concurrent_requests: limits.max_concurrent_requests,
            request_timeout: limits.request_timeout(),
        },
        cancel.clone(),
    );

    let filter = RecordFilter {
        owner: options.owner,
        repos: options.repos,
        needs_rebase: options.need_rebase,
    };

    let stream = aggregator.aggregate(profile.tracked_repos.clone(), viewer);
    let mut stream = if options.show_hidden {
        filter.mark(stream)
    } else {
        filter.filter(stream)
    };

    let mut records = Vec::new();
    while let Some(record) = stream.recv().await {
        records.push(record);
    }
    spinner.finish_and_clear();

    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }

    sort_records(&mut records);

    if options.json {
        let json = serde_json::to_string_pretty(&records)
            .map_err(|e| Error::Internal(format!("failed to serialize records: {e}")))?;
        println!("{json}");
        return Ok(());
    }

    if records.is_empty() {
        println!("{}", "No open pull requests".muted());
        return Ok(());
    }

    print!("{}", render_table(&records, options.wide, true));
    Ok(())
}
