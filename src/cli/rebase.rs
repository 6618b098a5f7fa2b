//! Auto-rebase command - rebase your own pull requests in their local clones

use crate::cli::CliSink;
use crate::cli::context::CommandContext;
use crate::cli::render::sort_records;
use crate::cli::style::{CHECK, Stylize, arrow, spinner_style};
use anstream::println;
use dialoguer::Confirm;
use indicatif::ProgressBar;
use prp::aggregate::{AggregateOptions, Aggregator};
use prp::cancel::CancelToken;
use prp::config::Limits;
use prp::error::{Error, Result};
use prp::filter::RecordFilter;
use prp::git::SystemGit;
use prp::rebase::{RebaseCoordinator, RebaseOrchestrator, RebaseSummary};
use prp::report::ErrorSink;
use prp::types::{PullRequestRecord, RepoRef, TrackedRepository};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Options for the auto-rebase command
#[derive(Debug, Clone, Default)]
pub struct AutoRebaseOptions {
    /// Only these repositories; empty means every repo with a local path
    pub repos: Vec<RepoRef>,
    /// Only this pull request number
    pub pull_request_number: Option<u64>,
    /// List what would be rebased without touching any clone
    pub dry_run: bool,
    /// List what will be rebased and ask before starting
    pub confirm: bool,
}

/// Run the auto-rebase command
///
/// Per-PR failures are reported as they happen; the summary tells the
/// caller whether any occurred.
pub async fn run_auto_rebase(
    ctx: &CommandContext,
    options: AutoRebaseOptions,
    cancel: CancelToken,
) -> Result<RebaseSummary> {
    let repos = select_repos(&ctx.profile()?.tracked_repos, &options.repos)?;
    if repos.is_empty() {
        println!(
            "{}",
            "No tracked repositories have a local path. Use 'prp repo set-path' first.".muted()
        );
        return Ok(RebaseSummary::default());
    }

    let local_paths: HashMap<RepoRef, _> = repos
        .iter()
        .filter_map(|r| r.local_path.clone().map(|p| (r.repo_ref(), p)))
        .collect();

    let platform = ctx.platform().await?;
    let viewer = platform.get_viewer().await?;
    let limits = ctx.config.limits;

    let filter = RecordFilter {
        owner: Some(viewer.login.clone()),
        repos: options.repos.clone(),
        needs_rebase: true,
    };

    let mut stream = if options.dry_run || options.confirm {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(spinner_style());
        spinner.set_message("Finding pull requests that need a rebase...");
        spinner.enable_steady_tick(Duration::from_millis(80));

        let aggregator = Aggregator::new(
            platform,
            Arc::new(CliSink::with_spinner(spinner.clone())),
            aggregate_options(&limits),
            cancel.clone(),
        );
        let mut pending = filter.filter(aggregator.aggregate(repos, viewer));
        let mut records = Vec::new();
        while let Some(record) = pending.recv().await {
            if options
                .pull_request_number
                .is_none_or(|n| n == record.number)
            {
                records.push(record);
            }
        }
        spinner.finish_and_clear();
        sort_records(&mut records);

        print_plan(&records);
        if records.is_empty() || options.dry_run {
            if options.dry_run {
                println!("{}", "Dry run complete".muted());
            }
            return Ok(RebaseSummary::default());
        }

        if !Confirm::new()
            .with_prompt("Proceed with rebase?")
            .default(true)
            .interact()
            .map_err(|e| Error::Internal(format!("Failed to read confirmation: {e}")))?
        {
            println!("{}", "Aborted".muted());
            return Ok(RebaseSummary::default());
        }
        println!();
        replay(records)
    } else {
        let aggregator = Aggregator::new(
            platform,
            Arc::new(CliSink::plain()),
            aggregate_options(&limits),
            cancel.clone(),
        );
        filter.filter(aggregator.aggregate(repos, viewer))
    };

    let sink: Arc<dyn ErrorSink> = Arc::new(CliSink::plain());
    let orchestrator = RebaseOrchestrator::new(
        Arc::new(SystemGit::new(limits.git_timeout())),
        Arc::clone(&sink),
        cancel.clone(),
    );
    let coordinator = RebaseCoordinator::new(
        orchestrator,
        sink,
        local_paths,
        limits.max_concurrent_rebases,
        cancel,
    );

    // echo each record on its way to the coordinator
    let only = options.pull_request_number;
    let (tx, rx) = mpsc::channel(16);
    let printer = tokio::spawn(async move {
        while let Some(record) = stream.recv().await {
            if only.is_some_and(|n| n != record.number) {
                continue;
            }
            println!(
                "{} Rebasing #{} in {} ({})",
                arrow(),
                record.number,
                record.repo.accent(),
                record.head_branch
            );
            if tx.send(record).await.is_err() {
                break;
            }
        }
    });

    let summary = coordinator.rebase_all(rx, only).await;
    let _ = printer.await;

    if summary.succeeded > 0 || summary.failed == 0 {
        println!(
            "{} {} rebased",
            format!("{CHECK} Auto-rebase complete:").success(),
            summary.succeeded.accent()
        );
    }
    Ok(summary)
}

/// Tracked repositories to aggregate
///
/// Explicit `--repo` selections must be tracked. Without them, only repos
/// with a local path are worth listing.
fn select_repos(
    tracked: &[TrackedRepository],
    requested: &[RepoRef],
) -> Result<Vec<TrackedRepository>> {
    if requested.is_empty() {
        return Ok(tracked
            .iter()
            .filter(|r| r.local_path.is_some())
            .cloned()
            .collect());
    }

    requested
        .iter()
        .map(|want| {
            tracked
                .iter()
                .find(|r| r.owner == want.owner && r.name == want.name)
                .cloned()
                .ok_or_else(|| Error::InvalidRepo(want.to_string()))
        })
        .collect()
}

fn aggregate_options(limits: &Limits) -> AggregateOptions {
    AggregateOptions {
        max_concurrent_requests: limits.max_concurrent_requests,
        request_timeout: limits.request_timeout(),
    }
}

fn replay(records: Vec<PullRequestRecord>) -> mpsc::Receiver<PullRequestRecord> {
    let (tx, rx) = mpsc::channel(records.len().max(1));
    for record in records {
        // capacity covers every record
        let _ = tx.try_send(record);
    }
    rx
}

fn print_plan(records: &[PullRequestRecord]) {
    if records.is_empty() {
        println!("{}", "No pull requests need a rebase".muted());
        return;
    }
    println!("{}:", "Rebase plan".emphasis());
    println!();
    for record in records {
        println!(
            "  {} #{} {} {} onto {}",
            arrow(),
            record.number,
            record.repo.accent(),
            record.head_branch,
            record.target_branch
        );
    }
    println!();
}
