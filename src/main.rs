//! prp - track open pull requests and auto-rebase your own

mod cli;

use anyhow::{Result, bail};
use clap::{ArgAction, Parser, Subcommand};
use cli::{AutoRebaseOptions, CommandContext, ParseOptions, RepoEdit};
use prp::cancel::CancelToken;
use prp::config::{DEFAULT_PROFILE, default_config_path};
use prp::types::RepoRef;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "prp")]
#[command(about = "Track open pull requests across repositories and auto-rebase your own")]
#[command(version)]
struct Cli {
    /// Config file
    #[arg(long, global = true, env = "PRP_CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Profile to use
    #[arg(long, global = true, default_value = DEFAULT_PROFILE)]
    profile: String,

    /// More logging (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show open pull requests of every tracked repository
    #[command(visible_alias = "pa")]
    Parse {
        /// Only PRs authored by this login
        #[arg(short = 'u', long)]
        owner: Option<String>,

        /// Only PRs in this repository (owner/name, repeatable)
        #[arg(short, long = "repo")]
        repos: Vec<RepoRef>,

        /// Only PRs whose target branch moved ahead
        #[arg(long)]
        need_rebase: bool,

        /// Full titles and label names
        #[arg(short, long)]
        wide: bool,

        /// Print records as JSON
        #[arg(long)]
        json: bool,

        /// Keep filtered-out PRs in the table, dimmed
        #[arg(long)]
        show_hidden: bool,
    },

    /// Rebase your own pull requests in their local clones and force-push
    #[command(visible_alias = "auto")]
    AutoRebase {
        /// Only this repository (owner/name, repeatable)
        #[arg(short, long = "repo")]
        repos: Vec<RepoRef>,

        /// Only this pull request number
        #[arg(short = 'n', long)]
        pull_request_number: Option<u64>,

        /// Show what would be rebased, then stop
        #[arg(long)]
        dry_run: bool,

        /// Show what will be rebased and ask first
        #[arg(long)]
        confirm: bool,
    },

    /// Write an empty config file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Manage profiles
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },

    /// Manage tracked repositories of the selected profile
    Repo {
        #[command(subcommand)]
        action: RepoAction,
    },
}

#[derive(Subcommand)]
enum ProfileAction {
    /// Add a profile
    Add {
        /// Profile name
        name: String,
        /// GitHub token
        #[arg(short, long)]
        token: Option<String>,
        /// GitHub Enterprise API URL
        #[arg(short, long)]
        api_url: Option<String>,
    },
    /// Change a profile's token or API URL
    Update {
        /// Profile name
        name: String,
        /// GitHub token
        #[arg(short, long)]
        token: Option<String>,
        /// GitHub Enterprise API URL
        #[arg(short, long)]
        api_url: Option<String>,
    },
}

#[derive(Subcommand)]
enum RepoAction {
    /// Start tracking a repository
    Add { owner: String, name: String },
    /// Stop tracking a repository
    Remove { owner: String, name: String },
    /// Hide a build context from the Status column
    IgnoreBuild {
        owner: String,
        name: String,
        context: String,
    },
    /// Show a hidden build context again
    RemoveIgnoredBuild {
        owner: String,
        name: String,
        context: String,
    },
    /// Set the local clone used by auto-rebase
    SetPath {
        owner: String,
        name: String,
        path: PathBuf,
    },
    /// List your repositories (forks as their upstream) not yet tracked
    Suggest,
}

impl RepoAction {
    fn into_edit(self) -> Option<RepoEdit> {
        Some(match self {
            Self::Add { owner, name } => RepoEdit::Add(RepoRef::new(owner, name)),
            Self::Remove { owner, name } => RepoEdit::Remove(RepoRef::new(owner, name)),
            Self::IgnoreBuild {
                owner,
                name,
                context,
            } => RepoEdit::IgnoreBuild(RepoRef::new(owner, name), context),
            Self::RemoveIgnoredBuild {
                owner,
                name,
                context,
            } => RepoEdit::RemoveIgnoredBuild(RepoRef::new(owner, name), context),
            Self::SetPath { owner, name, path } => {
                RepoEdit::SetPath(RepoRef::new(owner, name), path)
            }
            Self::Suggest => return None,
        })
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "warn,prp=info",
        _ => "warn,prp=debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .ok();
}

/// Cancel on the first interrupt; true once a second one arrives
async fn watch_interrupts<F, Fut>(mut interrupted: F, cancel: CancelToken) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::io::Result<()>>,
{
    if interrupted().await.is_err() {
        return false;
    }
    tracing::info!("interrupted, finishing in-flight work (interrupt again to quit)");
    cancel.cancel();

    if interrupted().await.is_err() {
        return false;
    }
    tracing::warn!("interrupted again, exiting");
    true
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.verbose);

    let config_path = args.config.unwrap_or_else(default_config_path);

    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if watch_interrupts(tokio::signal::ctrl_c, cancel).await {
                std::process::exit(130);
            }
        });
    }

    match args.command {
        Commands::Parse {
            owner,
            repos,
            need_rebase,
            wide,
            json,
            show_hidden,
        } => {
            let ctx = CommandContext::load(&config_path, &args.profile)?;
            let options = ParseOptions {
                owner,
                repos,
                need_rebase,
                wide,
                json,
                show_hidden,
            };
            cli::run_parse(&ctx, options, cancel).await?;
        }
        Commands::AutoRebase {
            repos,
            pull_request_number,
            dry_run,
            confirm,
        } => {
            let ctx = CommandContext::load(&config_path, &args.profile)?;
            let options = AutoRebaseOptions {
                repos,
                pull_request_number,
                dry_run,
                confirm,
            };
            let summary = cli::run_auto_rebase(&ctx, options, cancel).await?;
            if !summary.all_succeeded() {
                bail!("Unable to rebase all pull requests");
            }
        }
        Commands::InitConfig { force } => {
            cli::run_init_config(&config_path, force)?;
        }
        Commands::Profile { action } => match action {
            ProfileAction::Add {
                name,
                token,
                api_url,
            } => cli::run_profile_add(&config_path, &name, token, api_url)?,
            ProfileAction::Update {
                name,
                token,
                api_url,
            } => cli::run_profile_update(&config_path, &name, token, api_url)?,
        },
        Commands::Repo { action } => {
            let mut ctx = CommandContext::load(&config_path, &args.profile)?;
            match action.into_edit() {
                Some(edit) => cli::run_repo_edit(&mut ctx, edit)?,
                None => cli::run_repo_suggest(&ctx).await?,
            }
        }
    }

    Ok(())
}
