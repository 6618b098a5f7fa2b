//! Scripted git runner for orchestrator tests

#![allow(dead_code)]

use async_trait::async_trait;
use prp::cancel::CancelToken;
use prp::error::{Error, Result};
use prp::git::{GitOutput, GitRunner};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

/// `git remote -v` output matching the URLs of [`super::make_pr`]
pub const DEFAULT_REMOTES: &str = "\
origin\tgit@github.com:alice/widgets.git (fetch)
origin\tgit@github.com:alice/widgets.git (push)
upstream\tgit@github.com:octo/widgets.git (fetch)
upstream\tgit@github.com:octo/widgets.git (push)
";

/// Git double that answers from a script and records what it was asked
///
/// Unscripted commands succeed with empty output, except `remote -v`
/// ([`DEFAULT_REMOTES`]) and `symbolic-ref HEAD` (`main`). Queued
/// responses come first, then responses set for a directory, then global ones.
pub struct ScriptedGit {
    queued: Mutex<HashMap<String, VecDeque<GitOutput>>>,
    cancel_hooks: Mutex<HashMap<String, CancelToken>>,
    responses: Mutex<HashMap<String, GitOutput>>,
    dir_responses: Mutex<HashMap<(PathBuf, String), GitOutput>>,
    unrunnable: Mutex<HashSet<String>>,
    calls: Mutex<Vec<(PathBuf, String)>>,
    active: Mutex<HashMap<PathBuf, usize>>,
    max_active: Mutex<HashMap<PathBuf, usize>>,
    latency: Option<Duration>,
}

impl ScriptedGit {
    pub fn new() -> Self {
        let git = Self {
            queued: Mutex::new(HashMap::new()),
            cancel_hooks: Mutex::new(HashMap::new()),
            responses: Mutex::new(HashMap::new()),
            dir_responses: Mutex::new(HashMap::new()),
            unrunnable: Mutex::new(HashSet::new()),
            calls: Mutex::new(Vec::new()),
            active: Mutex::new(HashMap::new()),
            max_active: Mutex::new(HashMap::new()),
            latency: None,
        };
        git.respond("remote -v", GitOutput::ok(DEFAULT_REMOTES));
        git.respond("symbolic-ref HEAD", GitOutput::ok("refs/heads/main\n"));
        git
    }

    /// Hold every command for `latency` before answering
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Answer `args` (space separated) with `output`
    pub fn respond(&self, args: &str, output: GitOutput) {
        self.responses
            .lock()
            .unwrap()
            .insert(args.to_string(), output);
    }

    /// Answer successive runs of `args` with `outputs` in order
    ///
    /// The last output keeps answering once the others are used up.
    pub fn respond_seq(&self, args: &str, outputs: Vec<GitOutput>) {
        self.queued
            .lock()
            .unwrap()
            .insert(args.to_string(), outputs.into());
    }

    /// Cancel `token` when `args` runs
    pub fn cancel_on(&self, args: &str, token: CancelToken) {
        self.cancel_hooks
            .lock()
            .unwrap()
            .insert(args.to_string(), token);
    }

    /// Answer `args` with `output`, only in `dir`
    pub fn respond_in(&self, dir: &Path, args: &str, output: GitOutput) {
        self.dir_responses
            .lock()
            .unwrap()
            .insert((dir.to_path_buf(), args.to_string()), output);
    }

    /// Make `args` fail to run at all
    pub fn fail_to_run(&self, args: &str) {
        self.unrunnable.lock().unwrap().insert(args.to_string());
    }

    /// Every command, in order, without the directory
    pub fn commands(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, args)| args.clone())
            .collect()
    }

    /// Commands run in `dir`
    pub fn commands_in(&self, dir: &Path) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(d, _)| d == dir)
            .map(|(_, args)| args.clone())
            .collect()
    }

    /// Number of times `args` was run
    pub fn count(&self, args: &str) -> usize {
        self.commands().iter().filter(|c| *c == args).count()
    }

    /// Most commands that were ever running at once in `dir`
    pub fn max_concurrent_in(&self, dir: &Path) -> usize {
        self.max_active
            .lock()
            .unwrap()
            .get(dir)
            .copied()
            .unwrap_or(0)
    }
}

impl Default for ScriptedGit {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GitRunner for ScriptedGit {
    async fn run(&self, dir: &Path, args: &[&str]) -> Result<GitOutput> {
        let key = args.join(" ");
        self.calls
            .lock()
            .unwrap()
            .push((dir.to_path_buf(), key.clone()));

        {
            let mut active = self.active.lock().unwrap();
            let now = active.entry(dir.to_path_buf()).or_default();
            *now += 1;
            let mut max = self.max_active.lock().unwrap();
            let high = max.entry(dir.to_path_buf()).or_default();
            *high = (*high).max(*now);
        }
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        *self
            .active
            .lock()
            .unwrap()
            .get_mut(dir)
            .expect("entered above") -= 1;

        if let Some(token) = self.cancel_hooks.lock().unwrap().get(&key) {
            token.cancel();
        }
        if self.unrunnable.lock().unwrap().contains(&key) {
            return Err(Error::Internal(format!("could not run git {key}")));
        }

        if let Some(queue) = self.queued.lock().unwrap().get_mut(&key) {
            let next = if queue.len() > 1 {
                queue.pop_front()
            } else {
                queue.front().cloned()
            };
            if let Some(output) = next {
                return Ok(output);
            }
        }

        let scripted = self
            .dir_responses
            .lock()
            .unwrap()
            .get(&(dir.to_path_buf(), key.clone()))
            .cloned()
            .or_else(|| self.responses.lock().unwrap().get(&key).cloned());
        Ok(scripted.unwrap_or_else(|| GitOutput::ok("")))
    }
}
