//! Shared test helpers

#![allow(dead_code)]

mod mock_platform;
mod scripted_git;

pub use mock_platform::MockPlatformService;
pub use scripted_git::{DEFAULT_REMOTES, ScriptedGit};

use prp::report::ErrorSink;
use prp::types::{
    CommitStatus, Identity, PrComment, PullRequest, PullRequestRecord, Review, ReviewState,
    TrackedRepository,
};
use std::path::Path;
use std::sync::Mutex;
use tempfile::TempDir;

/// Error sink that keeps everything it is told
#[derive(Default)]
pub struct RecordingSink {
    errors: Mutex<Vec<String>>,
    warnings: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.warnings.lock().unwrap().clone()
    }
}

impl ErrorSink for RecordingSink {
    fn error(&self, message: &str) {
        self.errors.lock().unwrap().push(message.to_string());
    }

    fn warning(&self, message: &str) {
        self.warnings.lock().unwrap().push(message.to_string());
    }
}

/// Open PR `number` by `author` from `author:head` onto `octo:main` in widgets
pub fn make_pr(number: u64, author: &str, head: &str) -> PullRequest {
    PullRequest {
        number,
        title: format!("Change {number}"),
        author_login: author.to_string(),
        head_ref: head.to_string(),
        base_ref: "main".to_string(),
        head_label: format!("{author}:{head}"),
        base_label: "octo:main".to_string(),
        head_sha: format!("sha-{number}"),
        head_ssh_url: format!("git@github.com:{author}/widgets.git"),
        base_ssh_url: "git@github.com:octo/widgets.git".to_string(),
        html_url: format!("https://github.com/octo/widgets/pull/{number}"),
    }
}

/// Record for [`make_pr`] in `repo` (`owner/name`), seen by alice
pub fn make_record(repo: &str, number: u64, author: &str, head: &str) -> PullRequestRecord {
    PullRequestRecord::from_pull_request(
        repo.parse().unwrap(),
        make_pr(number, author, head),
        &Identity::new("alice"),
    )
}

pub fn tracked(repo: &str) -> TrackedRepository {
    let (owner, name) = repo.split_once('/').unwrap();
    TrackedRepository::new(owner, name)
}

pub fn comment(author: &str, body: &str) -> PrComment {
    PrComment {
        author: author.to_string(),
        body: body.to_string(),
    }
}

pub fn approved(author: &str) -> Review {
    Review {
        author: author.to_string(),
        state: ReviewState::Approved,
    }
}

pub fn status(context: &str, state: &str) -> CommitStatus {
    CommitStatus {
        context: context.to_string(),
        state: state.to_string(),
    }
}

/// A directory that passes the local clone check (has a `.git` entry)
pub fn fake_clone() -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir(dir.path().join(".git")).unwrap();
    dir
}

/// Run real git in `dir`, panicking on failure
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = std::process::Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("GIT_AUTHOR_NAME", "Test")
        .env("GIT_AUTHOR_EMAIL", "test@example.com")
        .env("GIT_COMMITTER_NAME", "Test")
        .env("GIT_COMMITTER_EMAIL", "test@example.com")
        .output()
        .expect("git should be installed");
    assert!(
        output.status.success(),
        "git {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}
