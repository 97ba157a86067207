//! In-crate fakes shared by unit tests.
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use reqwest::StatusCode;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::clock::Clock;
use crate::github::{GithubApi, GithubError};
use crate::model::{BranchRef, CommitDetail, CommitSummary, Owner, PullSummary, RepoSummary};
use crate::scheduler::{PollState, PollTimer};

pub fn ts(offset_secs: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::seconds(offset_secs)
}

pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(at) }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// A timer that never ticks and only waits to be cancelled.
pub fn parked_timer() -> PollTimer {
    PollTimer::spawn(|mut cancel, state| async move {
        let _ = cancel.wait_for(|cancelled| *cancelled).await;
        state.send_replace(PollState::Cancelled);
    })
}

pub fn repo(name: &str, pushed_at: Option<DateTime<Utc>>) -> RepoSummary {
    RepoSummary {
        name: name.to_string(),
        html_url: format!("https://github.com/octocat/{name}"),
        pushed_at,
        language: Some("Rust".into()),
        default_branch: "main".into(),
        owner: Owner {
            login: "octocat".into(),
        },
    }
}

pub fn commit(message: &str) -> CommitSummary {
    CommitSummary {
        sha: "abc123".into(),
        commit: CommitDetail {
            message: message.to_string(),
        },
    }
}

pub fn pull(title: &str, merged_at: Option<DateTime<Utc>>) -> PullSummary {
    PullSummary {
        number: 1,
        title: title.to_string(),
        html_url: format!("https://github.com/octocat/r/pull/{}", title.len()),
        merged_at,
        head: BranchRef {
            name: "feature".into(),
        },
        base: BranchRef {
            name: "main".into(),
        },
    }
}

fn status_error(message: &str) -> GithubError {
    GithubError::Status {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        message: message.to_string(),
    }
}

/// Fixed responses keyed by repository name.
#[derive(Default)]
pub struct StubGithub {
    repos: Vec<RepoSummary>,
    repos_error: Option<String>,
    commits: HashMap<String, CommitSummary>,
    pulls: HashMap<String, Vec<PullSummary>>,
    failing_commits: HashSet<String>,
    failing_pulls: HashSet<String>,
}

impl StubGithub {
    pub fn with_repos(mut self, repos: Vec<RepoSummary>) -> Self {
        self.repos = repos;
        self
    }

    pub fn failing_repos(mut self, message: &str) -> Self {
        self.repos_error = Some(message.to_string());
        self
    }

    pub fn with_commit(mut self, repo: &str, commit: CommitSummary) -> Self {
        self.commits.insert(repo.to_string(), commit);
        self
    }

    pub fn with_pulls(mut self, repo: &str, pulls: Vec<PullSummary>) -> Self {
        self.pulls.insert(repo.to_string(), pulls);
        self
    }

    pub fn failing_commits_for(mut self, repo: &str) -> Self {
        self.failing_commits.insert(repo.to_string());
        self
    }

    pub fn failing_pulls_for(mut self, repo: &str) -> Self {
        self.failing_pulls.insert(repo.to_string());
        self
    }
}

#[async_trait]
impl GithubApi for StubGithub {
    async fn list_repos(&self, _account: &str) -> Result<Vec<RepoSummary>, GithubError> {
        match &self.repos_error {
            Some(message) => Err(status_error(message)),
            None => Ok(self.repos.clone()),
        }
    }

    async fn list_commits(
        &self,
        _owner: &str,
        repo: &str,
        _branch: &str,
    ) -> Result<Vec<CommitSummary>, GithubError> {
        if self.failing_commits.contains(repo) {
            return Err(status_error("commits unavailable"));
        }
        Ok(self.commits.get(repo).cloned().into_iter().collect())
    }

    async fn list_pulls(&self, _owner: &str, repo: &str) -> Result<Vec<PullSummary>, GithubError> {
        if self.failing_pulls.contains(repo) {
            return Err(status_error("pulls unavailable"));
        }
        Ok(self.pulls.get(repo).cloned().unwrap_or_default())
    }
}
