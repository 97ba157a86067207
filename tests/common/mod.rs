#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use reqwest::StatusCode;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use teloxide::types::ChatId;
use tokio::sync::Mutex;

use gh_watchbot::clock::Clock;
use gh_watchbot::gateway::ChatGateway;
use gh_watchbot::github::{GithubApi, GithubError};
use gh_watchbot::model::{
    BranchRef, CommitDetail, CommitSummary, Owner, PullSummary, RepoSummary,
};
use gh_watchbot::registry::WatchRegistry;
use gh_watchbot::scheduler::{PollScheduler, PollSettings};

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

pub fn at(offset_secs: i64) -> DateTime<Utc> {
    t0() + Duration::seconds(offset_secs)
}

pub struct ManualClock(std::sync::Mutex<DateTime<Utc>>);

impl ManualClock {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self(std::sync::Mutex::new(at))
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.0.lock().unwrap() = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sent {
    pub chat_id: ChatId,
    pub text: String,
    pub formatted: bool,
}

#[derive(Clone, Default)]
pub struct RecordingGateway {
    sent: Arc<Mutex<Vec<Sent>>>,
}

impl RecordingGateway {
    pub async fn sent(&self) -> Vec<Sent> {
        self.sent.lock().await.clone()
    }
}

#[async_trait::async_trait]
impl ChatGateway for RecordingGateway {
    async fn send_message(&self, chat_id: ChatId, text: &str, formatted: bool) {
        self.sent.lock().await.push(Sent {
            chat_id,
            text: text.to_string(),
            formatted,
        });
    }
}

pub fn repo(name: &str, pushed_at: DateTime<Utc>) -> RepoSummary {
    RepoSummary {
        name: name.to_string(),
        html_url: format!("https://github.com/octocat/{name}"),
        pushed_at: Some(pushed_at),
        language: Some("Rust".into()),
        default_branch: "main".into(),
        owner: Owner {
            login: "octocat".into(),
        },
    }
}

pub fn merged_pull(title: &str, merged_at: DateTime<Utc>) -> PullSummary {
    PullSummary {
        number: 42,
        title: title.to_string(),
        html_url: "https://github.com/octocat/hello/pull/42".into(),
        merged_at: Some(merged_at),
        head: BranchRef {
            name: "feature".into(),
        },
        base: BranchRef {
            name: "main".into(),
        },
    }
}

/// Scripted GitHub responses plus call counters.
#[derive(Clone, Default)]
pub struct FakeGithub {
    repos: Arc<Mutex<Option<Result<Vec<RepoSummary>, String>>>>,
    commits: Arc<Mutex<HashMap<String, Result<String, String>>>>,
    pulls: Arc<Mutex<HashMap<String, Vec<PullSummary>>>>,
    repo_calls: Arc<AtomicUsize>,
}

impl FakeGithub {
    pub async fn set_repos(&self, repos: Vec<RepoSummary>) {
        *self.repos.lock().await = Some(Ok(repos));
    }

    pub async fn fail_repos(&self, message: &str) {
        *self.repos.lock().await = Some(Err(message.to_string()));
    }

    pub async fn set_commit(&self, repo: &str, message: Result<&str, &str>) {
        self.commits.lock().await.insert(
            repo.to_string(),
            message.map(str::to_string).map_err(str::to_string),
        );
    }

    pub async fn set_pulls(&self, repo: &str, pulls: Vec<PullSummary>) {
        self.pulls.lock().await.insert(repo.to_string(), pulls);
    }

    pub fn repo_calls(&self) -> usize {
        self.repo_calls.load(Ordering::SeqCst)
    }
}

fn not_found(message: &str) -> GithubError {
    GithubError::Status {
        status: StatusCode::NOT_FOUND,
        message: message.to_string(),
    }
}

#[async_trait::async_trait]
impl GithubApi for FakeGithub {
    async fn list_repos(&self, _account: &str) -> Result<Vec<RepoSummary>, GithubError> {
        self.repo_calls.fetch_add(1, Ordering::SeqCst);
        match self.repos.lock().await.clone() {
            Some(Ok(repos)) => Ok(repos),
            Some(Err(message)) => Err(not_found(&message)),
            None => Ok(Vec::new()),
        }
    }

    async fn list_commits(
        &self,
        _owner: &str,
        repo: &str,
        _branch: &str,
    ) -> Result<Vec<CommitSummary>, GithubError> {
        match self.commits.lock().await.get(repo).cloned() {
            Some(Ok(message)) => Ok(vec![CommitSummary {
                sha: "deadbeef".into(),
                commit: CommitDetail { message },
            }]),
            Some(Err(message)) => Err(not_found(&message)),
            None => Ok(Vec::new()),
        }
    }

    async fn list_pulls(&self, _owner: &str, repo: &str) -> Result<Vec<PullSummary>, GithubError> {
        Ok(self.pulls.lock().await.get(repo).cloned().unwrap_or_default())
    }
}

pub struct Harness {
    pub clock: Arc<ManualClock>,
    pub github: FakeGithub,
    pub gateway: RecordingGateway,
    pub scheduler: PollScheduler,
}

impl Harness {
    pub fn new(settings: PollSettings) -> Self {
        let clock = Arc::new(ManualClock::new(t0()));
        let github = FakeGithub::default();
        let gateway = RecordingGateway::default();
        let registry = Arc::new(WatchRegistry::new(clock.clone()));
        let scheduler = PollScheduler::new(
            registry,
            Arc::new(github.clone()),
            Arc::new(gateway.clone()),
            settings,
        );
        Self {
            clock,
            github,
            gateway,
            scheduler,
        }
    }

    /// Timers that will not fire during a test; ticks are driven by hand.
    pub fn manual() -> Self {
        Self::new(PollSettings {
            first_delay: std::time::Duration::from_secs(24 * 3600),
            interval: std::time::Duration::from_secs(24 * 3600),
        })
    }
}
