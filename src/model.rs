use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A repository as returned by `GET users/{account}/repos`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RepoSummary {
    pub name: String,
    pub html_url: String,
    /// Null for repositories that never received a push.
    pub pushed_at: Option<DateTime<Utc>>,
    pub language: Option<String>,
    pub default_branch: String,
    pub owner: Owner,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Owner {
    pub login: String,
}

/// An entry of `GET repos/{owner}/{repo}/commits`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommitSummary {
    pub sha: String,
    pub commit: CommitDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommitDetail {
    pub message: String,
}

/// An entry of `GET repos/{owner}/{repo}/pulls`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PullSummary {
    pub number: u64,
    pub title: String,
    pub html_url: String,
    pub merged_at: Option<DateTime<Utc>>,
    pub head: BranchRef,
    pub base: BranchRef,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BranchRef {
    #[serde(rename = "ref")]
    pub name: String,
}

/// One repository's qualifying activity within a poll window.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RepositoryActivity {
    pub name: String,
    pub url: String,
    pub pushed_at: DateTime<Utc>,
    pub language: Option<String>,
    pub branch: String,
    pub latest_commit_message: String,
    pub merged_pull_requests: Vec<PullRequestActivity>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PullRequestActivity {
    pub title: String,
    pub head_ref: String,
    pub base_ref: String,
    pub merged_at: DateTime<Utc>,
    pub url: String,
}
