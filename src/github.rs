use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fmt;
use thiserror::Error;
use tracing::debug;

use crate::config::{Config, DEFAULT_API_BASE};
use crate::model::{CommitSummary, PullSummary, RepoSummary};

/// GitHub caps these listings at one page; activity beyond it is not observed.
pub const REPOS_PAGE_SIZE: u32 = 30;
pub const COMMITS_PAGE_SIZE: u32 = 1;
pub const PULLS_PAGE_SIZE: u32 = 10;

const USER_AGENT: &str = "gh-watchbot/0.1";

#[derive(Debug, Error)]
pub enum GithubError {
    #[error("github error {status}: {message}")]
    Status { status: StatusCode, message: String },
    #[error("failed to reach GitHub: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid GitHub URL: {0}")]
    InvalidUrl(String),
}

impl GithubError {
    /// The text worth showing to a chat user.
    pub fn upstream_message(&self) -> String {
        match self {
            GithubError::Status { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// The three read-only GitHub listings the poller needs.
#[async_trait]
pub trait GithubApi: Send + Sync {
    /// Repositories of `account`, most recently pushed first.
    async fn list_repos(&self, account: &str) -> Result<Vec<RepoSummary>, GithubError>;

    /// The newest commit(s) on `branch`.
    async fn list_commits(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
    ) -> Result<Vec<CommitSummary>, GithubError>;

    /// The most recently closed pull requests.
    async fn list_pulls(&self, owner: &str, repo: &str) -> Result<Vec<PullSummary>, GithubError>;
}

#[derive(Clone)]
pub struct GithubClient {
    http: Client,
    base_url: Url,
    token: Option<String>,
}

impl fmt::Debug for GithubClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GithubClient")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.token.is_some())
            .finish_non_exhaustive()
    }
}

impl GithubClient {
    pub fn new(token: Option<String>) -> Result<Self, GithubError> {
        let base_url =
            Url::parse(DEFAULT_API_BASE).map_err(|e| GithubError::InvalidUrl(e.to_string()))?;
        Self::with_base_url(token, base_url)
    }

    pub fn with_base_url(token: Option<String>, base_url: Url) -> Result<Self, GithubError> {
        let http = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            http,
            base_url,
            token,
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self, GithubError> {
        let base_url = Url::parse(&cfg.github.api_base)
            .map_err(|e| GithubError::InvalidUrl(e.to_string()))?;
        Self::with_base_url(cfg.github_token().map(str::to_string), base_url)
    }

    fn endpoint(&self, segments: &[&str], query: &[(&str, String)]) -> Result<Url, GithubError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| GithubError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }
        Ok(url)
    }

    pub fn build_request(
        &self,
        segments: &[&str],
        query: &[(&str, String)],
    ) -> Result<reqwest::Request, GithubError> {
        let url = self.endpoint(segments, query)?;
        let mut req = self
            .http
            .get(url)
            .header("Accept", "application/vnd.github+json");
        if let Some(token) = &self.token {
            req = req.header("Authorization", format!("token {}", token));
        }
        Ok(req.build()?)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, String)],
    ) -> Result<T, GithubError> {
        let request = self.build_request(segments, query)?;
        debug!(url=%request.url(), "sending github request");
        let res = self.http.execute(request).await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(GithubError::Status {
                status,
                message: upstream_message(&body),
            });
        }
        Ok(res.json().await?)
    }
}

#[async_trait]
impl GithubApi for GithubClient {
    async fn list_repos(&self, account: &str) -> Result<Vec<RepoSummary>, GithubError> {
        self.get_json(
            &["users", account, "repos"],
            &[
                ("sort", "pushed".to_string()),
                ("per_page", REPOS_PAGE_SIZE.to_string()),
            ],
        )
        .await
    }

    async fn list_commits(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
    ) -> Result<Vec<CommitSummary>, GithubError> {
        self.get_json(
            &["repos", owner, repo, "commits"],
            &[
                ("sha", branch.to_string()),
                ("per_page", COMMITS_PAGE_SIZE.to_string()),
            ],
        )
        .await
    }

    async fn list_pulls(&self, owner: &str, repo: &str) -> Result<Vec<PullSummary>, GithubError> {
        self.get_json(
            &["repos", owner, repo, "pulls"],
            &[
                ("state", "closed".to_string()),
                ("per_page", PULLS_PAGE_SIZE.to_string()),
            ],
        )
        .await
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// GitHub error bodies look like `{"message": "Not Found", ...}`.
fn upstream_message(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| "Unknown error".to_string())
}
