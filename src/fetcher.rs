//! Watermark-filtered reads against the GitHub API.
//!
//! Listing an account's repositories is the only call whose failure aborts a
//! poll. Commit and pull request lookups are best-effort: a failure degrades to
//! [`UNKNOWN_COMMIT`] or an empty list so one repository never blanks a report.
use chrono::{DateTime, Utc};
use tracing::{instrument, warn};

use crate::github::{GithubApi, GithubError};
use crate::model::{PullRequestActivity, RepoSummary};

/// Commit message used when the latest commit cannot be determined.
pub const UNKNOWN_COMMIT: &str = "Unknown commit";

/// Repositories of `account` pushed strictly after `since`, in listing order.
///
/// Only the first page (30 repositories) is inspected.
#[instrument(skip(api))]
pub async fn fetch_recent_repos(
    api: &dyn GithubApi,
    account: &str,
    since: DateTime<Utc>,
) -> Result<Vec<RepoSummary>, GithubError> {
    let repos = api.list_repos(account).await?;
    Ok(repos
        .into_iter()
        .filter(|repo| repo.pushed_at.is_some_and(|pushed| pushed > since))
        .collect())
}

/// Latest commit message on `branch`, paired with the branch name.
pub async fn fetch_latest_commit(
    api: &dyn GithubApi,
    owner: &str,
    repo: &str,
    branch: &str,
) -> (String, String) {
    let message = best_effort(
        api.list_commits(owner, repo, branch).await.map(|commits| {
            commits
                .into_iter()
                .next()
                .map(|c| c.commit.message)
                .unwrap_or_else(|| UNKNOWN_COMMIT.to_string())
        }),
        || UNKNOWN_COMMIT.to_string(),
        repo,
        "latest commit",
    );
    (message, branch.to_string())
}

/// Pull requests merged strictly after `since`, among the 10 most recently closed.
pub async fn fetch_merged_prs(
    api: &dyn GithubApi,
    owner: &str,
    repo: &str,
    since: DateTime<Utc>,
) -> Vec<PullRequestActivity> {
    let merged = api.list_pulls(owner, repo).await.map(|pulls| {
        pulls
            .into_iter()
            .filter_map(|pr| {
                let merged_at = pr.merged_at.filter(|at| *at > since)?;
                Some(PullRequestActivity {
                    title: pr.title,
                    head_ref: pr.head.name,
                    base_ref: pr.base.name,
                    merged_at,
                    url: pr.html_url,
                })
            })
            .collect()
    });
    best_effort(merged, Vec::new, repo, "merged pull requests")
}

fn best_effort<T>(
    result: Result<T, GithubError>,
    fallback: impl FnOnce() -> T,
    repo: &str,
    what: &str,
) -> T {
    match result {
        Ok(value) => value,
        Err(err) => {
            warn!(%err, repo, "failed to fetch {what}; using fallback");
            fallback()
        }
    }
}
