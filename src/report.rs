use chrono::{DateTime, Utc};
use std::fmt::Write;
use teloxide::utils::html::escape;
use tracing::debug;

use crate::fetcher::{fetch_latest_commit, fetch_merged_prs};
use crate::github::{GithubApi, GithubError};
use crate::model::{RepoSummary, RepositoryActivity};

const UNKNOWN_LANGUAGE: &str = "unknown";

/// Enrich each qualifying repository with its latest commit and merged pull
/// requests. Output keeps the listing order (most recently pushed first).
///
/// An empty result means there is nothing to report.
pub async fn build_report(
    api: &dyn GithubApi,
    account: &str,
    repos: Vec<RepoSummary>,
    since: DateTime<Utc>,
) -> Vec<RepositoryActivity> {
    let mut report = Vec::with_capacity(repos.len());
    for repo in repos {
        // fetch_recent_repos only yields pushed repositories
        let Some(pushed_at) = repo.pushed_at else {
            continue;
        };
        let owner = repo.owner.login.as_str();
        let (latest_commit_message, branch) =
            fetch_latest_commit(api, owner, &repo.name, &repo.default_branch).await;
        let merged_pull_requests = fetch_merged_prs(api, owner, &repo.name, since).await;
        debug!(
            account,
            repo = %repo.name,
            merged = merged_pull_requests.len(),
            "collected repository activity"
        );
        report.push(RepositoryActivity {
            name: repo.name,
            url: repo.html_url,
            pushed_at,
            language: repo.language,
            branch,
            latest_commit_message,
            merged_pull_requests,
        });
    }
    report
}

/// Render a report as Telegram HTML.
pub fn format_report(account: &str, activity: &[RepositoryActivity]) -> String {
    let mut msg = format!("🚀 New activity by <b>{}</b>:\n\n", escape(account));
    for repo in activity {
        let _ = writeln!(msg, "🔹 {}", link(&repo.url, &repo.name));
        let _ = writeln!(msg, "🌿 Branch: {}", escape(&repo.branch));
        let _ = writeln!(msg, "📝 Commit: {}", escape(&repo.latest_commit_message));
        let _ = writeln!(msg, "📅 Pushed: {}", timestamp(repo.pushed_at));
        let _ = writeln!(
            msg,
            "🖥 Language: {}",
            escape(repo.language.as_deref().unwrap_or(UNKNOWN_LANGUAGE))
        );

        if !repo.merged_pull_requests.is_empty() {
            msg.push_str("✅ Merged Pull Requests:\n");
            for pr in &repo.merged_pull_requests {
                let _ = writeln!(msg, "🔀 {}", link(&pr.url, &pr.title));
                let _ = writeln!(msg, "{} → {}", escape(&pr.head_ref), escape(&pr.base_ref));
                let _ = writeln!(msg, "📅 Merged at: {}", timestamp(pr.merged_at));
            }
        }
        msg.push('\n');
    }
    msg
}

/// One-line notice for a poll whose repository listing failed.
pub fn format_fetch_error(err: &GithubError) -> String {
    format!("❌ Error fetching repos: {}", err.upstream_message())
}

fn link(url: &str, text: &str) -> String {
    format!(
        "<a href=\"{}\">{}</a>",
        escape(url).replace('"', "&quot;"),
        escape(text)
    )
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}
