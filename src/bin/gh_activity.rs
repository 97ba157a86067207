use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use clap::Parser;
use std::path::PathBuf;

use gh_watchbot::config::Config;
use gh_watchbot::fetcher::fetch_recent_repos;
use gh_watchbot::github::GithubClient;
use gh_watchbot::report::{build_report, format_report};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Print one activity report for a GitHub account and exit"
)]
struct Args {
    /// Path to YAML config file (reads only `github`)
    #[arg(long)]
    config: Option<PathBuf>,

    /// GitHub account to inspect
    #[arg(long)]
    account: String,

    /// Report activity newer than this many minutes ago
    #[arg(long, default_value_t = 60)]
    since_minutes: i64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    dotenvy::dotenv().ok();
    let args = Args::parse();

    // The bot token is irrelevant here, so skip full validation.
    let mut cfg = match &args.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            serde_yaml::from_str::<Config>(&raw)?
        }
        None => Config::default(),
    };
    cfg.apply_env(|key| std::env::var(key).ok());
    let client = GithubClient::from_config(&cfg)?;

    let since = Utc::now() - Duration::minutes(args.since_minutes);
    let repos = fetch_recent_repos(&client, &args.account, since)
        .await
        .with_context(|| format!("failed to list repositories of {}", args.account))?;
    let report = build_report(&client, &args.account, repos, since).await;

    if report.is_empty() {
        println!("No activity by {} since {}", args.account, since);
    } else {
        println!("{}", format_report(&args.account, &report));
    }
    Ok(())
}
