use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use teloxide::prelude::*;
use tracing::{debug, info};

use gh_watchbot::clock::SystemClock;
use gh_watchbot::config;
use gh_watchbot::gateway::TelegramGateway;
use gh_watchbot::github::GithubClient;
use gh_watchbot::handlers::{self, Command};
use gh_watchbot::registry::WatchRegistry;
use gh_watchbot::scheduler::PollScheduler;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Path to YAML config file; secrets may also come from the environment
    #[arg(long)]
    config: Option<PathBuf>,
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
    let cfg = config::load(args.config.as_deref())?;

    let github = GithubClient::from_config(&cfg)?;
    if cfg.github_token().is_none() {
        info!("no GitHub token configured; using unauthenticated requests");
    }

    let bot = Bot::new(cfg.telegram.bot_token.clone());
    let registry = Arc::new(WatchRegistry::new(Arc::new(SystemClock)));
    let scheduler = Arc::new(PollScheduler::new(
        registry,
        Arc::new(github),
        Arc::new(TelegramGateway::new(bot.clone())),
        cfg.poll_settings(),
    ));

    let handler = Update::filter_message()
        .branch(
            dptree::entry()
                .filter_command::<Command>()
                .endpoint(handlers::handle_command),
        )
        .branch(
            dptree::filter(|msg: Message| msg.text().is_some_and(|t| t.starts_with('/')))
                .endpoint(handlers::handle_unknown),
        );

    info!(settings = ?cfg.poll_settings(), "starting telegram bot");
    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![Arc::clone(&scheduler)])
        .default_handler(|upd| async move {
            debug!(update_id = upd.id, "ignoring update");
        })
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    scheduler.shutdown().await;
    info!("bot stopped");
    Ok(())
}
