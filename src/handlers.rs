use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use std::time::Duration;
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use teloxide::utils::command::BotCommands;
use teloxide::utils::html::escape;
use tracing::{info, instrument};

use crate::scheduler::PollScheduler;

static GITHUB_LOGIN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9](?:[A-Za-z0-9-]{0,37}[A-Za-z0-9])?$").expect("valid login regex")
});

#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "show the welcome message")]
    Start,
    #[command(description = "show this help")]
    Help,
    #[command(description = "track a GitHub account: /watch <username>")]
    Watch(String),
    #[command(description = "stop tracking")]
    Stop,
    #[command(description = "show what this chat is tracking")]
    Status,
}

/// Text to send back to the issuing chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub formatted: bool,
}

impl Reply {
    fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            formatted: false,
        }
    }

    fn html(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            formatted: true,
        }
    }
}

/// Apply `command` for `chat_id` and produce the reply.
pub fn execute(scheduler: &PollScheduler, chat_id: ChatId, command: Command) -> Reply {
    match command {
        Command::Start => Reply::plain(
            "👋 Welcome! Use /watch <github_username> to start tracking.\n\
             Use /stop to stop tracking.",
        ),
        Command::Help => Reply::plain(Command::descriptions().to_string()),
        Command::Watch(args) => {
            let Some(account) = args.split_whitespace().next() else {
                return Reply::html(
                    "⚠️ Please provide a GitHub username.\nExample: <code>/watch torvalds</code>",
                );
            };
            if !GITHUB_LOGIN.is_match(account) {
                return Reply::html(format!(
                    "⚠️ <code>{}</code> is not a valid GitHub username.",
                    escape(account)
                ));
            }
            scheduler.start_watch(chat_id, account);
            Reply::html(format!(
                "✅ Started tracking <code>{}</code> every {}.",
                escape(account),
                describe_interval(scheduler.settings().interval)
            ))
        }
        Command::Stop => {
            if scheduler.stop_watch(chat_id) {
                Reply::plain("🛑 Stopped tracking GitHub activity.")
            } else {
                Reply::plain("ℹ️ No active tracking found.")
            }
        }
        Command::Status => match scheduler.registry().get(chat_id) {
            Some(sub) => Reply::html(format!(
                "👀 Tracking <code>{}</code>; reported up to {}.",
                escape(&sub.account),
                sub.watermark.format("%Y-%m-%d %H:%M:%S UTC")
            )),
            None => Reply::plain("ℹ️ No active tracking found."),
        },
    }
}

#[instrument(skip_all)]
pub async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    scheduler: Arc<PollScheduler>,
) -> ResponseResult<()> {
    info!(chat_id = %msg.chat.id, ?cmd, "command received");
    let reply = execute(&scheduler, msg.chat.id, cmd);
    let mut request = bot.send_message(msg.chat.id, reply.text);
    if reply.formatted {
        request = request.parse_mode(ParseMode::Html);
    }
    request.await?;
    Ok(())
}

pub async fn handle_unknown(bot: Bot, msg: Message) -> ResponseResult<()> {
    if let Some(text) = msg.text() {
        let name = text.split_whitespace().next().unwrap_or(text);
        bot.send_message(
            msg.chat.id,
            format!("Unknown command: {name}\nUse /help to see available commands."),
        )
        .await?;
    }
    Ok(())
}

fn describe_interval(interval: Duration) -> String {
    let secs = interval.as_secs();
    match secs {
        60 => "minute".to_string(),
        s if s > 0 && s % 60 == 0 => format!("{} minutes", s / 60),
        1 => "second".to_string(),
        s => format!("{s} seconds"),
    }
}
