use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use tracing::{debug, error};

/// Outbound side of the chat platform.
#[async_trait]
pub trait ChatGateway: Send + Sync {
    /// Deliver `text` to `chat_id`. `formatted` marks Telegram HTML markup.
    /// Delivery failures are logged here and never reported back.
    async fn send_message(&self, chat_id: ChatId, text: &str, formatted: bool);
}

#[derive(Debug, Clone)]
pub struct TelegramGateway {
    bot: Bot,
}

impl TelegramGateway {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl ChatGateway for TelegramGateway {
    async fn send_message(&self, chat_id: ChatId, text: &str, formatted: bool) {
        let mut request = self.bot.send_message(chat_id, text);
        if formatted {
            request = request.parse_mode(ParseMode::Html).disable_web_page_preview(true);
        }
        match request.await {
            Ok(_) => debug!(%chat_id, formatted, "message delivered"),
            Err(err) => error!(?err, %chat_id, "failed to deliver message"),
        }
    }
}
