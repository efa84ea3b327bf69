//! [`AckSink`] over a Telegram bot: debounced interrupt/cancel acknowledgements (spec §4.8).

use async_trait::async_trait;
use supervisor_core::run_manager::AckSink;
use teloxide::prelude::*;
use tracing::warn;

pub struct TelegramAck {
    bot: Bot,
}

impl TelegramAck {
    pub fn new(bot: Bot) -> Self {
        TelegramAck { bot }
    }
}

#[async_trait]
impl AckSink for TelegramAck {
    async fn ack(&self, chat_id: &str, text: &str) {
        let Ok(id) = chat_id.parse::<i64>() else {
            warn!(chat_id, "ack: chat id is not a telegram chat id");
            return;
        };
        if let Err(e) = self.bot.send_message(ChatId(id), text).await {
            warn!(chat_id, error = %e, "failed to send ack");
        }
    }
}
