use crate::database::models::RawMessage;
use crate::error::Result;
use crate::source::MessageSource;
use async_trait::async_trait;
use log::debug;
use teloxide::requests::Requester;
use teloxide::types::UpdateKind;
use teloxide::Bot;

/// Message source backed by the Telegram Bot API's getUpdates endpoint.
/// Edited messages are surfaced like new ones so a later edit re-parses
/// under the same message id.
pub struct TelegramSource {
    bot: Bot,
}

impl TelegramSource {
    pub fn new(token: &str) -> Self {
        Self {
            bot: Bot::new(token),
        }
    }
}

#[async_trait]
impl MessageSource for TelegramSource {
    async fn fetch_recent(&self) -> Result<Vec<RawMessage>> {
        let updates = self.bot.get_updates().await?;
        debug!("Fetched {} updates from Telegram", updates.len());

        let messages = updates
            .into_iter()
            .filter_map(|update| match update.kind {
                UpdateKind::Message(msg) | UpdateKind::EditedMessage(msg) => {
                    let text = msg.text().unwrap_or_default().to_string();
                    Some(RawMessage {
                        id: msg.id.0 as i64,
                        chat_id: msg.chat.id.0,
                        text,
                        timestamp: msg.date,
                    })
                }
                _ => None,
            })
            .collect();

        Ok(messages)
    }
}
