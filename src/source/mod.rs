pub mod telegram;

use crate::database::models::RawMessage;
use crate::error::Result;
use async_trait::async_trait;

pub use telegram::TelegramSource;

/// Pull interface over the chat-message source. Returns a bounded window of
/// recent messages; delivery is not exactly-once, so callers must tolerate
/// duplicates and omissions.
#[async_trait]
pub trait MessageSource: Send + Sync {
    async fn fetch_recent(&self) -> Result<Vec<RawMessage>>;
}
