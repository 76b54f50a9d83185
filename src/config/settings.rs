use crate::sync::reconciler::DeletionPolicy;
use anyhow::{anyhow, Result};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub telegram_bot_token: String,
    /// The single chat whose messages feed the pipeline.
    pub chat_id: i64,
    pub database_url: String,
    /// How many of the newest messages one cycle considers. Keys absent from
    /// this window are treated as deleted, so the window must comfortably
    /// exceed the number of messages posted between two polls.
    pub fetch_window_size: usize,
    pub poll_interval_secs: u64,
    pub max_retry_attempts: u32,
    /// IANA timezone used to bucket expenses into local calendar days.
    pub timezone: String,
    /// "hard" removes window-evicted rows physically, "soft" only flags them.
    pub deletion_policy: String,
    pub log_level: String,
}

impl Settings {
    pub fn new() -> Result<Self> {
        let telegram_bot_token =
            env::var("TELEGRAM_BOT_TOKEN").map_err(|_| anyhow!("TELEGRAM_BOT_TOKEN must be set"))?;

        let chat_id = env::var("CHAT_ID")
            .map_err(|_| anyhow!("CHAT_ID must be set"))?
            .parse::<i64>()
            .map_err(|_| anyhow!("CHAT_ID must be an integer"))?;

        let database_url = env::var("DATABASE_URL").unwrap_or_else(|_| "gastobot.db".to_string());

        let fetch_window_size = env::var("FETCH_WINDOW_SIZE")
            .unwrap_or_else(|_| "5".to_string())
            .parse::<usize>()
            .unwrap_or(5);

        let poll_interval_secs = env::var("POLL_INTERVAL_SECS")
            .unwrap_or_else(|_| "60".to_string())
            .parse::<u64>()
            .unwrap_or(60);

        let max_retry_attempts = env::var("MAX_RETRY_ATTEMPTS")
            .unwrap_or_else(|_| "3".to_string())
            .parse::<u32>()
            .unwrap_or(3);

        let timezone =
            env::var("TIMEZONE").unwrap_or_else(|_| "America/Sao_Paulo".to_string());

        let deletion_policy =
            env::var("DELETION_POLICY").unwrap_or_else(|_| "hard".to_string());

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(Settings {
            telegram_bot_token,
            chat_id,
            database_url,
            fetch_window_size,
            poll_interval_secs,
            max_retry_attempts,
            timezone,
            deletion_policy,
            log_level,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.telegram_bot_token.is_empty() {
            return Err(anyhow!("Telegram bot token cannot be empty"));
        }

        if self.chat_id == 0 {
            return Err(anyhow!("Chat id cannot be zero"));
        }

        if self.database_url.is_empty() {
            return Err(anyhow!("Database URL cannot be empty"));
        }

        if self.fetch_window_size == 0 {
            return Err(anyhow!("Fetch window size must be greater than 0"));
        }

        if self.poll_interval_secs == 0 {
            return Err(anyhow!("Poll interval must be greater than 0"));
        }

        if self.max_retry_attempts == 0 {
            return Err(anyhow!("Max retry attempts must be greater than 0"));
        }

        self.parsed_timezone()?;
        self.parsed_deletion_policy()?;

        Ok(())
    }

    pub fn parsed_timezone(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| anyhow!("Unknown timezone: {}", self.timezone))
    }

    pub fn parsed_deletion_policy(&self) -> Result<DeletionPolicy> {
        match self.deletion_policy.as_str() {
            "hard" => Ok(DeletionPolicy::Hard),
            "soft" => Ok(DeletionPolicy::Soft),
            other => Err(anyhow!("Unknown deletion policy: {other}")),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            telegram_bot_token: String::new(),
            chat_id: 0,
            database_url: "gastobot.db".to_string(),
            fetch_window_size: 5,
            poll_interval_secs: 60,
            max_retry_attempts: 3,
            timezone: "America/Sao_Paulo".to_string(),
            deletion_policy: "hard".to_string(),
            log_level: "info".to_string(),
        }
    }
}
