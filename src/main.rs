mod calculator;
mod colors;
mod config;
mod database;
mod error;
mod parser;
mod retry;
mod source;
mod sync;
mod utils;

use std::sync::Arc;
use std::time::Duration;

use dotenv::dotenv;
use log::{error, info};

use config::Settings;
use database::DatabaseOperations;
use error::Result;
use source::TelegramSource;
use sync::SyncService;
use utils::Logger;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    env_logger::init();

    Logger::log_operation_start("GastoBot", "Initializing application");

    let settings = match Settings::new() {
        Ok(s) => {
            Logger::log_operation_success("Configuration", "Settings loaded successfully");
            s
        }
        Err(e) => {
            Logger::log_operation_failure("Configuration", &e.to_string());
            return Err(e.into());
        }
    };

    if let Err(e) = settings.validate() {
        Logger::log_operation_failure("Configuration validation", &e.to_string());
        return Err(e.into());
    }

    let db = match DatabaseOperations::new(&settings.database_url).await {
        Ok(db) => {
            Logger::log_operation_success("Database", "Database initialized successfully");
            db
        }
        Err(e) => {
            Logger::log_operation_failure("Database", &e.to_string());
            return Err(e);
        }
    };

    let source = Arc::new(TelegramSource::new(&settings.telegram_bot_token));
    Logger::log_operation_success("TelegramSource", "Message source created successfully");

    let service = SyncService::new(
        source,
        db,
        settings.chat_id,
        settings.fetch_window_size,
        settings.max_retry_attempts,
        settings.parsed_deletion_policy()?,
        settings.parsed_timezone()?,
    );

    info!("📊 Configuration:");
    info!("  - Database: {}", settings.database_url);
    info!("  - Chat ID: {}", settings.chat_id);
    info!("  - Fetch Window: {} messages", settings.fetch_window_size);
    info!("  - Poll Interval: {}s", settings.poll_interval_secs);
    info!("  - Timezone: {}", settings.timezone);
    info!("  - Deletion Policy: {}", settings.deletion_policy);

    let mut ticker = tokio::time::interval(Duration::from_secs(settings.poll_interval_secs));

    // The first tick fires immediately, giving the one-shot startup cycle.
    loop {
        ticker.tick().await;

        match service.run_cycle().await {
            Ok(summary) => Logger::log_cycle(
                summary.fetched,
                summary.applied.upserts,
                summary.applied.soft_deletes + summary.applied.evictions,
                summary.applied.write_failures,
            ),
            Err(e) => {
                // Aggregates stay stale-but-available; the next tick retries.
                error!("Sync cycle failed: {e}");
            }
        }

        match service.maybe_accrue().await {
            Ok(summary) if !summary.skipped => {
                let today = chrono::Utc::now()
                    .with_timezone(&settings.parsed_timezone()?)
                    .date_naive();
                for (jar_name, net_gain) in &summary.credited {
                    Logger::log_accrual(jar_name, *net_gain, today);
                }
            }
            Ok(_) => {}
            Err(e) => error!("Daily accrual failed: {e}"),
        }
    }
}
