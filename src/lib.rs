pub mod calculator;
pub mod colors;
pub mod config;
pub mod database;
pub mod error;
pub mod parser;
pub mod retry;
pub mod source;
pub mod sync;
pub mod utils;

pub use calculator::{accrue_interest, aggregate, jar_balance, jar_balances, MonthlyReport};
pub use config::Settings;
pub use database::{models, DatabaseOperations};
pub use error::GastoBotError;
pub use parser::MessageParser;
pub use source::{MessageSource, TelegramSource};
pub use sync::{EventClassifier, SyncService};
