use chrono::NaiveDate;
use log::{error, info};

/// Logging helpers for operation lifecycle events.
pub struct Logger;

impl Logger {
    pub fn log_operation_start(operation: &str, details: &str) {
        info!("🚀 Starting {}: {}", operation, details);
    }

    pub fn log_operation_success(operation: &str, details: &str) {
        info!("✅ {} completed successfully: {}", operation, details);
    }

    pub fn log_operation_failure(operation: &str, error: &str) {
        error!("❌ {} failed: {}", operation, error);
    }

    pub fn log_cycle(fetched: usize, upserts: usize, deletions: usize, failures: usize) {
        info!(
            "🔄 Sync Cycle: fetched={} upserts={} deletions={} failures={}",
            fetched, upserts, deletions, failures
        );
    }

    pub fn log_accrual(jar_name: &str, net_gain: f64, date: NaiveDate) {
        info!(
            "💰 Interest Accrual: {} | {} | {}",
            jar_name,
            Formatter::format_amount(net_gain),
            date
        );
    }
}

/// Display formatting helpers.
pub struct Formatter;

impl Formatter {
    pub fn format_amount(amount: f64) -> String {
        format!("R$ {:.2}", amount)
    }
}

/// Input validation helpers.
pub struct Validator;

impl Validator {
    pub fn is_valid_label(label: &str) -> bool {
        !label.is_empty() && label.len() <= 100 && !label.contains('\n')
    }

    pub fn is_valid_amount(amount: f64) -> bool {
        amount >= 0.0 && amount <= 999_999_999.99 && !amount.is_nan() && !amount.is_infinite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_amount() {
        assert_eq!(Formatter::format_amount(1000.0), "R$ 1000.00");
        assert_eq!(Formatter::format_amount(1000.5), "R$ 1000.50");
    }

    #[test]
    fn test_validators() {
        assert!(Validator::is_valid_label("Mercado"));
        assert!(!Validator::is_valid_label(""));
        assert!(!Validator::is_valid_label("Mercado\nAluguel"));

        assert!(Validator::is_valid_amount(1000.0));
        assert!(Validator::is_valid_amount(0.0));
        assert!(!Validator::is_valid_amount(-100.0));
        assert!(!Validator::is_valid_amount(f64::NAN));
    }
}
