use crate::database::models::{JarDirection, JarRecord};
use chrono::{Datelike, NaiveDate, Weekday};
use log::warn;
use std::collections::HashMap;

/// Fixed monthly CDI reference rate for the simulated yield.
pub const CDI_MONTHLY_RATE: f64 = 0.0079;
/// Flat withholding applied to the gross gain.
pub const INTEREST_TAX_RATE: f64 = 0.20;

/// Folds one jar's ledger: credits add, debits subtract. The balance is
/// always derived from the ledger, never read from a stored running total.
pub fn jar_balance(entries: &[JarRecord]) -> f64 {
    entries.iter().fold(0.0, |balance, entry| {
        let amount = sanitize_amount(entry);
        match entry.direction {
            JarDirection::Credit => balance + amount,
            JarDirection::Debit => balance - amount,
        }
    })
}

/// Balances for every jar present in the ledger, grouped by name.
pub fn jar_balances(entries: &[JarRecord]) -> HashMap<String, f64> {
    let mut balances: HashMap<String, f64> = HashMap::new();

    for entry in entries {
        let amount = sanitize_amount(entry);
        let signed = match entry.direction {
            JarDirection::Credit => amount,
            JarDirection::Debit => -amount,
        };
        *balances.entry(entry.jar_name.clone()).or_insert(0.0) += signed;
    }

    balances
}

/// One day's simulated net interest on a balance: gross at the monthly CDI
/// rate, minus the flat tax, rounded to 2 decimals. Weekends accrue nothing
/// at all.
pub fn accrue_interest(balance: f64, date: NaiveDate) -> f64 {
    if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
        return 0.0;
    }

    let gross_gain = balance * CDI_MONTHLY_RATE;
    let tax_deduction = gross_gain * INTEREST_TAX_RATE;
    round2(gross_gain - tax_deduction)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn sanitize_amount(entry: &JarRecord) -> f64 {
    if entry.amount.is_finite() {
        entry.amount
    } else {
        warn!(
            "Invalid amount {} in jar entry {}, treating as 0",
            entry.amount, entry.message_id
        );
        0.0
    }
}
