use crate::database::models::ExpenseRecord;
use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use log::warn;
use std::collections::{BTreeMap, HashMap};

/// Change between two chronologically adjacent days that both have records.
/// Days without records produce no entry; gaps are not zero-filled.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyDelta {
    pub date: NaiveDate,
    pub difference: f64,
    pub percentage_change: f64,
}

/// Fresh aggregate over one month of stored expenses. Rebuilt wholesale on
/// every read; nothing here is cached or mutated across cycles.
#[derive(Debug, Clone, Default)]
pub struct MonthlyReport {
    pub totals_by_category: HashMap<String, f64>,
    pub totals_by_label: HashMap<String, f64>,
    pub monthly_total: f64,
    pub daily_totals: BTreeMap<NaiveDate, f64>,
    pub daily_deltas: Vec<DailyDelta>,
}

/// Aggregates non-deleted expense records whose local calendar date (from
/// `created_at`, adjusted to `tz`) falls in the given month.
pub fn aggregate(records: &[ExpenseRecord], year: i32, month: u32, tz: Tz) -> MonthlyReport {
    let mut report = MonthlyReport::default();

    for record in records {
        if record.is_deleted {
            continue;
        }

        let local_date = record.created_at.with_timezone(&tz).date_naive();
        if local_date.year() != year || local_date.month() != month {
            continue;
        }

        let amount = sanitize_amount(record);

        *report
            .totals_by_category
            .entry(record.category.clone())
            .or_insert(0.0) += amount;
        *report
            .totals_by_label
            .entry(record.label.clone())
            .or_insert(0.0) += amount;
        *report.daily_totals.entry(local_date).or_insert(0.0) += amount;
        report.monthly_total += amount;
    }

    report.daily_deltas = daily_deltas(&report.daily_totals);
    report
}

/// Day-over-day differences over the days actually present, ascending.
/// A zero previous-day total yields a 0% change, never NaN or infinity.
pub fn daily_deltas(daily_totals: &BTreeMap<NaiveDate, f64>) -> Vec<DailyDelta> {
    daily_totals
        .iter()
        .zip(daily_totals.iter().skip(1))
        .map(|((_, &prev), (&date, &total))| {
            let difference = total - prev;
            let percentage_change = if prev != 0.0 {
                difference / prev * 100.0
            } else {
                0.0
            };
            DailyDelta {
                date,
                difference,
                percentage_change,
            }
        })
        .collect()
}

/// A record's share of its day, as a percentage. Zero when the day total is
/// zero.
pub fn share_of_day(amount: f64, day_total: f64) -> f64 {
    if day_total == 0.0 {
        0.0
    } else {
        amount / day_total * 100.0
    }
}

/// Inclusive UTC bounds of a local calendar month, for range queries against
/// the store.
pub fn month_bounds(year: i32, month: u32, tz: Tz) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next_month = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    let last = next_month.pred_opt()?;

    let start = tz
        .from_local_datetime(&first.and_hms_opt(0, 0, 0)?)
        .earliest()?
        .with_timezone(&Utc);
    let end = tz
        .from_local_datetime(&last.and_hms_opt(23, 59, 59)?)
        .latest()?
        .with_timezone(&Utc);

    Some((start, end))
}

/// Corrupted amounts degrade to a zero contribution instead of poisoning the
/// whole pass.
fn sanitize_amount(record: &ExpenseRecord) -> f64 {
    if record.amount.is_finite() {
        record.amount
    } else {
        warn!(
            "Invalid amount {} for expense {}, treating as 0",
            record.amount, record.message_id
        );
        0.0
    }
}
