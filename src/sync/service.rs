use crate::calculator::interest::{accrue_interest, jar_balances};
use crate::database::models::Table;
use crate::database::operations::DatabaseOperations;
use crate::error::Result;
use crate::retry::{retry_with_backoff, RetryConfig};
use crate::source::MessageSource;
use crate::sync::classifier::EventClassifier;
use crate::sync::reconciler::{plan, ApplySummary, DeletionPolicy, Reconciler};
use chrono::Utc;
use chrono_tz::Tz;
use log::{info, warn};
use std::sync::Arc;

/// Outcome of one fetch-classify-reconcile cycle.
#[derive(Debug, Default, Clone, Copy)]
pub struct CycleSummary {
    pub fetched: usize,
    pub expenses: usize,
    pub jars: usize,
    pub tombstones: usize,
    pub applied: ApplySummary,
}

/// Outcome of one accrual trigger.
#[derive(Debug, Default, Clone)]
pub struct AccrualSummary {
    /// (jar name, net gain) pairs credited this run.
    pub credited: Vec<(String, f64)>,
    pub skipped: bool,
}

/// Drives the poll loop: fetch a bounded window from the message source,
/// classify it, and reconcile the store against it. Also owns the daily
/// interest accrual, guarded by a durable last-accrual-date marker so a
/// restart cannot double-apply and a missed day is caught up exactly once.
pub struct SyncService {
    source: Arc<dyn MessageSource>,
    db: DatabaseOperations,
    classifier: EventClassifier,
    reconciler: Reconciler,
    chat_id: i64,
    fetch_window_size: usize,
    retry_attempts: u32,
    timezone: Tz,
}

impl SyncService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source: Arc<dyn MessageSource>,
        db: DatabaseOperations,
        chat_id: i64,
        fetch_window_size: usize,
        retry_attempts: u32,
        deletion_policy: DeletionPolicy,
        timezone: Tz,
    ) -> Self {
        let reconciler = Reconciler::new(db.clone(), deletion_policy);
        Self {
            source,
            db,
            classifier: EventClassifier::new(),
            reconciler,
            chat_id,
            fetch_window_size,
            retry_attempts,
            timezone,
        }
    }

    /// Runs one full cycle. A source failure aborts the cycle after the
    /// configured retries, leaving the store untouched; the next trigger is
    /// the retry mechanism.
    pub async fn run_cycle(&self) -> Result<CycleSummary> {
        let source = self.source.clone();
        let mut messages = retry_with_backoff(
            || {
                let source = source.clone();
                async move { source.fetch_recent().await }
            },
            RetryConfig::with_max_attempts(self.retry_attempts),
            "fetch_recent",
        )
        .await?;

        let fetched = messages.len();

        // Keep only the newest N messages, like the original dashboard.
        messages.sort_by(|a, b| b.id.cmp(&a.id));
        if messages.len() > self.fetch_window_size {
            messages.truncate(self.fetch_window_size);
            warn!(
                "Fetch window truncated to {} of {} messages; window fall-off \
                 is not reliable deletion evidence this cycle",
                self.fetch_window_size, fetched
            );
        }

        let batch = self.classifier.classify(&messages, self.chat_id);

        let expense_keys = self.db.non_deleted_keys(Table::Expenses).await?;
        let jar_keys = self.db.non_deleted_keys(Table::Jars).await?;

        let reconcile_plan = plan(&batch, &expense_keys, &jar_keys);
        let applied = self.reconciler.apply(&reconcile_plan).await;

        let summary = CycleSummary {
            fetched,
            expenses: batch.expenses.len(),
            jars: batch.jars.len(),
            tombstones: batch.tombstones.len(),
            applied,
        };
        info!(
            "Cycle complete: fetched={} expenses={} jars={} tombstones={}",
            summary.fetched, summary.expenses, summary.jars, summary.tombstones
        );
        Ok(summary)
    }

    /// Accrues one day of simulated interest for every jar with a positive
    /// balance, at most once per local calendar day. Weekends advance the
    /// marker with zero accrual.
    pub async fn maybe_accrue(&self) -> Result<AccrualSummary> {
        let today = Utc::now().with_timezone(&self.timezone).date_naive();

        if self.db.last_accrual_date().await? == Some(today) {
            return Ok(AccrualSummary {
                credited: Vec::new(),
                skipped: true,
            });
        }

        let entries = self.db.jar_entries().await?;
        let balances = jar_balances(&entries);

        let mut credited = Vec::new();
        for (jar_name, balance) in balances {
            let net_gain = accrue_interest(balance, today);
            if net_gain > 0.0 {
                self.db.insert_accrual(&jar_name, net_gain).await?;
                credited.push((jar_name, net_gain));
            }
        }

        self.db.set_last_accrual_date(today).await?;
        info!(
            "Daily accrual for {}: {} jar(s) credited",
            today,
            credited.len()
        );
        Ok(AccrualSummary {
            credited,
            skipped: false,
        })
    }
}
