use crate::database::models::{ExpenseEvent, JarEvent, Table};
use crate::database::operations::DatabaseOperations;
use crate::sync::classifier::ClassifiedBatch;
use log::{error, info};
use std::collections::HashSet;

/// What to do with store keys that fell out of the polled window. `Hard`
/// matches the original behavior (physical delete); `Soft` flags them
/// deleted like explicit tombstones and leaves retention to a separate job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionPolicy {
    Hard,
    Soft,
}

/// The writes needed to converge the store to one fetch window. Computing
/// the plan is pure; only `Reconciler::apply` touches the store.
#[derive(Debug, Default)]
pub struct ReconcilePlan {
    pub expense_upserts: Vec<ExpenseEvent>,
    pub jar_upserts: Vec<JarEvent>,
    /// Keys explicitly tombstoned by the parser, per table.
    pub soft_deletes: Vec<(Table, i64)>,
    /// Live store keys absent from the whole fetched window.
    pub window_evictions: Vec<(Table, i64)>,
}

/// Computes the convergence plan for one classified window against the
/// store's live key sets. Every event becomes an upsert; a live key is
/// soft-deleted when its message was explicitly tombstoned, and evicted when
/// it no longer appears in the window at all.
pub fn plan(
    batch: &ClassifiedBatch,
    expense_keys: &HashSet<i64>,
    jar_keys: &HashSet<i64>,
) -> ReconcilePlan {
    let window_keys = batch.window_keys();
    let tombstones: HashSet<i64> = batch.tombstones.iter().copied().collect();

    let mut plan = ReconcilePlan {
        expense_upserts: batch.expenses.clone(),
        jar_upserts: batch.jars.clone(),
        ..Default::default()
    };

    for (table, keys) in [(Table::Expenses, expense_keys), (Table::Jars, jar_keys)] {
        for &key in keys {
            // Synthetic accrual rows (negative keys) are not source-backed;
            // they can never fall out of a fetch window.
            if key < 0 {
                continue;
            }
            if tombstones.contains(&key) {
                plan.soft_deletes.push((table, key));
            } else if !window_keys.contains(&key) {
                plan.window_evictions.push((table, key));
            }
        }
    }

    plan
}

/// Counts from one applied plan. `write_failures` records per-key failures
/// that were logged and skipped rather than aborting the batch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ApplySummary {
    pub upserts: usize,
    pub soft_deletes: usize,
    pub evictions: usize,
    pub write_failures: usize,
}

#[derive(Clone)]
pub struct Reconciler {
    db: DatabaseOperations,
    policy: DeletionPolicy,
}

impl Reconciler {
    pub fn new(db: DatabaseOperations, policy: DeletionPolicy) -> Self {
        Self { db, policy }
    }

    /// Applies a plan one key at a time. A failed write is logged and
    /// counted; it never rolls back or blocks the remaining keys, so each
    /// key's final state depends only on its own batch membership.
    pub async fn apply(&self, plan: &ReconcilePlan) -> ApplySummary {
        let mut summary = ApplySummary::default();

        for event in &plan.expense_upserts {
            match self.db.upsert_expense(event).await {
                Ok(()) => summary.upserts += 1,
                Err(e) => {
                    error!("Failed to upsert expense {}: {}", event.message_id, e);
                    summary.write_failures += 1;
                }
            }
        }

        for event in &plan.jar_upserts {
            match self.db.upsert_jar(event).await {
                Ok(()) => summary.upserts += 1,
                Err(e) => {
                    error!("Failed to upsert jar entry {}: {}", event.message_id, e);
                    summary.write_failures += 1;
                }
            }
        }

        for &(table, key) in &plan.soft_deletes {
            match self.db.soft_delete(table, key).await {
                Ok(()) => summary.soft_deletes += 1,
                Err(e) => {
                    error!("Failed to soft-delete {} key {}: {}", table.name(), key, e);
                    summary.write_failures += 1;
                }
            }
        }

        for &(table, key) in &plan.window_evictions {
            let result = match self.policy {
                DeletionPolicy::Hard => self.db.hard_delete(table, key).await,
                DeletionPolicy::Soft => self.db.soft_delete(table, key).await,
            };
            match result {
                Ok(()) => summary.evictions += 1,
                Err(e) => {
                    error!("Failed to evict {} key {}: {}", table.name(), key, e);
                    summary.write_failures += 1;
                }
            }
        }

        info!(
            "Reconciled: {} upserts, {} soft deletes, {} evictions, {} failures",
            summary.upserts, summary.soft_deletes, summary.evictions, summary.write_failures
        );
        summary
    }
}
