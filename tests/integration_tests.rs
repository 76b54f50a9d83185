use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Datelike, Utc};
use chrono_tz::America::Sao_Paulo;
use serial_test::serial;
use tempfile::NamedTempFile;
use tokio::sync::Mutex;

use gastobot::calculator::aggregation::{aggregate, month_bounds};
use gastobot::calculator::interest::jar_balances;
use gastobot::database::models::{ExpenseEvent, JarDirection, JarEvent, RawMessage, Table};
use gastobot::database::DatabaseOperations;
use gastobot::error::GastoBotError;
use gastobot::source::MessageSource;
use gastobot::sync::{DeletionPolicy, SyncService};

// Mock message source, shared-state style so tests can swap the window
// between cycles.
#[derive(Clone)]
struct MockMessageSource {
    messages: Arc<Mutex<Vec<RawMessage>>>,
    should_fail: Arc<Mutex<bool>>,
}

impl MockMessageSource {
    fn new() -> Self {
        Self {
            messages: Arc::new(Mutex::new(Vec::new())),
            should_fail: Arc::new(Mutex::new(false)),
        }
    }

    async fn set_messages(&self, messages: Vec<RawMessage>) {
        *self.messages.lock().await = messages;
    }

    async fn set_should_fail(&self, should_fail: bool) {
        *self.should_fail.lock().await = should_fail;
    }
}

#[async_trait]
impl MessageSource for MockMessageSource {
    async fn fetch_recent(&self) -> gastobot::error::Result<Vec<RawMessage>> {
        if *self.should_fail.lock().await {
            return Err(GastoBotError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "mock source down",
            )));
        }
        Ok(self.messages.lock().await.clone())
    }
}

const CHAT_ID: i64 = 777;

fn msg(id: i64, text: &str) -> RawMessage {
    RawMessage {
        id,
        chat_id: CHAT_ID,
        text: text.to_string(),
        timestamp: Utc::now(),
    }
}

fn expense_event(id: i64, label: &str, amount: f64) -> ExpenseEvent {
    ExpenseEvent {
        message_id: id,
        timestamp: Utc::now(),
        label: label.to_string(),
        amount,
        paid: true,
        category: "Alimentação".to_string(),
    }
}

async fn create_test_db() -> Result<(DatabaseOperations, NamedTempFile)> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file.path().to_str().unwrap();
    let db = DatabaseOperations::new(db_path).await?;
    Ok((db, temp_file))
}

fn create_service(
    source: MockMessageSource,
    db: DatabaseOperations,
    policy: DeletionPolicy,
) -> SyncService {
    SyncService::new(
        Arc::new(source),
        db,
        CHAT_ID,
        5,
        1,
        policy,
        Sao_Paulo,
    )
}

#[tokio::test]
#[serial]
async fn test_full_cycle_writes_both_tables() -> Result<()> {
    let (db, _guard) = create_test_db().await?;
    let source = MockMessageSource::new();
    source
        .set_messages(vec![
            msg(1, "Mercado - 250 - Pago Categoria:Alimentação"),
            msg(2, "Caixinha: Viagem - mais 100"),
            msg(3, "bom dia"),
        ])
        .await;

    let service = create_service(source, db.clone(), DeletionPolicy::Hard);
    let summary = service.run_cycle().await?;

    assert_eq!(summary.expenses, 1);
    assert_eq!(summary.jars, 1);
    assert_eq!(summary.applied.upserts, 2);
    assert_eq!(summary.applied.write_failures, 0);

    let expense_keys = db.non_deleted_keys(Table::Expenses).await?;
    let jar_keys = db.non_deleted_keys(Table::Jars).await?;
    assert!(expense_keys.contains(&1));
    assert!(jar_keys.contains(&2));
    // Message 3 matched no grammar, so no table has it.
    assert!(!expense_keys.contains(&3) && !jar_keys.contains(&3));
    Ok(())
}

#[tokio::test]
#[serial]
async fn test_reconciliation_converges_on_window() -> Result<()> {
    let (db, _guard) = create_test_db().await?;
    let source = MockMessageSource::new();

    // First window seeds keys 1, 2, 3.
    source
        .set_messages(vec![
            msg(1, "Fatura - 100 - Pago"),
            msg(2, "Mercado - 200 - Pago"),
            msg(3, "Aluguel - 300 - Não Pago"),
        ])
        .await;
    let service = create_service(source.clone(), db.clone(), DeletionPolicy::Hard);
    service.run_cycle().await?;

    // Second window drops key 1 and introduces key 4.
    source
        .set_messages(vec![
            msg(2, "Mercado - 200 - Pago"),
            msg(3, "Aluguel - 300 - Não Pago"),
            msg(4, "Transporte - 50 - Pago"),
        ])
        .await;
    let summary = service.run_cycle().await?;

    assert_eq!(summary.applied.upserts, 3);
    assert_eq!(summary.applied.evictions, 1);

    let keys = db.non_deleted_keys(Table::Expenses).await?;
    assert_eq!(keys, [2, 3, 4].into_iter().collect::<HashSet<_>>());
    // Hard policy removed the row entirely.
    assert!(db.get_expense(1).await?.is_none());
    Ok(())
}

#[tokio::test]
#[serial]
async fn test_explicit_tombstone_soft_deletes() -> Result<()> {
    let (db, _guard) = create_test_db().await?;
    let source = MockMessageSource::new();

    source
        .set_messages(vec![
            msg(1, "Fatura - 100 - Pago"),
            msg(2, "Mercado - 200 - Pago"),
        ])
        .await;
    let service = create_service(source.clone(), db.clone(), DeletionPolicy::Hard);
    service.run_cycle().await?;

    // Key 1 is edited into a deletion message.
    source
        .set_messages(vec![
            msg(1, "deletar essa fatura"),
            msg(2, "Mercado - 200 - Pago"),
        ])
        .await;
    let summary = service.run_cycle().await?;

    assert_eq!(summary.tombstones, 1);
    assert_eq!(summary.applied.soft_deletes, 1);
    assert_eq!(summary.applied.evictions, 0);

    let keys = db.non_deleted_keys(Table::Expenses).await?;
    assert_eq!(keys, [2].into_iter().collect::<HashSet<_>>());
    // Soft delete keeps the row, flagged.
    let record = db.get_expense(1).await?.expect("row should survive");
    assert!(record.is_deleted);
    Ok(())
}

#[tokio::test]
#[serial]
async fn test_soft_policy_keeps_evicted_rows() -> Result<()> {
    let (db, _guard) = create_test_db().await?;
    let source = MockMessageSource::new();

    source.set_messages(vec![msg(1, "Fatura - 100 - Pago")]).await;
    let service = create_service(source.clone(), db.clone(), DeletionPolicy::Soft);
    service.run_cycle().await?;

    source.set_messages(vec![msg(2, "Mercado - 200 - Pago")]).await;
    service.run_cycle().await?;

    let record = db.get_expense(1).await?.expect("row should survive");
    assert!(record.is_deleted);
    Ok(())
}

#[tokio::test]
#[serial]
async fn test_reupsert_preserves_created_at() -> Result<()> {
    let (db, _guard) = create_test_db().await?;

    db.upsert_expense(&expense_event(1, "Mercado", 250.0)).await?;
    let original = db.get_expense(1).await?.unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    db.upsert_expense(&expense_event(1, "Mercado", 300.0)).await?;
    let updated = db.get_expense(1).await?.unwrap();

    assert_eq!(updated.amount, 300.0);
    assert_eq!(updated.created_at, original.created_at);
    Ok(())
}

#[tokio::test]
#[serial]
async fn test_reupsert_revives_soft_deleted_key() -> Result<()> {
    let (db, _guard) = create_test_db().await?;

    db.upsert_expense(&expense_event(1, "Mercado", 250.0)).await?;
    db.soft_delete(Table::Expenses, 1).await?;
    assert!(db.get_expense(1).await?.unwrap().is_deleted);

    db.upsert_expense(&expense_event(1, "Mercado", 250.0)).await?;
    assert!(!db.get_expense(1).await?.unwrap().is_deleted);
    Ok(())
}

#[tokio::test]
#[serial]
async fn test_source_failure_aborts_cycle_and_preserves_store() -> Result<()> {
    let (db, _guard) = create_test_db().await?;
    db.upsert_expense(&expense_event(1, "Mercado", 250.0)).await?;

    let source = MockMessageSource::new();
    source.set_should_fail(true).await;
    let service = create_service(source, db.clone(), DeletionPolicy::Hard);

    let result = service.run_cycle().await;
    assert!(result.is_err());

    // Prior state is left untouched on fetch failure.
    let keys = db.non_deleted_keys(Table::Expenses).await?;
    assert_eq!(keys, [1].into_iter().collect::<HashSet<_>>());
    Ok(())
}

#[tokio::test]
#[serial]
async fn test_foreign_chat_messages_are_ignored() -> Result<()> {
    let (db, _guard) = create_test_db().await?;
    let source = MockMessageSource::new();
    source
        .set_messages(vec![RawMessage {
            id: 1,
            chat_id: CHAT_ID + 1,
            text: "Mercado - 250 - Pago".to_string(),
            timestamp: Utc::now(),
        }])
        .await;

    let service = create_service(source, db.clone(), DeletionPolicy::Hard);
    let summary = service.run_cycle().await?;

    assert_eq!(summary.expenses, 0);
    assert!(db.non_deleted_keys(Table::Expenses).await?.is_empty());
    Ok(())
}

#[tokio::test]
#[serial]
async fn test_accrual_runs_at_most_once_per_day() -> Result<()> {
    let (db, _guard) = create_test_db().await?;
    db.upsert_jar(&JarEvent {
        message_id: 1,
        timestamp: Utc::now(),
        jar_name: "Viagem".to_string(),
        amount: 1000.0,
        direction: JarDirection::Credit,
    })
    .await?;

    let source = MockMessageSource::new();
    let service = create_service(source, db.clone(), DeletionPolicy::Hard);

    let first = service.maybe_accrue().await?;
    assert!(!first.skipped);
    assert!(db.last_accrual_date().await?.is_some());

    // Same day again: the durable marker blocks a second application.
    let second = service.maybe_accrue().await?;
    assert!(second.skipped);
    assert!(second.credited.is_empty());
    Ok(())
}

#[tokio::test]
#[serial]
async fn test_accrual_entries_extend_the_ledger() -> Result<()> {
    let (db, _guard) = create_test_db().await?;
    db.upsert_jar(&JarEvent {
        message_id: 1,
        timestamp: Utc::now(),
        jar_name: "Viagem".to_string(),
        amount: 1000.0,
        direction: JarDirection::Credit,
    })
    .await?;

    let key = db.insert_accrual("Viagem", 6.32).await?;
    assert!(key < 0, "accrual keys are synthetic negatives");

    let balances = jar_balances(&db.jar_entries().await?);
    assert_eq!(balances["Viagem"], 1006.32);

    // A second accrual gets a fresh synthetic key below the first.
    let next = db.insert_accrual("Viagem", 6.36).await?;
    assert!(next < key);
    Ok(())
}

#[tokio::test]
#[serial]
async fn test_month_range_query_feeds_aggregation() -> Result<()> {
    let (db, _guard) = create_test_db().await?;
    db.upsert_expense(&expense_event(1, "Mercado", 100.0)).await?;
    db.upsert_expense(&expense_event(2, "Padaria", 50.0)).await?;

    let now_local = Utc::now().with_timezone(&Sao_Paulo);
    let (start, end) =
        month_bounds(now_local.year(), now_local.month(), Sao_Paulo).expect("valid month");
    let records = db.expenses_in_range(start, end).await?;
    assert_eq!(records.len(), 2);

    let report = aggregate(&records, now_local.year(), now_local.month(), Sao_Paulo);
    assert_eq!(report.monthly_total, 150.0);
    assert_eq!(report.totals_by_category["Alimentação"], 150.0);
    Ok(())
}
