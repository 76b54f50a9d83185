use crate::database::models::{
    ExpenseEvent, ExpenseRecord, JarDirection, JarEvent, JarRecord, Table,
};
use crate::error::Result;
use chrono::{DateTime, NaiveDate, Utc};
use log::{debug, info, warn};
use rusqlite::{params, Connection};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Metadata key holding the durable last-accrual-date marker.
const LAST_ACCRUAL_KEY: &str = "last_accrual_date";

#[derive(Clone, Debug)]
pub struct DatabaseOperations {
    conn: Arc<Mutex<Connection>>,
}

impl DatabaseOperations {
    pub async fn new(database_url: &str) -> Result<Self> {
        let conn = Connection::open(database_url)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.init_schema().await?;
        Ok(db)
    }

    async fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock().await;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS expenses (
                message_id INTEGER PRIMARY KEY,
                label TEXT NOT NULL,
                amount REAL NOT NULL,
                paid BOOLEAN NOT NULL DEFAULT FALSE,
                category TEXT NOT NULL,
                is_deleted BOOLEAN NOT NULL DEFAULT FALSE,
                created_at DATETIME NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS jars (
                message_id INTEGER PRIMARY KEY,
                jar_name TEXT NOT NULL,
                amount REAL NOT NULL,
                direction TEXT NOT NULL,
                is_deleted BOOLEAN NOT NULL DEFAULT FALSE,
                created_at DATETIME NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )?;

        info!("Database schema initialized successfully");
        Ok(())
    }

    /// Upserts an expense keyed by its source message id. The update arm
    /// never touches `created_at`, so re-upserting an existing key keeps the
    /// original insertion time. A reappearing key also clears the soft-delete
    /// flag.
    pub async fn upsert_expense(&self, event: &ExpenseEvent) -> Result<()> {
        let conn = self.conn.lock().await;
        let now = Utc::now();

        conn.execute(
            "INSERT INTO expenses (message_id, label, amount, paid, category, is_deleted, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, FALSE, ?6)
             ON CONFLICT(message_id) DO UPDATE SET
                label = excluded.label,
                amount = excluded.amount,
                paid = excluded.paid,
                category = excluded.category,
                is_deleted = FALSE",
            params![
                event.message_id,
                event.label,
                event.amount,
                event.paid,
                event.category,
                now
            ],
        )?;

        debug!("Upserted expense {}: {}", event.message_id, event.label);
        Ok(())
    }

    /// Upserts a jar ledger entry keyed by its source message id, preserving
    /// `created_at` the same way as expenses.
    pub async fn upsert_jar(&self, event: &JarEvent) -> Result<()> {
        let conn = self.conn.lock().await;
        let now = Utc::now();

        conn.execute(
            "INSERT INTO jars (message_id, jar_name, amount, direction, is_deleted, created_at)
             VALUES (?1, ?2, ?3, ?4, FALSE, ?5)
             ON CONFLICT(message_id) DO UPDATE SET
                jar_name = excluded.jar_name,
                amount = excluded.amount,
                direction = excluded.direction,
                is_deleted = FALSE",
            params![
                event.message_id,
                event.jar_name,
                event.amount,
                event.direction.as_str(),
                now
            ],
        )?;

        debug!("Upserted jar entry {}: {}", event.message_id, event.jar_name);
        Ok(())
    }

    /// All live (non-deleted) keys of one table.
    pub async fn non_deleted_keys(&self, table: Table) -> Result<HashSet<i64>> {
        let conn = self.conn.lock().await;

        let sql = format!(
            "SELECT message_id FROM {} WHERE is_deleted = FALSE",
            table.name()
        );
        let mut stmt = conn.prepare(&sql)?;
        let keys = stmt
            .query_map([], |row| row.get::<_, i64>(0))?
            .collect::<std::result::Result<HashSet<_>, _>>()?;

        Ok(keys)
    }

    pub async fn soft_delete(&self, table: Table, key: i64) -> Result<()> {
        let conn = self.conn.lock().await;

        let sql = format!(
            "UPDATE {} SET is_deleted = TRUE WHERE message_id = ?1",
            table.name()
        );
        conn.execute(&sql, params![key])?;

        debug!("Soft-deleted {} key {}", table.name(), key);
        Ok(())
    }

    pub async fn hard_delete(&self, table: Table, key: i64) -> Result<()> {
        let conn = self.conn.lock().await;

        let sql = format!("DELETE FROM {} WHERE message_id = ?1", table.name());
        conn.execute(&sql, params![key])?;

        debug!("Hard-deleted {} key {}", table.name(), key);
        Ok(())
    }

    /// Non-deleted expenses whose `created_at` falls within the inclusive
    /// range.
    pub async fn expenses_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ExpenseRecord>> {
        let conn = self.conn.lock().await;

        let mut stmt = conn.prepare(
            "SELECT message_id, label, amount, paid, category, is_deleted, created_at
             FROM expenses
             WHERE is_deleted = FALSE AND created_at >= ?1 AND created_at <= ?2",
        )?;
        let records = stmt
            .query_map(params![start, end], |row| {
                Ok(ExpenseRecord {
                    message_id: row.get(0)?,
                    label: row.get(1)?,
                    amount: row.get(2)?,
                    paid: row.get(3)?,
                    category: row.get(4)?,
                    is_deleted: row.get(5)?,
                    created_at: row.get(6)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records)
    }

    pub async fn get_expense(&self, key: i64) -> Result<Option<ExpenseRecord>> {
        let conn = self.conn.lock().await;

        let mut stmt = conn.prepare(
            "SELECT message_id, label, amount, paid, category, is_deleted, created_at
             FROM expenses WHERE message_id = ?1",
        )?;
        let mut rows = stmt.query_map(params![key], |row| {
            Ok(ExpenseRecord {
                message_id: row.get(0)?,
                label: row.get(1)?,
                amount: row.get(2)?,
                paid: row.get(3)?,
                category: row.get(4)?,
                is_deleted: row.get(5)?,
                created_at: row.get(6)?,
            })
        })?;

        match rows.next() {
            Some(record) => Ok(Some(record?)),
            None => Ok(None),
        }
    }

    /// The full non-deleted jar ledger, oldest first. Balances are always
    /// recomputed from this ledger; no running total is persisted.
    pub async fn jar_entries(&self) -> Result<Vec<JarRecord>> {
        let conn = self.conn.lock().await;

        let mut stmt = conn.prepare(
            "SELECT message_id, jar_name, amount, direction, is_deleted, created_at
             FROM jars
             WHERE is_deleted = FALSE
             ORDER BY created_at ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, f64>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, bool>(4)?,
                row.get::<_, DateTime<Utc>>(5)?,
            ))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (message_id, jar_name, amount, direction, is_deleted, created_at) = row?;
            match JarDirection::parse(&direction) {
                Some(direction) => entries.push(JarRecord {
                    message_id,
                    jar_name,
                    amount,
                    direction,
                    is_deleted,
                    created_at,
                }),
                // A corrupted direction must not count toward any balance.
                None => warn!(
                    "Unknown direction {:?} for jar entry {}, skipping",
                    direction, message_id
                ),
            }
        }

        Ok(entries)
    }

    /// Appends a simulated interest credit to a jar's ledger. Accrual rows
    /// get synthetic negative keys so they can never collide with source
    /// message ids.
    pub async fn insert_accrual(&self, jar_name: &str, amount: f64) -> Result<i64> {
        let conn = self.conn.lock().await;
        let now = Utc::now();

        let min_key: i64 = conn.query_row(
            "SELECT COALESCE(MIN(message_id), 0) FROM jars",
            [],
            |row| row.get(0),
        )?;
        let key = min_key.min(0) - 1;

        conn.execute(
            "INSERT INTO jars (message_id, jar_name, amount, direction, is_deleted, created_at)
             VALUES (?1, ?2, ?3, 'credit', FALSE, ?4)",
            params![key, jar_name, amount, now],
        )?;

        info!("Accrued {:.2} to jar {} (key {})", amount, jar_name, key);
        Ok(key)
    }

    /// The date the last interest accrual ran, if any.
    pub async fn last_accrual_date(&self) -> Result<Option<NaiveDate>> {
        let conn = self.conn.lock().await;

        let mut stmt = conn.prepare("SELECT value FROM meta WHERE key = ?1")?;
        let mut rows = stmt.query_map(params![LAST_ACCRUAL_KEY], |row| {
            row.get::<_, String>(0)
        })?;

        match rows.next() {
            Some(value) => Ok(NaiveDate::parse_from_str(&value?, "%Y-%m-%d").ok()),
            None => Ok(None),
        }
    }

    pub async fn set_last_accrual_date(&self, date: NaiveDate) -> Result<()> {
        let conn = self.conn.lock().await;

        conn.execute(
            "INSERT INTO meta (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![LAST_ACCRUAL_KEY, date.format("%Y-%m-%d").to_string()],
        )?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorSeverity, GastoBotError};
    use tempfile::NamedTempFile;

    async fn create_test_db() -> (DatabaseOperations, NamedTempFile) {
        let temp_file = NamedTempFile::new().unwrap();
        let db = DatabaseOperations::new(temp_file.path().to_str().unwrap())
            .await
            .unwrap();
        (db, temp_file)
    }

    #[tokio::test]
    async fn open_failure_surfaces_as_database_error() {
        let err = DatabaseOperations::new("/nonexistent-dir/gastobot.db")
            .await
            .unwrap_err();
        assert!(matches!(err, GastoBotError::Database(_)));
        assert!(err.is_retryable());
        assert_eq!(err.severity(), ErrorSeverity::High);
    }

    #[tokio::test]
    async fn unknown_jar_direction_is_skipped() {
        let (db, _guard) = create_test_db().await;
        db.upsert_jar(&JarEvent {
            message_id: 1,
            timestamp: Utc::now(),
            jar_name: "Viagem".to_string(),
            amount: 100.0,
            direction: JarDirection::Credit,
        })
        .await
        .unwrap();

        {
            let conn = db.conn.lock().await;
            conn.execute(
                "INSERT INTO jars (message_id, jar_name, amount, direction, is_deleted, created_at)
                 VALUES (2, 'Viagem', 500.0, 'sideways', FALSE, ?1)",
                params![Utc::now()],
            )
            .unwrap();
        }

        let entries = db.jar_entries().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message_id, 1);
        assert_eq!(entries[0].amount, 100.0);
    }
}
