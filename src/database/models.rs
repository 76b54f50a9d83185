use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One raw message pulled from the chat source. Immutable once received.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawMessage {
    pub id: i64,
    pub chat_id: i64,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// Parsed expense entry, e.g. "Mercado - 250 - Pago Categoria:Alimentação".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseEvent {
    pub message_id: i64,
    pub timestamp: DateTime<Utc>,
    pub label: String,
    pub amount: f64,
    pub paid: bool,
    pub category: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JarDirection {
    Credit,
    Debit,
}

impl JarDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            JarDirection::Credit => "credit",
            JarDirection::Debit => "debit",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "credit" => Some(JarDirection::Credit),
            "debit" => Some(JarDirection::Debit),
            _ => None,
        }
    }
}

/// Parsed savings-jar entry, e.g. "Caixinha: Viagem - mais 100".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JarEvent {
    pub message_id: i64,
    pub timestamp: DateTime<Utc>,
    pub jar_name: String,
    pub amount: f64,
    pub direction: JarDirection,
}

/// Tagged union of everything the grammar can produce. The event type
/// decides the destination table; message ids are table-agnostic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FinancialEvent {
    Expense(ExpenseEvent),
    Jar(JarEvent),
}

impl FinancialEvent {
    pub fn message_id(&self) -> i64 {
        match self {
            FinancialEvent::Expense(e) => e.message_id,
            FinancialEvent::Jar(j) => j.message_id,
        }
    }
}

/// Outcome of parsing one message body.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    Event(FinancialEvent),
    /// Deletion keyword seen; the caller must tombstone the originating key.
    Tombstone,
}

/// Stored expense row. Key is the source message id; `created_at` is set
/// once on first insert and never overwritten by later upserts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpenseRecord {
    pub message_id: i64,
    pub label: String,
    pub amount: f64,
    pub paid: bool,
    pub category: String,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
}

/// Stored jar ledger row. Accrual entries use synthetic negative keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JarRecord {
    pub message_id: i64,
    pub jar_name: String,
    pub amount: f64,
    pub direction: JarDirection,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
}

/// The two logical tables the reconciler writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Expenses,
    Jars,
}

impl Table {
    pub fn name(&self) -> &'static str {
        match self {
            Table::Expenses => "expenses",
            Table::Jars => "jars",
        }
    }
}
