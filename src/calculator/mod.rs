pub mod aggregation;
pub mod interest;

pub use aggregation::{aggregate, MonthlyReport};
pub use interest::{accrue_interest, jar_balance, jar_balances};
