use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::transaction::TransactionKind;

/// Cumulative figures at the end of one transaction date.
///
/// Generated by the core; the frontend just renders them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelinePoint {
    pub date: NaiveDate,

    /// Cost basis of open positions after this date's transactions
    pub invested: Decimal,

    /// Deposits minus withdrawals so far
    pub net_deposits: Decimal,

    pub realized_gain: Decimal,
    pub dividends: Decimal,

    /// realized gain + dividends
    pub profit_loss: Decimal,

    /// Transactions that happened on this date
    pub events: Vec<TimelineEvent>,
}

/// A transaction annotation on a timeline point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub kind: TransactionKind,
    pub ticker: Option<String>,
    pub quantity: Decimal,

    /// Signed cash effect
    pub total: Decimal,
}
