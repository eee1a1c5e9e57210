use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::alert::Alert;
use super::lot::Lot;
use super::settings::Settings;
use super::transaction::Transaction;

/// Cash that was deposited and has not yet been put to work by a distribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashDeposit {
    /// The Deposit transaction that produced this cash
    pub transaction_id: Uuid,
    pub date: NaiveDate,
    pub amount: Decimal,
}

/// The main data container. Everything in here gets serialized,
/// encrypted, and handed to the persistence collaborator.
///
/// Contains the transaction log plus every running total derived from it,
/// the allocation targets and the user settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    /// Opaque authenticated owner supplied by the identity collaborator
    pub owner: String,

    /// Portfolio name, unique per owner
    pub name: String,

    /// When the portfolio was first created
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    /// Append-only transaction log, in application order
    pub transactions: Vec<Transaction>,

    /// Open lots keyed by ticker. A ticker is present only while shares > 0.
    pub holdings: BTreeMap<String, Lot>,

    /// Accumulated dividend cash per ticker
    pub dividends: BTreeMap<String, Decimal>,

    /// Running realized gain, net of fees and taxes
    pub realized_gain: Decimal,

    /// Cash balance (never negative)
    pub cash: Decimal,

    /// Deposits not yet invested by a distribution
    #[serde(default)]
    pub deposit_log: Vec<CashDeposit>,

    /// Target allocation percent per ticker
    #[serde(default)]
    pub targets: BTreeMap<String, Decimal>,

    /// Fee schedule and tax status
    pub settings: Settings,

    /// Informational change log
    #[serde(default)]
    pub alerts: Vec<Alert>,
}

impl Portfolio {
    /// Create an empty portfolio: zero cash, no holdings, default settings.
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            ..Self::default()
        }
    }
}

impl Default for Portfolio {
    fn default() -> Self {
        Self {
            owner: String::new(),
            name: String::new(),
            created_at: Utc::now(),
            transactions: Vec::new(),
            holdings: BTreeMap::new(),
            dividends: BTreeMap::new(),
            realized_gain: Decimal::ZERO,
            cash: Decimal::ZERO,
            deposit_log: Vec::new(),
            targets: BTreeMap::new(),
            settings: Settings::default(),
            alerts: Vec::new(),
        }
    }
}
