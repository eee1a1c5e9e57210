use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::snapshot::normalize_ticker;

/// Kind of ledger transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionKind {
    /// Buying shares with cash
    Buy,
    /// Selling shares for cash
    Sell,
    /// Adding cash to the portfolio
    Deposit,
    /// Taking cash out of the portfolio
    Withdraw,
    /// Cash paid out by a held ticker
    Dividend,
}

impl TransactionKind {
    /// Buy and Sell move shares; the other kinds only move cash.
    pub fn is_trade(&self) -> bool {
        matches!(self, TransactionKind::Buy | TransactionKind::Sell)
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionKind::Buy => write!(f, "Buy"),
            TransactionKind::Sell => write!(f, "Sell"),
            TransactionKind::Deposit => write!(f, "Deposit"),
            TransactionKind::Withdraw => write!(f, "Withdraw"),
            TransactionKind::Dividend => write!(f, "Dividend"),
        }
    }
}

/// Sort order for transaction listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionSortOrder {
    /// Newest date first (default for display)
    DateDesc,
    /// Oldest date first
    DateAsc,
    /// Largest absolute cash movement first
    AmountDesc,
    /// Smallest absolute cash movement first
    AmountAsc,
    /// Alphabetical by ticker (cash-only rows last)
    TickerAsc,
    /// Reverse alphabetical by ticker
    TickerDesc,
}

/// A request to change the ledger. Validated by the ledger before anything is mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRequest {
    pub date: NaiveDate,
    #[serde(default)]
    pub ticker: Option<String>,
    pub kind: TransactionKind,
    /// Shares for trades, cash amount for deposits/withdrawals/dividends
    pub quantity: Decimal,
    #[serde(default)]
    pub price: Decimal,
    #[serde(default)]
    pub fee: Decimal,
    #[serde(default)]
    pub notes: Option<String>,
}

impl TransactionRequest {
    pub fn buy(
        ticker: impl AsRef<str>,
        quantity: Decimal,
        price: Decimal,
        fee: Decimal,
        date: NaiveDate,
    ) -> Self {
        Self::trade(TransactionKind::Buy, ticker, quantity, price, fee, date)
    }

    pub fn sell(
        ticker: impl AsRef<str>,
        quantity: Decimal,
        price: Decimal,
        fee: Decimal,
        date: NaiveDate,
    ) -> Self {
        Self::trade(TransactionKind::Sell, ticker, quantity, price, fee, date)
    }

    pub fn deposit(amount: Decimal, date: NaiveDate) -> Self {
        Self::cash(TransactionKind::Deposit, amount, date)
    }

    pub fn withdraw(amount: Decimal, date: NaiveDate) -> Self {
        Self::cash(TransactionKind::Withdraw, amount, date)
    }

    pub fn dividend(ticker: impl AsRef<str>, amount: Decimal, date: NaiveDate) -> Self {
        Self {
            date,
            ticker: Some(normalize_ticker(ticker.as_ref())),
            kind: TransactionKind::Dividend,
            quantity: amount,
            price: Decimal::ZERO,
            fee: Decimal::ZERO,
            notes: None,
        }
    }

    /// Attach free-text notes.
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    fn trade(
        kind: TransactionKind,
        ticker: impl AsRef<str>,
        quantity: Decimal,
        price: Decimal,
        fee: Decimal,
        date: NaiveDate,
    ) -> Self {
        Self {
            date,
            ticker: Some(normalize_ticker(ticker.as_ref())),
            kind,
            quantity,
            price,
            fee,
            notes: None,
        }
    }

    fn cash(kind: TransactionKind, amount: Decimal, date: NaiveDate) -> Self {
        Self {
            date,
            ticker: None,
            kind,
            quantity: amount,
            price: Decimal::ZERO,
            fee: Decimal::ZERO,
            notes: None,
        }
    }
}

/// A single applied entry in the transaction log.
///
/// Records carry every figure needed to undo them, so reversal never
/// consults current market data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique identifier
    pub id: Uuid,

    /// User-supplied date (not necessarily monotonic with log order)
    pub date: NaiveDate,

    /// Ticker for trades and dividends, `None` for cash movements
    pub ticker: Option<String>,

    pub kind: TransactionKind,

    /// Shares for trades, cash amount otherwise
    pub quantity: Decimal,

    /// Price per share (zero for cash movements)
    pub price: Decimal,

    /// Brokerage fee paid
    pub fee: Decimal,

    /// Capital-gains tax withheld on a sell
    #[serde(default)]
    pub tax: Decimal,

    /// Signed cash effect: negative when cash left the portfolio
    pub total: Decimal,

    /// Realized gain net of fee and tax (sells only)
    pub realized_gain: Decimal,

    /// Cost added to the lot by a buy, or released from it by a sell
    #[serde(default)]
    pub cost_basis: Decimal,

    /// The lot's earliest acquisition date before this trade; `None` if the trade opened the lot
    #[serde(default)]
    pub prior_acquisition: Option<NaiveDate>,

    /// Optional free-text notes
    #[serde(default)]
    pub notes: Option<String>,
}

impl Transaction {
    /// Ticker or an empty string for cash-only rows.
    pub fn ticker_str(&self) -> &str {
        self.ticker.as_deref().unwrap_or("")
    }
}
