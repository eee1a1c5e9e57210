use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One row of the portfolio table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldingRow {
    pub ticker: String,

    /// Shares held
    pub shares: Decimal,

    /// Average cost per share, fees included
    pub average_cost: Decimal,

    /// Cost basis of the held shares
    pub total_cost: Decimal,

    /// Snapshot price, or the average cost when the snapshot has no quote
    pub current_price: Decimal,

    /// Whether `current_price` came from the snapshot
    pub priced: bool,

    /// shares × current price
    pub market_value: Decimal,

    /// market value − total cost
    pub unrealized_gain: Decimal,

    /// unrealized gain / total cost × 100
    pub unrealized_pct: Decimal,

    /// Dividends received from this ticker
    pub dividends: Decimal,

    /// (unrealized gain + dividends) / total cost × 100
    pub roi_pct: Decimal,

    /// CGT that would be due if the position were sold at the current price
    pub potential_cgt: Decimal,

    /// This row's market value / total market value × 100
    pub allocation_pct: Decimal,

    /// Compliance flag from the snapshot (false when unquoted)
    pub compliant: bool,

    pub earliest_acquisition: NaiveDate,
}

/// Aggregates shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub cash: Decimal,
    pub total_cost: Decimal,
    pub market_value: Decimal,

    /// market value + cash
    pub total_value: Decimal,

    pub unrealized_gain: Decimal,
    pub unrealized_pct: Decimal,
    pub realized_gain: Decimal,
    pub total_dividends: Decimal,

    /// unrealized + realized + dividends
    pub total_return: Decimal,

    /// total return / net deposits × 100
    pub total_return_pct: Decimal,

    /// deposits − withdrawals
    pub net_deposits: Decimal,

    pub potential_cgt: Decimal,

    /// Share of market value held in compliance-flagged tickers
    pub compliant_pct: Decimal,

    pub holdings_count: usize,
    pub transaction_count: usize,
    pub inception_date: Option<NaiveDate>,
}

/// Current vs target allocation for one ticker, measured on cost basis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftRow {
    pub ticker: String,
    pub current_pct: Decimal,
    pub target_pct: Decimal,

    /// current − target; positive means overweight
    pub drift: Decimal,
}

/// Cash to direct at one ticker so that cost-basis weights move toward target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContributionRow {
    pub ticker: String,
    pub current_cost: Decimal,
    pub target_cost: Decimal,
    pub contribution: Decimal,
}
