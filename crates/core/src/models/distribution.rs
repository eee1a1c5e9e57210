use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How the size of a trade is expressed when asking for its fees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeSize {
    /// A fixed number of units
    Units(Decimal),
    /// A cash budget; resolved to the largest affordable whole number of units
    Cash(Decimal),
}

/// Charges for one trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeFee {
    pub units: Decimal,
    pub fee: Decimal,
    pub tax: Decimal,
}

impl TradeFee {
    /// fee + tax
    pub fn total_charges(&self) -> Decimal {
        self.fee + self.tax
    }
}

/// Purchase order for one ticker produced by the distribution solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionRow {
    pub ticker: String,

    /// Share of the cash amount assigned by the ticker's target
    pub allocated_cash: Decimal,

    pub price: Decimal,

    /// Whole shares to buy
    pub units: Decimal,

    pub fee: Decimal,
    pub tax: Decimal,

    /// units × price + fee + tax, never above `allocated_cash`
    pub net_invested: Decimal,

    /// allocated − net invested
    pub leftover: Decimal,
}

/// Totals over a set of distribution rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DistributionSummary {
    pub allocated_cash: Decimal,
    pub net_invested: Decimal,
    pub fees: Decimal,
    pub taxes: Decimal,
    pub leftover: Decimal,
    pub orders: usize,
}

impl DistributionSummary {
    pub fn from_rows(rows: &[DistributionRow]) -> Self {
        rows.iter().fold(Self::default(), |mut acc, row| {
            acc.allocated_cash += row.allocated_cash;
            acc.net_invested += row.net_invested;
            acc.fees += row.fee;
            acc.taxes += row.tax;
            acc.leftover += row.leftover;
            if row.units > Decimal::ZERO {
                acc.orders += 1;
            }
            acc
        })
    }
}
