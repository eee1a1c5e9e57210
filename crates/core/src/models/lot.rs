use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Aggregated cost-basis position for one ticker.
///
/// A lot only exists while `shares > 0`; the ledger removes it as soon as
/// the last share is sold. The average cost is always derived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lot {
    /// Number of shares held
    pub shares: Decimal,

    /// Total cost of the held shares, fees included
    pub total_cost: Decimal,

    /// Date of the earliest acquisition still represented in the lot
    pub earliest_acquisition: NaiveDate,
}

impl Lot {
    pub fn new(earliest_acquisition: NaiveDate) -> Self {
        Self {
            shares: Decimal::ZERO,
            total_cost: Decimal::ZERO,
            earliest_acquisition,
        }
    }

    /// Average cost per share (zero for an empty lot).
    pub fn average_cost(&self) -> Decimal {
        if self.shares > Decimal::ZERO {
            self.total_cost / self.shares
        } else {
            Decimal::ZERO
        }
    }

    pub fn is_empty(&self) -> bool {
        self.shares <= Decimal::ZERO
    }
}
