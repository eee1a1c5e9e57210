use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Tax-status classification that decides the capital-gains rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FilerStatus {
    /// Registered filer, 12.5% CGT
    #[default]
    Filer,
    /// Non-filer, 15% CGT
    NonFiler,
}

impl FilerStatus {
    /// Capital-gains tax rate applied to a positive gain.
    pub fn cgt_rate(&self) -> Decimal {
        match self {
            FilerStatus::Filer => dec!(0.125),
            FilerStatus::NonFiler => dec!(0.15),
        }
    }

    /// Tax owed on a gain. Losses are never taxed and never rebated.
    pub fn tax_on_gain(&self, gain: Decimal) -> Decimal {
        if gain > Decimal::ZERO {
            gain * self.cgt_rate()
        } else {
            Decimal::ZERO
        }
    }
}

impl std::fmt::Display for FilerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilerStatus::Filer => write!(f, "Filer"),
            FilerStatus::NonFiler => write!(f, "Non-Filer"),
        }
    }
}

/// Broker fee schedule.
///
/// Shares priced at or below the tier threshold pay flat per-unit charges;
/// shares above it pay a percentage brokerage plus a tax on that brokerage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSchedule {
    /// Flat brokerage per unit for low-priced shares
    pub low_price_fee: Decimal,

    /// Flat tax per unit for low-priced shares
    pub low_price_tax: Decimal,

    /// Brokerage as a fraction of trade value for high-priced shares
    pub brokerage_rate: Decimal,

    /// Tax as a fraction of the brokerage for high-priced shares
    pub tax_rate: Decimal,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            low_price_fee: dec!(0.03),
            low_price_tax: dec!(0.0045),
            brokerage_rate: dec!(0.0015),
            tax_rate: dec!(0.15),
        }
    }
}

/// User-configurable settings, stored inside the portfolio document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Broker fee schedule used by the fee calculator and the distribution solver.
    #[serde(default)]
    pub fee_schedule: FeeSchedule,

    /// Tax status used for realized and potential CGT.
    #[serde(default)]
    pub filer_status: FilerStatus,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            fee_schedule: FeeSchedule::default(),
            filer_status: FilerStatus::Filer,
        }
    }
}
