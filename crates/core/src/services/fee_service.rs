use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::errors::CoreError;
use crate::models::distribution::{TradeFee, TradeSize};
use crate::models::settings::FeeSchedule;

/// Shares priced at or below this pay flat per-unit charges.
pub const LOW_PRICE_THRESHOLD: Decimal = dec!(20);

/// Computes broker fees and transaction taxes under the tiered schedule.
///
/// Stateless arithmetic.
pub struct FeeService;

impl FeeService {
    pub fn new() -> Self {
        Self
    }

    /// `true` when `price` falls in the flat per-unit tier.
    pub fn is_low_tier(price: Decimal) -> bool {
        price <= LOW_PRICE_THRESHOLD
    }

    /// Fee and tax for a trade sized either in units or in cash.
    pub fn compute_trade_fee(
        &self,
        price: Decimal,
        size: TradeSize,
        schedule: &FeeSchedule,
    ) -> Result<TradeFee, CoreError> {
        let units = match size {
            TradeSize::Units(units) => units,
            TradeSize::Cash(cash) => self.max_affordable_units(price, cash, schedule)?,
        };
        self.charges_for_units(price, units, schedule)
    }

    /// Fee and tax for buying exactly `units` at `price`.
    pub fn charges_for_units(
        &self,
        price: Decimal,
        units: Decimal,
        schedule: &FeeSchedule,
    ) -> Result<TradeFee, CoreError> {
        let (fee, tax) = if Self::is_low_tier(price) {
            (
                units.checked_mul(schedule.low_price_fee),
                units.checked_mul(schedule.low_price_tax),
            )
        } else {
            let fee = units
                .checked_mul(price)
                .and_then(|value| value.checked_mul(schedule.brokerage_rate));
            (fee, fee.and_then(|f| f.checked_mul(schedule.tax_rate)))
        };
        match (fee, tax) {
            (Some(fee), Some(tax)) => Ok(TradeFee { units, fee, tax }),
            _ => Err(CoreError::out_of_range("Trade fee")),
        }
    }

    /// units × price + fee + tax
    pub fn all_in_cost(
        &self,
        price: Decimal,
        units: Decimal,
        schedule: &FeeSchedule,
    ) -> Result<Decimal, CoreError> {
        let charges = self.charges_for_units(price, units, schedule)?;
        units
            .checked_mul(price)
            .and_then(|value| value.checked_add(charges.fee))
            .and_then(|value| value.checked_add(charges.tax))
            .ok_or_else(|| CoreError::out_of_range("Trade cost"))
    }

    /// Largest whole number of units whose all-in cost fits in `cash`.
    ///
    /// Uses the tier's closed form, then settles the boundary with direct
    /// multiplication since decimal division rounds at 28 digits. Fails only
    /// when the unit count itself cannot be represented.
    pub fn max_affordable_units(
        &self,
        price: Decimal,
        cash: Decimal,
        schedule: &FeeSchedule,
    ) -> Result<Decimal, CoreError> {
        if price <= Decimal::ZERO || cash <= Decimal::ZERO {
            return Ok(Decimal::ZERO);
        }

        let estimate = if Self::is_low_tier(price) {
            price
                .checked_add(schedule.low_price_fee)
                .and_then(|p| p.checked_add(schedule.low_price_tax))
                .and_then(|per_unit| cash.checked_div(per_unit))
        } else {
            schedule
                .tax_rate
                .checked_add(Decimal::ONE)
                .and_then(|t| t.checked_mul(schedule.brokerage_rate))
                .and_then(|rate| rate.checked_add(Decimal::ONE))
                .and_then(|divisor| cash.checked_div(divisor))
                .and_then(|investable| investable.checked_div(price))
        }
        .ok_or_else(|| CoreError::out_of_range("Affordable units"))?
        .floor();

        let fits = |units: Decimal| {
            self.all_in_cost(price, units, schedule)
                .map_or(false, |cost| cost <= cash)
        };
        let mut units = estimate.max(Decimal::ZERO);
        while units > Decimal::ZERO && !fits(units) {
            units -= Decimal::ONE;
        }
        while let Some(next) = units.checked_add(Decimal::ONE).filter(|n| fits(*n)) {
            units = next;
        }
        Ok(units)
    }
}

impl Default for FeeService {
    fn default() -> Self {
        Self::new()
    }
}
