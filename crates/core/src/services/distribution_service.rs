use chrono::NaiveDate;
use log::{debug, info, warn};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::BTreeMap;

use crate::errors::CoreError;
use crate::models::distribution::DistributionRow;
use crate::models::portfolio::Portfolio;
use crate::models::settings::FeeSchedule;
use crate::models::snapshot::{PriceQuote, PriceSnapshot};
use crate::models::transaction::{Transaction, TransactionRequest};
use crate::services::fee_service::FeeService;
use crate::services::ledger_service::LedgerService;

const HUNDRED: Decimal = dec!(100);

/// Converts a lump of cash into whole-share purchase orders.
///
/// Each ticker is solved on its own with the fee tier's closed form.
/// Leftover cash from one ticker is never handed to another.
pub struct DistributionService {
    fee_service: FeeService,
    ledger_service: LedgerService,
}

impl DistributionService {
    pub fn new() -> Self {
        Self {
            fee_service: FeeService::new(),
            ledger_service: LedgerService::new(),
        }
    }

    /// One row per ticker with a positive target and a positive quote, in ticker order.
    pub fn calculate_distribution(
        &self,
        cash_amount: Decimal,
        targets: &BTreeMap<String, Decimal>,
        snapshot: &PriceSnapshot,
        schedule: &FeeSchedule,
    ) -> Result<Vec<DistributionRow>, CoreError> {
        if cash_amount < Decimal::ZERO {
            return Err(CoreError::ValidationError(format!(
                "Distribution amount can't be negative, got {cash_amount}"
            )));
        }

        let mut rows = Vec::new();
        for (ticker, pct) in targets.iter().filter(|(_, pct)| **pct > Decimal::ZERO) {
            let Some(price) = snapshot.price(ticker) else {
                continue;
            };
            // pct / 100 ≤ 1, so the allocation never exceeds the cash amount
            let allocated_cash = cash_amount * (*pct / HUNDRED);
            let units = self
                .fee_service
                .max_affordable_units(price, allocated_cash, schedule)?;
            let charges = self.fee_service.charges_for_units(price, units, schedule)?;
            let net_invested = self.fee_service.all_in_cost(price, units, schedule)?;
            rows.push(DistributionRow {
                ticker: ticker.clone(),
                allocated_cash,
                price,
                units,
                fee: charges.fee,
                tax: charges.tax,
                net_invested,
                leftover: allocated_cash - net_invested,
            });
        }

        debug!(
            "Distributed {cash_amount} across {} tickers ({} skipped)",
            rows.len(),
            targets.len() - rows.len()
        );
        Ok(rows)
    }

    /// Same algorithm restricted to compliance-flagged tickers, with the
    /// surviving targets rescaled to sum to 100.
    pub fn calculate_compliant_distribution(
        &self,
        cash_amount: Decimal,
        targets: &BTreeMap<String, Decimal>,
        snapshot: &PriceSnapshot,
        schedule: &FeeSchedule,
    ) -> Result<Vec<DistributionRow>, CoreError> {
        let universe = snapshot.compliant_subset();
        let renormalized = Self::renormalize_targets(targets, &universe);
        self.calculate_distribution(cash_amount, &renormalized, &universe, schedule)
    }

    /// Keep the positive targets quoted in `universe` and rescale them to sum to 100.
    /// Returns an empty map when nothing survives.
    pub fn renormalize_targets(
        targets: &BTreeMap<String, Decimal>,
        universe: &PriceSnapshot,
    ) -> BTreeMap<String, Decimal> {
        let eligible: BTreeMap<String, Decimal> = targets
            .iter()
            .filter(|(t, pct)| **pct > Decimal::ZERO && universe.contains(t))
            .map(|(t, pct)| (t.clone(), *pct))
            .collect();
        let sum: Decimal = eligible.values().copied().sum();
        if sum <= Decimal::ZERO {
            return BTreeMap::new();
        }
        eligible
            .into_iter()
            .map(|(t, pct)| (t, pct / sum * HUNDRED))
            .collect()
    }

    /// Book a Buy for every row with units > 0, charging fee + tax as the
    /// trade fee, then clear the deposit log.
    ///
    /// All-or-nothing: if any buy is rejected the portfolio is untouched.
    pub fn execute_distribution(
        &self,
        portfolio: &mut Portfolio,
        rows: &[DistributionRow],
        date: NaiveDate,
    ) -> Result<Vec<Transaction>, CoreError> {
        let orders: Vec<&DistributionRow> =
            rows.iter().filter(|r| r.units > Decimal::ZERO).collect();

        // The rows carry the quotes they were solved against.
        let quoted = PriceSnapshot::from_quotes(
            orders
                .iter()
                .map(|r| (r.ticker.as_str(), PriceQuote::new(r.price, false))),
        );

        let mut temp_portfolio = portfolio.clone();
        let mut applied = Vec::with_capacity(orders.len());
        for row in orders {
            let request = TransactionRequest::buy(
                &row.ticker,
                row.units,
                row.price,
                row.fee + row.tax,
                date,
            )
            .with_notes("Cash distribution");
            match self.ledger_service.apply(&mut temp_portfolio, request, &quoted) {
                Ok(tx) => applied.push(tx),
                Err(e) => {
                    warn!("Distribution aborted at {}: {e}", row.ticker);
                    return Err(e);
                }
            }
        }

        temp_portfolio.deposit_log.clear();
        *portfolio = temp_portfolio;
        info!(
            "Executed distribution: {} buys, cash now {}",
            applied.len(),
            portfolio.cash
        );
        Ok(applied)
    }
}

impl Default for DistributionService {
    fn default() -> Self {
        Self::new()
    }
}
