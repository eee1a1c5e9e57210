use log::{info, warn};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::{BTreeMap, BTreeSet};

use crate::errors::CoreError;
use crate::models::analytics::{ContributionRow, DriftRow};
use crate::models::lot::Lot;
use crate::models::portfolio::Portfolio;
use crate::models::snapshot::normalize_ticker;

/// Allowed distance between the sum of targets and 100%.
pub const ALLOCATION_TOLERANCE: Decimal = dec!(0.01);

const HUNDRED: Decimal = dec!(100);

/// Owns the target allocation map and measures holdings against it.
///
/// All weights are measured on cost basis, not market value, so the plan
/// does not swing with intraday prices.
pub struct AllocationService;

impl AllocationService {
    pub fn new() -> Self {
        Self
    }

    /// Replace the targets after validating them.
    ///
    /// Tickers already known (existing targets or open lots) but absent from
    /// `new_targets` stay in the map at 0%.
    pub fn update_targets<I, S>(&self, portfolio: &mut Portfolio, new_targets: I) -> Result<(), CoreError>
    where
        I: IntoIterator<Item = (S, Decimal)>,
        S: AsRef<str>,
    {
        let mut incoming: BTreeMap<String, Decimal> = BTreeMap::new();
        for (raw, pct) in new_targets {
            let ticker = normalize_ticker(raw.as_ref());
            if ticker.is_empty() {
                continue;
            }
            if incoming.insert(ticker.clone(), pct).is_some() {
                let e = CoreError::InvalidAllocation(format!("duplicate target for {ticker}"));
                warn!("Rejected target update: {e}");
                return Err(e);
            }
        }

        if let Err(e) = Self::validate_targets(&incoming) {
            warn!("Rejected target update: {e}");
            return Err(e);
        }

        let universe: BTreeSet<String> = portfolio
            .targets
            .keys()
            .chain(portfolio.holdings.keys())
            .chain(incoming.keys())
            .cloned()
            .collect();
        portfolio.targets = universe
            .into_iter()
            .map(|t| {
                let pct = incoming.get(&t).copied().unwrap_or(Decimal::ZERO);
                (t, pct)
            })
            .collect();

        info!(
            "Updated targets: {} tickers, {} with a non-zero weight",
            portfolio.targets.len(),
            portfolio.targets.values().filter(|p| !p.is_zero()).count()
        );
        Ok(())
    }

    /// Check that every weight is within 0..=100 and that the weights sum to
    /// 100 (±0.01). An empty or all-zero map means "no targets set" and passes.
    pub fn validate_targets(targets: &BTreeMap<String, Decimal>) -> Result<(), CoreError> {
        if let Some((ticker, pct)) = targets
            .iter()
            .find(|(_, pct)| **pct < Decimal::ZERO || **pct > HUNDRED)
        {
            return Err(CoreError::InvalidAllocation(format!(
                "target for {ticker} must be between 0 and 100, got {pct}"
            )));
        }

        if targets.values().all(|p| p.is_zero()) {
            return Ok(());
        }

        let sum: Decimal = targets.values().copied().sum();
        if (sum - HUNDRED).abs() > ALLOCATION_TOLERANCE {
            return Err(CoreError::InvalidAllocation(format!(
                "targets sum to {sum}%, expected 100%"
            )));
        }
        Ok(())
    }

    /// Current cost-basis weight minus target weight, per ticker.
    ///
    /// Covers every ticker that is either held or targeted, in ticker order.
    pub fn compute_drift(
        &self,
        holdings: &BTreeMap<String, Lot>,
        targets: &BTreeMap<String, Decimal>,
    ) -> Vec<DriftRow> {
        let total_cost: Decimal = holdings.values().map(|l| l.total_cost).sum();
        let tickers: BTreeSet<&String> = holdings.keys().chain(targets.keys()).collect();

        tickers
            .into_iter()
            .map(|ticker| {
                let cost = holdings.get(ticker).map(|l| l.total_cost).unwrap_or(Decimal::ZERO);
                let current_pct = if total_cost > Decimal::ZERO {
                    cost / total_cost * HUNDRED
                } else {
                    Decimal::ZERO
                };
                let target_pct = targets.get(ticker).copied().unwrap_or(Decimal::ZERO);
                DriftRow {
                    ticker: ticker.clone(),
                    current_pct,
                    target_pct,
                    drift: current_pct - target_pct,
                }
            })
            .collect()
    }

    /// Split `new_cash` across targeted tickers to close their cost-basis shortfall.
    ///
    /// Each ticker's shortfall is `(total cost + new cash) × target − cost`,
    /// floored at zero. When shortfalls exceed the new cash they are scaled
    /// down proportionally. Overweight tickers receive nothing.
    pub fn plan_contributions(
        &self,
        holdings: &BTreeMap<String, Lot>,
        targets: &BTreeMap<String, Decimal>,
        new_cash: Decimal,
    ) -> Result<Vec<ContributionRow>, CoreError> {
        if new_cash < Decimal::ZERO {
            return Err(CoreError::ValidationError(format!(
                "Contribution amount can't be negative, got {new_cash}"
            )));
        }

        let total_after = holdings
            .values()
            .try_fold(new_cash, |acc, lot| acc.checked_add(lot.total_cost))
            .ok_or_else(|| CoreError::out_of_range("Portfolio cost after contribution"))?;

        let mut rows: Vec<ContributionRow> = targets
            .iter()
            .filter(|(_, pct)| **pct > Decimal::ZERO)
            .map(|(ticker, pct)| {
                let current_cost = holdings.get(ticker).map(|l| l.total_cost).unwrap_or(Decimal::ZERO);
                let target_cost = total_after * (*pct / HUNDRED);
                ContributionRow {
                    ticker: ticker.clone(),
                    current_cost,
                    target_cost,
                    contribution: (target_cost - current_cost).max(Decimal::ZERO),
                }
            })
            .collect();

        let shortfall = rows
            .iter()
            .try_fold(Decimal::ZERO, |acc, r| acc.checked_add(r.contribution))
            .ok_or_else(|| CoreError::out_of_range("Contribution shortfall"))?;
        if shortfall > new_cash && shortfall > Decimal::ZERO {
            let scale = new_cash / shortfall;
            for row in &mut rows {
                row.contribution *= scale;
            }
        }
        Ok(rows)
    }
}

impl Default for AllocationService {
    fn default() -> Self {
        Self::new()
    }
}
