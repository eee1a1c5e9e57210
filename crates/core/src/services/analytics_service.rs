use log::debug;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::models::analytics::{DashboardSummary, HoldingRow};
use crate::models::portfolio::Portfolio;
use crate::models::snapshot::PriceSnapshot;
use crate::models::transaction::TransactionKind;

const HUNDRED: Decimal = dec!(100);

/// Computes portfolio analytics: market value, gain/loss, ROI, CGT estimates.
///
/// Everything is derived on demand from the ledger and a price snapshot;
/// nothing here is stored.
pub struct AnalyticsService;

impl AnalyticsService {
    pub fn new() -> Self {
        Self
    }

    /// One row per open lot, largest market value first.
    ///
    /// A ticker missing from the snapshot is valued at its average cost
    /// (zero unrealized gain) and flagged `priced = false`.
    pub fn holding_rows(&self, portfolio: &Portfolio, snapshot: &PriceSnapshot) -> Vec<HoldingRow> {
        let filer = portfolio.settings.filer_status;

        let mut rows: Vec<HoldingRow> = portfolio
            .holdings
            .iter()
            .map(|(ticker, lot)| {
                let average_cost = lot.average_cost();
                let quote = snapshot.get(ticker);
                let current_price = quote.map(|q| q.price).unwrap_or(average_cost);
                let market_value = lot.shares * current_price;
                let unrealized_gain = market_value - lot.total_cost;
                let dividends = portfolio
                    .dividends
                    .get(ticker)
                    .copied()
                    .unwrap_or(Decimal::ZERO);

                HoldingRow {
                    ticker: ticker.clone(),
                    shares: lot.shares,
                    average_cost,
                    total_cost: lot.total_cost,
                    current_price,
                    priced: quote.is_some(),
                    market_value,
                    unrealized_gain,
                    unrealized_pct: pct(unrealized_gain, lot.total_cost),
                    dividends,
                    roi_pct: pct(unrealized_gain + dividends, lot.total_cost),
                    potential_cgt: filer.tax_on_gain(unrealized_gain),
                    allocation_pct: Decimal::ZERO, // filled below
                    compliant: quote.is_some_and(|q| q.compliant),
                    earliest_acquisition: lot.earliest_acquisition,
                }
            })
            .collect();

        let total_value: Decimal = rows.iter().map(|r| r.market_value).sum();
        for row in &mut rows {
            row.allocation_pct = pct(row.market_value, total_value);
        }

        rows.sort_by(|a, b| {
            b.market_value
                .cmp(&a.market_value)
                .then_with(|| a.ticker.cmp(&b.ticker))
        });
        rows
    }

    /// Dashboard aggregates over the holding rows plus the cash side of the ledger.
    pub fn dashboard(&self, portfolio: &Portfolio, snapshot: &PriceSnapshot) -> DashboardSummary {
        let rows = self.holding_rows(portfolio, snapshot);

        let total_cost: Decimal = rows.iter().map(|r| r.total_cost).sum();
        let market_value: Decimal = rows.iter().map(|r| r.market_value).sum();
        let unrealized_gain = market_value - total_cost;
        let potential_cgt: Decimal = rows.iter().map(|r| r.potential_cgt).sum();
        let compliant_value: Decimal = rows
            .iter()
            .filter(|r| r.compliant)
            .map(|r| r.market_value)
            .sum();
        let total_dividends: Decimal = portfolio.dividends.values().copied().sum();

        let net_deposits: Decimal = portfolio
            .transactions
            .iter()
            .map(|t| match t.kind {
                TransactionKind::Deposit => t.quantity,
                TransactionKind::Withdraw => -t.quantity,
                _ => Decimal::ZERO,
            })
            .sum();

        let total_return = unrealized_gain + portfolio.realized_gain + total_dividends;

        debug!(
            "Dashboard over {} holdings: market value {market_value}, cash {}",
            rows.len(),
            portfolio.cash
        );

        DashboardSummary {
            cash: portfolio.cash,
            total_cost,
            market_value,
            total_value: market_value + portfolio.cash,
            unrealized_gain,
            unrealized_pct: pct(unrealized_gain, total_cost),
            realized_gain: portfolio.realized_gain,
            total_dividends,
            total_return,
            total_return_pct: pct(total_return, net_deposits),
            net_deposits,
            potential_cgt,
            compliant_pct: pct(compliant_value, market_value),
            holdings_count: rows.len(),
            transaction_count: portfolio.transactions.len(),
            inception_date: portfolio.transactions.iter().map(|t| t.date).min(),
        }
    }
}

impl Default for AnalyticsService {
    fn default() -> Self {
        Self::new()
    }
}

/// part / whole × 100, or zero when `whole` is not positive.
fn pct(part: Decimal, whole: Decimal) -> Decimal {
    if whole > Decimal::ZERO {
        part / whole * HUNDRED
    } else {
        Decimal::ZERO
    }
}
