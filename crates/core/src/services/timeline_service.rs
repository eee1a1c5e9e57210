use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::errors::CoreError;
use crate::models::portfolio::Portfolio;
use crate::models::timeline::{TimelineEvent, TimelinePoint};
use crate::models::transaction::{Transaction, TransactionKind};

/// Generates chart-ready timelines by replaying the transaction log.
///
/// The log is in application order, which need not match `date`, so the
/// replay sorts by date first (stable, so same-day records keep their order).
/// The frontend only renders the points.
pub struct TimelineService;

impl TimelineService {
    pub fn new() -> Self {
        Self
    }

    /// One point per distinct transaction date, oldest first.
    pub fn generate_timeline(&self, portfolio: &Portfolio) -> Vec<TimelinePoint> {
        self.replay(portfolio, None, None)
    }

    /// Points whose date falls in `from..=to`. Figures stay cumulative from
    /// the very first transaction, not from `from`.
    pub fn generate_timeline_in_range(
        &self,
        portfolio: &Portfolio,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<TimelinePoint>, CoreError> {
        if from > to {
            return Err(CoreError::ValidationError(format!(
                "'from' date ({from}) must not be after 'to' date ({to})"
            )));
        }
        Ok(self.replay(portfolio, Some(from), Some(to)))
    }

    fn replay(
        &self,
        portfolio: &Portfolio,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Vec<TimelinePoint> {
        let mut ordered: Vec<&Transaction> = portfolio.transactions.iter().collect();
        ordered.sort_by_key(|t| t.date);

        let mut points: Vec<TimelinePoint> = Vec::new();
        let mut invested = Decimal::ZERO;
        let mut net_deposits = Decimal::ZERO;
        let mut realized_gain = Decimal::ZERO;
        let mut dividends = Decimal::ZERO;

        let mut idx = 0;
        while idx < ordered.len() {
            let date = ordered[idx].date;
            let mut events = Vec::new();

            // Apply every transaction on this date
            while idx < ordered.len() && ordered[idx].date == date {
                let tx = ordered[idx];
                match tx.kind {
                    TransactionKind::Buy => invested += tx.cost_basis,
                    TransactionKind::Sell => {
                        invested -= tx.cost_basis;
                        realized_gain += tx.realized_gain;
                    }
                    TransactionKind::Deposit => net_deposits += tx.quantity,
                    TransactionKind::Withdraw => net_deposits -= tx.quantity,
                    TransactionKind::Dividend => dividends += tx.quantity,
                }
                events.push(TimelineEvent {
                    kind: tx.kind,
                    ticker: tx.ticker.clone(),
                    quantity: tx.quantity,
                    total: tx.total,
                });
                idx += 1;
            }

            let in_range = from.map_or(true, |f| date >= f) && to.map_or(true, |t| date <= t);
            if in_range {
                points.push(TimelinePoint {
                    date,
                    invested,
                    net_deposits,
                    realized_gain,
                    dividends,
                    profit_loss: realized_gain + dividends,
                    events,
                });
            }
        }

        points
    }
}

impl Default for TimelineService {
    fn default() -> Self {
        Self::new()
    }
}
