use chrono::NaiveDate;
use log::{debug, info, warn};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::errors::CoreError;
use crate::models::alert::Alert;
use crate::models::lot::Lot;
use crate::models::portfolio::{CashDeposit, Portfolio};
use crate::models::snapshot::{normalize_ticker, PriceSnapshot};
use crate::models::transaction::{Transaction, TransactionKind, TransactionRequest};

/// Applies and reverses ledger transactions.
///
/// Every operation validates fully before touching the portfolio, so a
/// rejected call leaves cash, holdings and the log exactly as they were.
/// Pure business logic with no I/O.
pub struct LedgerService;

impl LedgerService {
    pub fn new() -> Self {
        Self
    }

    /// Validate a request and apply it. Returns the appended record.
    pub fn apply(
        &self,
        portfolio: &mut Portfolio,
        request: TransactionRequest,
        snapshot: &PriceSnapshot,
    ) -> Result<Transaction, CoreError> {
        let kind = request.kind;
        let result = Self::validate_amounts(&request).and_then(|_| match kind {
            TransactionKind::Buy => self.apply_buy(portfolio, request, snapshot),
            TransactionKind::Sell => self.apply_sell(portfolio, request, snapshot),
            TransactionKind::Deposit => self.apply_deposit(portfolio, request),
            TransactionKind::Withdraw => self.apply_withdraw(portfolio, request),
            TransactionKind::Dividend => self.apply_dividend(portfolio, request),
        });

        match &result {
            Ok(tx) => debug!(
                "Applied {} {} {} (total {}), cash now {}",
                kind,
                tx.quantity,
                tx.ticker_str(),
                tx.total,
                portfolio.cash
            ),
            Err(e) => warn!("Rejected {kind} request: {e}"),
        }
        result
    }

    /// Remove the record at `index` and invert its effects using only the
    /// figures stored on the record.
    ///
    /// A reversed Sell restores exactly the cost basis it released. Later
    /// sells on the same ticker keep the realized gain they booked at the time.
    pub fn reverse(&self, portfolio: &mut Portfolio, index: usize) -> Result<Transaction, CoreError> {
        let len = portfolio.transactions.len();
        let record = portfolio
            .transactions
            .get(index)
            .cloned()
            .ok_or(CoreError::InvalidIndex { index, len })?;

        let result = match record.kind {
            TransactionKind::Buy => self.reverse_buy(portfolio, &record),
            TransactionKind::Sell => self.reverse_sell(portfolio, &record),
            TransactionKind::Deposit => Self::reverse_cash_in(portfolio, &record).map(|_| {
                portfolio.deposit_log.retain(|d| d.transaction_id != record.id);
            }),
            TransactionKind::Withdraw => {
                checked(portfolio.cash.checked_add(record.quantity), "Cash balance").map(|cash| {
                    portfolio.cash = cash;
                })
            }
            TransactionKind::Dividend => Self::reverse_cash_in(portfolio, &record).map(|_| {
                let ticker = record.ticker_str().to_string();
                if let Some(total) = portfolio.dividends.get_mut(&ticker) {
                    *total -= record.quantity;
                    if *total <= Decimal::ZERO {
                        portfolio.dividends.remove(&ticker);
                    }
                }
            }),
        };

        if let Err(e) = result {
            warn!("Rejected reversal of transaction #{index}: {e}");
            return Err(e);
        }

        portfolio.transactions.remove(index);
        portfolio.alerts.push(Alert::now(format!(
            "Reversed {} of {} {} from {}",
            record.kind,
            record.quantity,
            if record.ticker.is_some() { record.ticker_str() } else { "cash" },
            record.date
        )));
        info!(
            "Reversed transaction #{index} ({} {}), cash now {}",
            record.kind,
            record.ticker_str(),
            portfolio.cash
        );
        Ok(record)
    }

    /// Set or clear the notes on an existing record.
    pub fn set_notes(
        &self,
        portfolio: &mut Portfolio,
        transaction_id: Uuid,
        notes: Option<String>,
    ) -> Result<(), CoreError> {
        let tx = portfolio
            .transactions
            .iter_mut()
            .find(|t| t.id == transaction_id)
            .ok_or_else(|| CoreError::TransactionNotFound(transaction_id.to_string()))?;
        tx.notes = notes;
        Ok(())
    }

    // ── Application ─────────────────────────────────────────────────

    fn apply_buy(
        &self,
        portfolio: &mut Portfolio,
        request: TransactionRequest,
        snapshot: &PriceSnapshot,
    ) -> Result<Transaction, CoreError> {
        let ticker = Self::tradable_ticker(portfolio, &request, snapshot)?;
        let cost = checked(
            request
                .quantity
                .checked_mul(request.price)
                .and_then(|gross| gross.checked_add(request.fee)),
            "Buy cost",
        )?;
        if cost > portfolio.cash {
            return Err(CoreError::InsufficientFunds {
                required: cost,
                available: portfolio.cash,
            });
        }

        let existing = portfolio.holdings.get(&ticker);
        let prior_acquisition = existing.map(|l| l.earliest_acquisition);
        let (shares, total_cost) = match existing {
            Some(lot) => (
                checked(lot.shares.checked_add(request.quantity), "Lot shares")?,
                checked(lot.total_cost.checked_add(cost), "Lot cost")?,
            ),
            None => (request.quantity, cost),
        };

        portfolio.cash -= cost;
        let lot = portfolio
            .holdings
            .entry(ticker.clone())
            .or_insert_with(|| Lot::new(request.date));
        lot.earliest_acquisition = lot.earliest_acquisition.min(request.date);
        lot.shares = shares;
        lot.total_cost = total_cost;

        let message = format!(
            "Bought {} {} @ {} on {} (fee {})",
            request.quantity, ticker, request.price, request.date, request.fee
        );
        let tx = Transaction {
            id: Uuid::new_v4(),
            date: request.date,
            ticker: Some(ticker),
            kind: TransactionKind::Buy,
            quantity: request.quantity,
            price: request.price,
            fee: request.fee,
            tax: Decimal::ZERO,
            total: -cost,
            realized_gain: Decimal::ZERO,
            cost_basis: cost,
            prior_acquisition,
            notes: request.notes,
        };
        Ok(Self::commit(portfolio, tx, message))
    }

    fn apply_sell(
        &self,
        portfolio: &mut Portfolio,
        request: TransactionRequest,
        snapshot: &PriceSnapshot,
    ) -> Result<Transaction, CoreError> {
        let ticker = Self::tradable_ticker(portfolio, &request, snapshot)?;
        let lot = match portfolio.holdings.get(&ticker) {
            Some(lot) if lot.shares >= request.quantity => lot.clone(),
            other => {
                return Err(CoreError::InsufficientShares {
                    ticker,
                    requested: request.quantity,
                    held: other.map(|l| l.shares).unwrap_or(Decimal::ZERO),
                })
            }
        };

        // Selling the whole lot releases its exact cost so no residue is left behind.
        let released = if request.quantity == lot.shares {
            lot.total_cost
        } else {
            checked(
                lot.total_cost
                    .checked_div(lot.shares)
                    .and_then(|average| average.checked_mul(request.quantity)),
                "Released cost basis",
            )?
        };
        let proceeds = checked(request.quantity.checked_mul(request.price), "Sell proceeds")?;
        let gain = proceeds - released;
        let tax = portfolio.settings.filer_status.tax_on_gain(gain);
        let net = proceeds - request.fee - tax;
        let cash = checked(portfolio.cash.checked_add(net), "Cash balance")?;
        if cash < Decimal::ZERO {
            return Err(CoreError::InsufficientFunds {
                required: -net,
                available: portfolio.cash,
            });
        }
        let realized = gain - request.fee - tax;
        let realized_total = checked(
            portfolio.realized_gain.checked_add(realized),
            "Realized gain",
        )?;

        portfolio.cash = cash;
        portfolio.realized_gain = realized_total;
        let remaining = lot.shares - request.quantity;
        if remaining <= Decimal::ZERO {
            portfolio.holdings.remove(&ticker);
        } else if let Some(held) = portfolio.holdings.get_mut(&ticker) {
            held.shares = remaining;
            held.total_cost -= released;
        }

        let message = format!(
            "Sold {} {} @ {} on {} (realized {})",
            request.quantity, ticker, request.price, request.date, realized
        );
        let tx = Transaction {
            id: Uuid::new_v4(),
            date: request.date,
            ticker: Some(ticker),
            kind: TransactionKind::Sell,
            quantity: request.quantity,
            price: request.price,
            fee: request.fee,
            tax,
            total: net,
            realized_gain: realized,
            cost_basis: released,
            prior_acquisition: Some(lot.earliest_acquisition),
            notes: request.notes,
        };
        Ok(Self::commit(portfolio, tx, message))
    }

    fn apply_deposit(
        &self,
        portfolio: &mut Portfolio,
        request: TransactionRequest,
    ) -> Result<Transaction, CoreError> {
        Self::validate_cash_shape(&request)?;
        let cash = checked(portfolio.cash.checked_add(request.quantity), "Cash balance")?;

        portfolio.cash = cash;
        let tx = Self::cash_record(&request, request.quantity);
        portfolio.deposit_log.push(CashDeposit {
            transaction_id: tx.id,
            date: request.date,
            amount: request.quantity,
        });

        let message = format!("Deposited {} on {}", request.quantity, request.date);
        Ok(Self::commit(portfolio, tx, message))
    }

    fn apply_withdraw(
        &self,
        portfolio: &mut Portfolio,
        request: TransactionRequest,
    ) -> Result<Transaction, CoreError> {
        Self::validate_cash_shape(&request)?;
        if request.quantity > portfolio.cash {
            return Err(CoreError::InsufficientFunds {
                required: request.quantity,
                available: portfolio.cash,
            });
        }

        portfolio.cash -= request.quantity;
        let tx = Self::cash_record(&request, -request.quantity);
        let message = format!("Withdrew {} on {}", request.quantity, request.date);
        Ok(Self::commit(portfolio, tx, message))
    }

    fn apply_dividend(
        &self,
        portfolio: &mut Portfolio,
        request: TransactionRequest,
    ) -> Result<Transaction, CoreError> {
        let ticker = request
            .ticker
            .as_deref()
            .map(normalize_ticker)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                CoreError::InvalidTransactionShape("Dividend requires a ticker".into())
            })?;
        if !request.price.is_zero() || !request.fee.is_zero() {
            return Err(CoreError::InvalidTransactionShape(
                "Dividend must have zero price and zero fee".into(),
            ));
        }

        let cash = checked(portfolio.cash.checked_add(request.quantity), "Cash balance")?;
        let received = portfolio.dividends.get(&ticker).copied().unwrap_or(Decimal::ZERO);
        let received = checked(received.checked_add(request.quantity), "Dividend total")?;

        portfolio.cash = cash;
        portfolio.dividends.insert(ticker.clone(), received);

        let message = format!(
            "Dividend of {} from {} on {}",
            request.quantity, ticker, request.date
        );
        let mut tx = Self::cash_record(&request, request.quantity);
        tx.ticker = Some(ticker);
        Ok(Self::commit(portfolio, tx, message))
    }

    // ── Reversal ────────────────────────────────────────────────────

    fn reverse_buy(&self, portfolio: &mut Portfolio, record: &Transaction) -> Result<(), CoreError> {
        let ticker = record.ticker_str().to_string();
        let held = portfolio.holdings.get(&ticker).map(|l| l.shares).unwrap_or(Decimal::ZERO);
        if held < record.quantity {
            return Err(CoreError::InsufficientShares {
                ticker,
                requested: record.quantity,
                held,
            });
        }

        let cash = checked(portfolio.cash.checked_sub(record.total), "Cash balance")?;
        let opened_on = Self::open_lot_start(portfolio, &ticker, record.id);

        portfolio.cash = cash;
        let lot = portfolio
            .holdings
            .get_mut(&ticker)
            .ok_or_else(|| CoreError::UnknownTicker(ticker.clone()))?;
        lot.shares -= record.quantity;
        lot.total_cost = (lot.total_cost - record.cost_basis).max(Decimal::ZERO);
        if lot.is_empty() {
            portfolio.holdings.remove(&ticker);
        } else if let Some(date) = opened_on {
            lot.earliest_acquisition = date;
        }
        Ok(())
    }

    fn reverse_sell(&self, portfolio: &mut Portfolio, record: &Transaction) -> Result<(), CoreError> {
        if record.total > portfolio.cash {
            return Err(CoreError::InsufficientFunds {
                required: record.total,
                available: portfolio.cash,
            });
        }

        let cash = checked(portfolio.cash.checked_sub(record.total), "Cash balance")?;
        let realized = checked(
            portfolio.realized_gain.checked_sub(record.realized_gain),
            "Realized gain",
        )?;
        let ticker = record.ticker_str().to_string();
        let (shares, total_cost) = match portfolio.holdings.get(&ticker) {
            Some(lot) => (
                checked(lot.shares.checked_add(record.quantity), "Lot shares")?,
                checked(lot.total_cost.checked_add(record.cost_basis), "Lot cost")?,
            ),
            None => (record.quantity, record.cost_basis),
        };

        portfolio.cash = cash;
        portfolio.realized_gain = realized;
        let opened = record.prior_acquisition.unwrap_or(record.date);
        let lot = portfolio
            .holdings
            .entry(ticker)
            .or_insert_with(|| Lot::new(opened));
        lot.shares = shares;
        lot.total_cost = total_cost;
        lot.earliest_acquisition = lot.earliest_acquisition.min(opened);
        Ok(())
    }

    /// Earliest buy date of the lot that is open once `skip` is left out of
    /// the log. A sell that empties the position closes the lot, so buys
    /// before it no longer count.
    fn open_lot_start(portfolio: &Portfolio, ticker: &str, skip: Uuid) -> Option<NaiveDate> {
        let mut shares = Decimal::ZERO;
        let mut bought_on: Vec<NaiveDate> = Vec::new();
        let trades = portfolio
            .transactions
            .iter()
            .filter(|t| t.id != skip && t.ticker.as_deref() == Some(ticker));
        for tx in trades {
            match tx.kind {
                TransactionKind::Buy => {
                    shares = shares.saturating_add(tx.quantity);
                    bought_on.push(tx.date);
                }
                TransactionKind::Sell => {
                    shares -= tx.quantity;
                    if shares <= Decimal::ZERO {
                        shares = Decimal::ZERO;
                        bought_on.clear();
                    }
                }
                _ => {}
            }
        }
        bought_on.into_iter().min()
    }

    /// Take back cash that a Deposit or Dividend brought in.
    fn reverse_cash_in(portfolio: &mut Portfolio, record: &Transaction) -> Result<(), CoreError> {
        if record.quantity > portfolio.cash {
            return Err(CoreError::InsufficientFunds {
                required: record.quantity,
                available: portfolio.cash,
            });
        }
        portfolio.cash -= record.quantity;
        Ok(())
    }

    // ── Validation ──────────────────────────────────────────────────

    /// Rules shared by every kind:
    /// - Quantity must be positive
    /// - Price and fee can't be negative
    fn validate_amounts(request: &TransactionRequest) -> Result<(), CoreError> {
        if request.quantity <= Decimal::ZERO {
            return Err(CoreError::ValidationError(format!(
                "{} quantity must be positive, got {}",
                request.kind, request.quantity
            )));
        }
        if request.price < Decimal::ZERO {
            return Err(CoreError::ValidationError(format!(
                "Price can't be negative, got {}",
                request.price
            )));
        }
        if request.fee < Decimal::ZERO {
            return Err(CoreError::ValidationError(format!(
                "Fee can't be negative, got {}",
                request.fee
            )));
        }
        Ok(())
    }

    /// Buy/Sell need a positive price and a ticker that is either quoted in
    /// the snapshot or already held. Returns the normalized ticker.
    fn tradable_ticker(
        portfolio: &Portfolio,
        request: &TransactionRequest,
        snapshot: &PriceSnapshot,
    ) -> Result<String, CoreError> {
        let ticker = request
            .ticker
            .as_deref()
            .map(normalize_ticker)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                CoreError::InvalidTransactionShape(format!("{} requires a ticker", request.kind))
            })?;
        if request.price <= Decimal::ZERO {
            return Err(CoreError::ValidationError(format!(
                "{} price must be positive, got {}",
                request.kind, request.price
            )));
        }
        if !snapshot.contains(&ticker) && !portfolio.holdings.contains_key(&ticker) {
            return Err(CoreError::UnknownTicker(ticker));
        }
        Ok(ticker)
    }

    /// Deposits and withdrawals carry no ticker, no price and no fee.
    fn validate_cash_shape(request: &TransactionRequest) -> Result<(), CoreError> {
        if request.ticker.is_some() {
            return Err(CoreError::InvalidTransactionShape(format!(
                "{} must not name a ticker",
                request.kind
            )));
        }
        if !request.price.is_zero() || !request.fee.is_zero() {
            return Err(CoreError::InvalidTransactionShape(format!(
                "{} must have zero price and zero fee",
                request.kind
            )));
        }
        Ok(())
    }

    fn cash_record(request: &TransactionRequest, total: Decimal) -> Transaction {
        Transaction {
            id: Uuid::new_v4(),
            date: request.date,
            ticker: None,
            kind: request.kind,
            quantity: request.quantity,
            price: Decimal::ZERO,
            fee: Decimal::ZERO,
            tax: Decimal::ZERO,
            total,
            realized_gain: Decimal::ZERO,
            cost_basis: Decimal::ZERO,
            prior_acquisition: None,
            notes: request.notes.clone(),
        }
    }

    /// Append the record and its alert. Only called once all checks passed.
    fn commit(portfolio: &mut Portfolio, tx: Transaction, message: String) -> Transaction {
        portfolio.alerts.push(Alert::now(message));
        portfolio.transactions.push(tx.clone());
        tx
    }
}

impl Default for LedgerService {
    fn default() -> Self {
        Self::new()
    }
}

/// Lift a checked decimal operation into the ledger's error type.
fn checked(value: Option<Decimal>, what: &str) -> Result<Decimal, CoreError> {
    value.ok_or_else(|| CoreError::out_of_range(what))
}
