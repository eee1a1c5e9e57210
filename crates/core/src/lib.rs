pub mod errors;
pub mod models;
pub mod providers;
pub mod services;
pub mod storage;

use chrono::NaiveDate;
use models::{
    alert::{Alert, RECENT_ALERTS},
    analytics::{ContributionRow, DashboardSummary, DriftRow, HoldingRow},
    distribution::{DistributionRow, DistributionSummary, TradeFee, TradeSize},
    lot::Lot,
    portfolio::{CashDeposit, Portfolio},
    settings::{FeeSchedule, FilerStatus, Settings},
    snapshot::{normalize_ticker, PriceSnapshot},
    timeline::TimelinePoint,
    transaction::{Transaction, TransactionKind, TransactionRequest, TransactionSortOrder},
};
use rust_decimal::Decimal;
use services::{
    allocation_service::AllocationService, analytics_service::AnalyticsService,
    distribution_service::DistributionService, fee_service::FeeService,
    ledger_service::LedgerService, timeline_service::TimelineService,
};
use std::collections::BTreeMap;
use storage::manager::StorageManager;

use errors::CoreError;

/// Main entry point for the Portfolio Ledger core library.
/// Holds one portfolio document and all services needed to operate on it.
///
/// Single writer: callers must not interleave mutating calls on one
/// instance. Mutations return what they changed and set the
/// unsaved-changes flag; saving clears it.
#[must_use]
pub struct PortfolioLedger {
    portfolio: Portfolio,
    ledger_service: LedgerService,
    fee_service: FeeService,
    allocation_service: AllocationService,
    distribution_service: DistributionService,
    analytics_service: AnalyticsService,
    timeline_service: TimelineService,
    /// Tracks whether any mutation has occurred since the last save/load.
    dirty: bool,
}

impl std::fmt::Debug for PortfolioLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortfolioLedger")
            .field("owner", &self.portfolio.owner)
            .field("name", &self.portfolio.name)
            .field("transactions", &self.portfolio.transactions.len())
            .field("holdings", &self.portfolio.holdings.len())
            .field("cash", &self.portfolio.cash)
            .field("dirty", &self.dirty)
            .finish()
    }
}

impl PortfolioLedger {
    /// Create a brand new empty portfolio: zero cash, no holdings, default settings.
    pub fn create_new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self::build(Portfolio::new(owner, name))
    }

    /// Wrap an already-deserialized portfolio document.
    pub fn from_portfolio(portfolio: Portfolio) -> Self {
        Self::build(portfolio)
    }

    /// Load an existing portfolio from encrypted bytes (password required).
    pub fn load_from_bytes(encrypted: &[u8], password: &str) -> Result<Self, CoreError> {
        let portfolio = StorageManager::load_from_bytes(encrypted, password)?;
        Ok(Self::build(portfolio))
    }

    /// Save the current portfolio to encrypted bytes for the persistence collaborator.
    /// Clears the unsaved-changes flag on success.
    pub fn save_to_bytes(&mut self, password: &str) -> Result<Vec<u8>, CoreError> {
        let bytes = StorageManager::save_to_bytes(&self.portfolio, password)?;
        self.dirty = false;
        Ok(bytes)
    }

    /// Load from an encrypted file on disk (native only, not WASM).
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_from_file(path: &str, password: &str) -> Result<Self, CoreError> {
        let portfolio = StorageManager::load_from_file(path, password)?;
        Ok(Self::build(portfolio))
    }

    /// Save to an encrypted file on disk (native only, not WASM).
    /// Clears the unsaved-changes flag on success.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn save_to_file(&mut self, path: &str, password: &str) -> Result<(), CoreError> {
        StorageManager::save_to_file(&self.portfolio, path, password)?;
        self.dirty = false;
        Ok(())
    }

    /// Save under `dir`, keyed by owner and portfolio name (native only).
    #[cfg(not(target_arch = "wasm32"))]
    pub fn save_to_dir(
        &mut self,
        dir: &std::path::Path,
        password: &str,
    ) -> Result<std::path::PathBuf, CoreError> {
        let path = StorageManager::save_to_dir(&self.portfolio, dir, password)?;
        self.dirty = false;
        Ok(path)
    }

    /// Load the portfolio stored under `dir` for (owner, name) (native only).
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_from_dir(
        dir: &std::path::Path,
        owner: &str,
        name: &str,
        password: &str,
    ) -> Result<Self, CoreError> {
        let portfolio = StorageManager::load_from_dir(
            dir,
            &storage::manager::DocumentKey::new(owner, name),
            password,
        )?;
        Ok(Self::build(portfolio))
    }

    /// Export the full document as JSON (unencrypted snapshot for debugging/display).
    pub fn to_json(&self) -> Result<String, CoreError> {
        StorageManager::to_json(&self.portfolio)
    }

    /// Load a document from its JSON rendering.
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        Ok(Self::build(StorageManager::from_json(json)?))
    }

    /// The underlying document.
    #[must_use]
    pub fn portfolio(&self) -> &Portfolio {
        &self.portfolio
    }

    #[must_use]
    pub fn owner(&self) -> &str {
        &self.portfolio.owner
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.portfolio.name
    }

    #[must_use]
    pub fn created_at(&self) -> chrono::DateTime<chrono::Utc> {
        self.portfolio.created_at
    }

    // ── Transactions ────────────────────────────────────────────────

    /// Validate and apply one transaction. `snapshot` defines the tradable
    /// universe for Buy/Sell; cash-only kinds ignore it.
    pub fn apply_transaction(
        &mut self,
        request: TransactionRequest,
        snapshot: &PriceSnapshot,
    ) -> Result<Transaction, CoreError> {
        let tx = self
            .ledger_service
            .apply(&mut self.portfolio, request, snapshot)?;
        self.dirty = true;
        Ok(tx)
    }

    pub fn buy(
        &mut self,
        ticker: &str,
        quantity: Decimal,
        price: Decimal,
        fee: Decimal,
        date: NaiveDate,
        snapshot: &PriceSnapshot,
    ) -> Result<Transaction, CoreError> {
        self.apply_transaction(TransactionRequest::buy(ticker, quantity, price, fee, date), snapshot)
    }

    pub fn sell(
        &mut self,
        ticker: &str,
        quantity: Decimal,
        price: Decimal,
        fee: Decimal,
        date: NaiveDate,
        snapshot: &PriceSnapshot,
    ) -> Result<Transaction, CoreError> {
        self.apply_transaction(TransactionRequest::sell(ticker, quantity, price, fee, date), snapshot)
    }

    pub fn deposit(&mut self, amount: Decimal, date: NaiveDate) -> Result<Transaction, CoreError> {
        self.apply_transaction(TransactionRequest::deposit(amount, date), &PriceSnapshot::new())
    }

    pub fn withdraw(&mut self, amount: Decimal, date: NaiveDate) -> Result<Transaction, CoreError> {
        self.apply_transaction(TransactionRequest::withdraw(amount, date), &PriceSnapshot::new())
    }

    /// Record a dividend: cash goes up and the ticker's dividend total grows.
    pub fn apply_dividend(
        &mut self,
        ticker: &str,
        amount: Decimal,
        date: NaiveDate,
    ) -> Result<Transaction, CoreError> {
        self.apply_transaction(TransactionRequest::dividend(ticker, amount, date), &PriceSnapshot::new())
    }

    /// Remove the transaction at `index` (application order) and undo its effects.
    /// Returns the removed record.
    pub fn reverse_transaction(&mut self, index: usize) -> Result<Transaction, CoreError> {
        let tx = self.ledger_service.reverse(&mut self.portfolio, index)?;
        self.dirty = true;
        Ok(tx)
    }

    /// Reverse a transaction identified by its ID.
    pub fn reverse_transaction_by_id(&mut self, id: uuid::Uuid) -> Result<Transaction, CoreError> {
        let index = self
            .portfolio
            .transactions
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| CoreError::TransactionNotFound(id.to_string()))?;
        self.reverse_transaction(index)
    }

    /// Apply several transactions at once. If any is rejected,
    /// none are applied (all-or-nothing).
    pub fn apply_transactions(
        &mut self,
        requests: Vec<TransactionRequest>,
        snapshot: &PriceSnapshot,
    ) -> Result<Vec<Transaction>, CoreError> {
        let mut temp_portfolio = self.portfolio.clone();
        let mut applied = Vec::with_capacity(requests.len());

        for request in requests {
            applied.push(self.ledger_service.apply(&mut temp_portfolio, request, snapshot)?);
        }

        self.portfolio = temp_portfolio;
        self.dirty = true;
        Ok(applied)
    }

    /// Set or clear notes on an existing transaction.
    pub fn set_transaction_notes(
        &mut self,
        id: uuid::Uuid,
        notes: Option<String>,
    ) -> Result<(), CoreError> {
        self.ledger_service
            .set_notes(&mut self.portfolio, id, notes)?;
        self.dirty = true;
        Ok(())
    }

    /// All transactions in application order.
    #[must_use]
    pub fn transactions(&self) -> &[Transaction] {
        &self.portfolio.transactions
    }

    #[must_use]
    pub fn get_transaction(&self, id: uuid::Uuid) -> Option<&Transaction> {
        self.portfolio.transactions.iter().find(|t| t.id == id)
    }

    #[must_use]
    pub fn transaction_count(&self) -> usize {
        self.portfolio.transactions.len()
    }

    /// Transactions for one ticker (case-insensitive), newest date first.
    #[must_use]
    pub fn get_transactions_for_ticker(&self, ticker: &str) -> Vec<&Transaction> {
        let ticker = normalize_ticker(ticker);
        let mut txs: Vec<&Transaction> = self
            .portfolio
            .transactions
            .iter()
            .filter(|t| t.ticker.as_deref() == Some(ticker.as_str()))
            .collect();
        txs.sort_by(|a, b| b.date.cmp(&a.date));
        txs
    }

    /// Transactions of one kind, newest date first.
    #[must_use]
    pub fn get_transactions_by_kind(&self, kind: TransactionKind) -> Vec<&Transaction> {
        let mut txs: Vec<&Transaction> = self
            .portfolio
            .transactions
            .iter()
            .filter(|t| t.kind == kind)
            .collect();
        txs.sort_by(|a, b| b.date.cmp(&a.date));
        txs
    }

    /// Transactions dated within `from..=to`, newest date first.
    #[must_use]
    pub fn get_transactions_in_range(&self, from: NaiveDate, to: NaiveDate) -> Vec<&Transaction> {
        let mut txs: Vec<&Transaction> = self
            .portfolio
            .transactions
            .iter()
            .filter(|t| t.date >= from && t.date <= to)
            .collect();
        txs.sort_by(|a, b| b.date.cmp(&a.date));
        txs
    }

    #[must_use]
    pub fn get_transactions_sorted(&self, order: &TransactionSortOrder) -> Vec<&Transaction> {
        let mut txs: Vec<&Transaction> = self.portfolio.transactions.iter().collect();
        match order {
            TransactionSortOrder::DateDesc => txs.sort_by(|a, b| b.date.cmp(&a.date)),
            TransactionSortOrder::DateAsc => txs.sort_by(|a, b| a.date.cmp(&b.date)),
            TransactionSortOrder::AmountDesc => txs.sort_by(|a, b| b.total.abs().cmp(&a.total.abs())),
            TransactionSortOrder::AmountAsc => txs.sort_by(|a, b| a.total.abs().cmp(&b.total.abs())),
            TransactionSortOrder::TickerAsc => txs.sort_by(|a, b| {
                a.ticker.is_none().cmp(&b.ticker.is_none()).then_with(|| a.ticker.cmp(&b.ticker))
            }),
            TransactionSortOrder::TickerDesc => txs.sort_by(|a, b| b.ticker.cmp(&a.ticker)),
        }
        txs
    }

    /// Search transactions by ticker and notes (case-insensitive).
    #[must_use]
    pub fn search_transactions(&self, query: &str) -> Vec<&Transaction> {
        let q = query.to_lowercase();
        self.portfolio
            .transactions
            .iter()
            .filter(|t| {
                t.ticker_str().to_lowercase().contains(&q)
                    || t.notes.as_deref().unwrap_or("").to_lowercase().contains(&q)
            })
            .collect()
    }

    // ── Balances ────────────────────────────────────────────────────

    #[must_use]
    pub fn cash(&self) -> Decimal {
        self.portfolio.cash
    }

    #[must_use]
    pub fn realized_gain(&self) -> Decimal {
        self.portfolio.realized_gain
    }

    #[must_use]
    pub fn holdings(&self) -> &BTreeMap<String, Lot> {
        &self.portfolio.holdings
    }

    #[must_use]
    pub fn holding(&self, ticker: &str) -> Option<&Lot> {
        self.portfolio.holdings.get(&normalize_ticker(ticker))
    }

    #[must_use]
    pub fn dividends(&self) -> &BTreeMap<String, Decimal> {
        &self.portfolio.dividends
    }

    /// Deposits not yet put to work by a distribution.
    #[must_use]
    pub fn deposit_log(&self) -> &[CashDeposit] {
        &self.portfolio.deposit_log
    }

    /// Sum of the deposit log, capped at the cash balance.
    #[must_use]
    pub fn uninvested_cash(&self) -> Decimal {
        let pending: Decimal = self.portfolio.deposit_log.iter().map(|d| d.amount).sum();
        pending.min(self.portfolio.cash)
    }

    /// The most recent alerts, newest first.
    #[must_use]
    pub fn recent_alerts(&self) -> Vec<&Alert> {
        self.portfolio.alerts.iter().rev().take(RECENT_ALERTS).collect()
    }

    // ── Allocation ──────────────────────────────────────────────────

    /// Replace the target allocation. Weights must sum to 100 (±0.01) unless all are zero.
    pub fn update_targets<I, S>(&mut self, targets: I) -> Result<(), CoreError>
    where
        I: IntoIterator<Item = (S, Decimal)>,
        S: AsRef<str>,
    {
        self.allocation_service
            .update_targets(&mut self.portfolio, targets)?;
        self.dirty = true;
        Ok(())
    }

    #[must_use]
    pub fn targets(&self) -> &BTreeMap<String, Decimal> {
        &self.portfolio.targets
    }

    /// Cost-basis weight minus target weight per ticker.
    #[must_use]
    pub fn compute_drift(&self) -> Vec<DriftRow> {
        self.allocation_service
            .compute_drift(&self.portfolio.holdings, &self.portfolio.targets)
    }

    /// How to split `new_cash` to move cost-basis weights toward the targets.
    pub fn plan_contributions(&self, new_cash: Decimal) -> Result<Vec<ContributionRow>, CoreError> {
        self.allocation_service.plan_contributions(
            &self.portfolio.holdings,
            &self.portfolio.targets,
            new_cash,
        )
    }

    // ── Distribution ────────────────────────────────────────────────

    /// Whole-share purchase orders for `cash_amount` under the current targets and fees.
    pub fn calculate_distribution(
        &self,
        cash_amount: Decimal,
        snapshot: &PriceSnapshot,
    ) -> Result<Vec<DistributionRow>, CoreError> {
        self.distribution_service.calculate_distribution(
            cash_amount,
            &self.portfolio.targets,
            snapshot,
            &self.portfolio.settings.fee_schedule,
        )
    }

    /// Like [`PortfolioLedger::calculate_distribution`], restricted to compliance-flagged tickers.
    pub fn calculate_compliant_distribution(
        &self,
        cash_amount: Decimal,
        snapshot: &PriceSnapshot,
    ) -> Result<Vec<DistributionRow>, CoreError> {
        self.distribution_service.calculate_compliant_distribution(
            cash_amount,
            &self.portfolio.targets,
            snapshot,
            &self.portfolio.settings.fee_schedule,
        )
    }

    /// Book the distribution as Buy transactions and clear the deposit log.
    pub fn execute_distribution(
        &mut self,
        rows: &[DistributionRow],
        date: NaiveDate,
    ) -> Result<Vec<Transaction>, CoreError> {
        let txs = self
            .distribution_service
            .execute_distribution(&mut self.portfolio, rows, date)?;
        self.dirty = true;
        Ok(txs)
    }

    #[must_use]
    pub fn distribution_summary(rows: &[DistributionRow]) -> DistributionSummary {
        DistributionSummary::from_rows(rows)
    }

    // ── Fees & Settings ─────────────────────────────────────────────

    /// Fee and tax for a trade under the current schedule.
    pub fn compute_trade_fee(&self, price: Decimal, size: TradeSize) -> Result<TradeFee, CoreError> {
        self.fee_service
            .compute_trade_fee(price, size, &self.portfolio.settings.fee_schedule)
    }

    /// Replace the broker fee schedule. All four figures must be non-negative.
    pub fn set_fee_schedule(&mut self, schedule: FeeSchedule) -> Result<(), CoreError> {
        let figures = [
            ("low_price_fee", schedule.low_price_fee),
            ("low_price_tax", schedule.low_price_tax),
            ("brokerage_rate", schedule.brokerage_rate),
            ("tax_rate", schedule.tax_rate),
        ];
        if let Some((field, value)) = figures.iter().find(|(_, v)| *v < Decimal::ZERO) {
            return Err(CoreError::ValidationError(format!(
                "Fee schedule {field} can't be negative, got {value}"
            )));
        }
        self.portfolio.settings.fee_schedule = schedule;
        self.dirty = true;
        Ok(())
    }

    pub fn set_filer_status(&mut self, status: FilerStatus) {
        if self.portfolio.settings.filer_status != status {
            self.portfolio.settings.filer_status = status;
            self.dirty = true;
        }
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.portfolio.settings
    }

    // ── Analytics ───────────────────────────────────────────────────

    /// Portfolio table rows valued against `snapshot`.
    #[must_use]
    pub fn portfolio_rows(&self, snapshot: &PriceSnapshot) -> Vec<HoldingRow> {
        self.analytics_service.holding_rows(&self.portfolio, snapshot)
    }

    #[must_use]
    pub fn dashboard(&self, snapshot: &PriceSnapshot) -> DashboardSummary {
        self.analytics_service.dashboard(&self.portfolio, snapshot)
    }

    /// Cumulative invested and profit/loss per transaction date.
    #[must_use]
    pub fn timeline(&self) -> Vec<TimelinePoint> {
        self.timeline_service.generate_timeline(&self.portfolio)
    }

    pub fn timeline_in_range(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<TimelinePoint>, CoreError> {
        self.timeline_service
            .generate_timeline_in_range(&self.portfolio, from, to)
    }

    #[must_use]
    pub fn earliest_transaction_date(&self) -> Option<NaiveDate> {
        self.portfolio.transactions.iter().map(|t| t.date).min()
    }

    #[must_use]
    pub fn latest_transaction_date(&self) -> Option<NaiveDate> {
        self.portfolio.transactions.iter().map(|t| t.date).max()
    }

    /// Days between the earliest transaction and `today`.
    #[must_use]
    pub fn portfolio_age_days(&self, today: NaiveDate) -> Option<i64> {
        self.earliest_transaction_date()
            .map(|d| (today - d).num_days())
    }

    // ── Export / Import ─────────────────────────────────────────────

    /// Export the transaction log as a JSON string.
    pub fn export_transactions_to_json(&self) -> Result<String, CoreError> {
        serde_json::to_string_pretty(&self.portfolio.transactions)
            .map_err(|e| CoreError::Serialization(format!("Failed to serialize transactions to JSON: {e}")))
    }

    /// Export the transaction log as CSV.
    /// Columns: id, date, kind, ticker, quantity, price, fee, tax, total, realized_gain, notes
    #[must_use]
    pub fn export_transactions_to_csv(&self) -> String {
        let mut csv =
            String::from("id,date,kind,ticker,quantity,price,fee,tax,total,realized_gain,notes\n");
        for tx in &self.portfolio.transactions {
            csv.push_str(&format!(
                "{},{},{},{},{},{},{},{},{},{},{}\n",
                tx.id,
                tx.date,
                tx.kind,
                csv_field(tx.ticker_str()),
                tx.quantity,
                tx.price,
                tx.fee,
                tx.tax,
                tx.total,
                tx.realized_gain,
                csv_field(tx.notes.as_deref().unwrap_or("")),
            ));
        }
        csv
    }

    /// Import transactions from JSON and apply them all-or-nothing.
    ///
    /// Accepts a list of requests; a list exported by
    /// [`PortfolioLedger::export_transactions_to_json`] is also accepted, in
    /// which case the records are replayed. Returns the number imported.
    pub fn import_transactions_from_json(
        &mut self,
        json: &str,
        snapshot: &PriceSnapshot,
    ) -> Result<usize, CoreError> {
        let requests: Vec<TransactionRequest> = serde_json::from_str(json)?;
        let count = requests.len();
        self.apply_transactions(requests, snapshot)?;
        Ok(count)
    }

    // ── Dirty State ─────────────────────────────────────────────────

    /// Returns `true` if the portfolio has been modified since the last save or load.
    #[must_use]
    pub fn has_unsaved_changes(&self) -> bool {
        self.dirty
    }

    // ── Internal ────────────────────────────────────────────────────

    fn build(portfolio: Portfolio) -> Self {
        Self {
            portfolio,
            ledger_service: LedgerService::new(),
            fee_service: FeeService::new(),
            allocation_service: AllocationService::new(),
            distribution_service: DistributionService::new(),
            analytics_service: AnalyticsService::new(),
            timeline_service: TimelineService::new(),
            dirty: false,
        }
    }
}

/// Quote a CSV field containing commas, quotes, or newlines.
fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
