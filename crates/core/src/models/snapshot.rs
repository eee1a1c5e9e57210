use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Market data for one ticker, as supplied by the ingestion collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    /// Latest price (always positive)
    pub price: Decimal,

    /// Compliance flag used to restrict the distribution universe
    #[serde(default)]
    pub compliant: bool,

    /// When the quote was captured
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,

    /// Display name (e.g., "Lucky Cement")
    #[serde(default)]
    pub name: Option<String>,

    /// Display sector (e.g., "Cement")
    #[serde(default)]
    pub sector: Option<String>,
}

impl PriceQuote {
    pub fn new(price: Decimal, compliant: bool) -> Self {
        Self {
            price,
            compliant,
            last_updated: None,
            name: None,
            sector: None,
        }
    }
}

/// Immutable ticker → quote mapping for the duration of one engine call.
///
/// An empty snapshot means "no tradable universe": buys on unheld tickers
/// fail, and the distribution solver produces no rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceSnapshot {
    quotes: BTreeMap<String, PriceQuote>,
}

impl PriceSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a snapshot from (ticker, quote) pairs. Tickers are uppercased
    /// and quotes with a non-positive price are dropped.
    pub fn from_quotes<I, S>(quotes: I) -> Self
    where
        I: IntoIterator<Item = (S, PriceQuote)>,
        S: AsRef<str>,
    {
        let mut snapshot = Self::new();
        for (ticker, quote) in quotes {
            snapshot.insert(ticker.as_ref(), quote);
        }
        snapshot
    }

    /// Insert a quote. Returns `false` (and ignores the quote) if its price is not positive.
    pub fn insert(&mut self, ticker: &str, quote: PriceQuote) -> bool {
        if quote.price <= Decimal::ZERO {
            return false;
        }
        self.quotes.insert(normalize_ticker(ticker), quote);
        true
    }

    pub fn get(&self, ticker: &str) -> Option<&PriceQuote> {
        self.quotes.get(&normalize_ticker(ticker))
    }

    pub fn price(&self, ticker: &str) -> Option<Decimal> {
        self.get(ticker).map(|q| q.price)
    }

    pub fn contains(&self, ticker: &str) -> bool {
        self.quotes.contains_key(&normalize_ticker(ticker))
    }

    pub fn is_compliant(&self, ticker: &str) -> bool {
        self.get(ticker).is_some_and(|q| q.compliant)
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    /// Iterate quotes in ticker order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &PriceQuote)> {
        self.quotes.iter()
    }

    /// A new snapshot holding only the compliance-flagged tickers.
    pub fn compliant_subset(&self) -> Self {
        Self {
            quotes: self
                .quotes
                .iter()
                .filter(|(_, q)| q.compliant)
                .map(|(t, q)| (t.clone(), q.clone()))
                .collect(),
        }
    }
}

/// Canonical ticker form: trimmed and uppercased.
pub fn normalize_ticker(ticker: &str) -> String {
    ticker.trim().to_uppercase()
}
