use chrono::{DateTime, Utc};
use log::{debug, warn};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::str::FromStr;

use super::traits::SnapshotProvider;
use crate::models::snapshot::{PriceQuote, PriceSnapshot};

/// Price as it appears in a feed: either a JSON number or a decimal string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawPrice {
    Number(f64),
    Text(String),
}

impl RawPrice {
    fn to_decimal(&self) -> Option<Decimal> {
        match self {
            RawPrice::Number(n) => Decimal::from_f64(*n),
            RawPrice::Text(s) => Decimal::from_str(s.trim()).ok(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawQuote {
    price: RawPrice,
    #[serde(default)]
    compliant: bool,
    #[serde(default)]
    last_updated: Option<DateTime<Utc>>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    sector: Option<String>,
}

/// Snapshot provider backed by a JSON document:
///
/// ```json
/// { "LUCK": { "price": 712.5, "compliant": true, "last_updated": "2025-01-15T10:00:00Z" } }
/// ```
///
/// Entries without a usable positive price are skipped; a document that
/// cannot be parsed at all yields an empty snapshot.
pub struct JsonSnapshotProvider {
    name: String,
    source: String,
}

impl JsonSnapshotProvider {
    pub fn from_json(json: impl Into<String>) -> Self {
        Self {
            name: "json".into(),
            source: json.into(),
        }
    }

    /// Read the document from disk (native only). An unreadable file behaves
    /// like an empty document.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_file(path: &str) -> Self {
        let source = std::fs::read_to_string(path).unwrap_or_else(|e| {
            warn!("Price snapshot file {path} unreadable: {e}");
            String::new()
        });
        Self {
            name: format!("json:{path}"),
            source,
        }
    }

    /// Parse a JSON document into a snapshot.
    pub fn parse(json: &str) -> PriceSnapshot {
        if json.trim().is_empty() {
            warn!("Price snapshot source is empty");
            return PriceSnapshot::new();
        }

        let entries: BTreeMap<String, serde_json::Value> = match serde_json::from_str(json) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Malformed price snapshot, treating as empty: {e}");
                return PriceSnapshot::new();
            }
        };

        let mut snapshot = PriceSnapshot::new();
        for (ticker, value) in entries {
            let raw: RawQuote = match serde_json::from_value(value) {
                Ok(raw) => raw,
                Err(e) => {
                    warn!("Skipping malformed quote for {ticker}: {e}");
                    continue;
                }
            };
            let Some(price) = raw.price.to_decimal() else {
                warn!("Skipping quote for {ticker}: unreadable price");
                continue;
            };
            let quote = PriceQuote {
                price,
                compliant: raw.compliant,
                last_updated: raw.last_updated,
                name: raw.name,
                sector: raw.sector,
            };
            if !snapshot.insert(&ticker, quote) {
                warn!("Skipping quote for {ticker}: price {price} is not positive");
            }
        }

        debug!("Parsed price snapshot with {} quotes", snapshot.len());
        snapshot
    }
}

impl SnapshotProvider for JsonSnapshotProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn snapshot(&self) -> PriceSnapshot {
        Self::parse(&self.source)
    }
}
