use crate::models::snapshot::PriceSnapshot;

/// Trait abstraction for market-data sources that hand the engine a price snapshot.
///
/// The engine never fetches prices itself. Ingestion lives behind this
/// trait, so a feed can be swapped without touching the ledger.
pub trait SnapshotProvider {
    /// Human-readable name of this provider (for logs).
    fn name(&self) -> &str;

    /// The current ticker → quote mapping.
    ///
    /// Missing or malformed source data yields an empty snapshot rather than an error.
    fn snapshot(&self) -> PriceSnapshot;
}
