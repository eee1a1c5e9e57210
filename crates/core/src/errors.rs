use rust_decimal::Decimal;
use thiserror::Error;

/// Unified error type for the entire portfolio-ledger-core library.
/// Every public function returns `Result<T, CoreError>`.
///
/// Ledger errors are validation failures scoped to the rejected call:
/// the ledger is left exactly as it was before the call.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Storage / File ──────────────────────────────────────────────
    #[error("Invalid file format: {0}")]
    InvalidFileFormat(String),

    #[error("Unsupported file version: {0}")]
    UnsupportedVersion(u16),

    #[error("Encryption failed: {0}")]
    Encryption(String),

    #[error("Decryption failed — wrong password or corrupted file")]
    Decryption,

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    // ── File I/O (native only) ──────────────────────────────────────
    #[error("File I/O error: {0}")]
    FileIO(String),

    // ── Ledger ──────────────────────────────────────────────────────
    #[error("Insufficient funds: {required} required, {available} available")]
    InsufficientFunds {
        required: Decimal,
        available: Decimal,
    },

    #[error("Insufficient shares of {ticker}: {requested} requested, {held} held")]
    InsufficientShares {
        ticker: String,
        requested: Decimal,
        held: Decimal,
    },

    #[error("Unknown ticker: {0}")]
    UnknownTicker(String),

    #[error("Invalid transaction shape: {0}")]
    InvalidTransactionShape(String),

    #[error("Invalid transaction index {index} (ledger has {len} transactions)")]
    InvalidIndex { index: usize, len: usize },

    // ── Allocation ──────────────────────────────────────────────────
    #[error("Invalid allocation: {0}")]
    InvalidAllocation(String),

    // ── Business Logic ──────────────────────────────────────────────
    #[error("Validation failed: {0}")]
    ValidationError(String),

    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),
}

impl CoreError {
    /// Decimal arithmetic overflowed while computing `what`.
    pub fn out_of_range(what: &str) -> Self {
        CoreError::ValidationError(format!("{what} exceeds the supported numeric range"))
    }
}

// ── Conversion helpers (From impls) ─────────────────────────────────

impl From<std::io::Error> for CoreError {
    fn from(e: std::io::Error) -> Self {
        CoreError::FileIO(e.to_string())
    }
}

impl From<bincode::Error> for CoreError {
    fn from(e: bincode::Error) -> Self {
        CoreError::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Deserialization(e.to_string())
    }
}

impl From<aes_gcm::Error> for CoreError {
    fn from(_: aes_gcm::Error) -> Self {
        CoreError::Decryption
    }
}
