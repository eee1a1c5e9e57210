// ═══════════════════════════════════════════════════════════════════
// Error Tests — CoreError variants, Display formatting, From impls
// ═══════════════════════════════════════════════════════════════════

use portfolio_ledger_core::errors::CoreError;
use rust_decimal_macros::dec;

// ── Display formatting ──────────────────────────────────────────────

mod display {
    use super::*;

    #[test]
    fn invalid_file_format() {
        let err = CoreError::InvalidFileFormat("bad header".into());
        assert_eq!(err.to_string(), "Invalid file format: bad header");
    }

    #[test]
    fn unsupported_version() {
        let err = CoreError::UnsupportedVersion(99);
        assert_eq!(err.to_string(), "Unsupported file version: 99");
    }

    #[test]
    fn decryption() {
        let err = CoreError::Decryption;
        assert_eq!(
            err.to_string(),
            "Decryption failed — wrong password or corrupted file"
        );
    }

    #[test]
    fn file_io() {
        let err = CoreError::FileIO("permission denied".into());
        assert_eq!(err.to_string(), "File I/O error: permission denied");
    }

    #[test]
    fn insufficient_funds() {
        let err = CoreError::InsufficientFunds {
            required: dec!(505),
            available: dec!(100.50),
        };
        assert_eq!(
            err.to_string(),
            "Insufficient funds: 505 required, 100.50 available"
        );
    }

    #[test]
    fn insufficient_shares() {
        let err = CoreError::InsufficientShares {
            ticker: "LUCK".into(),
            requested: dec!(15),
            held: dec!(10),
        };
        assert_eq!(
            err.to_string(),
            "Insufficient shares of LUCK: 15 requested, 10 held"
        );
    }

    #[test]
    fn unknown_ticker() {
        let err = CoreError::UnknownTicker("ZZZ".into());
        assert_eq!(err.to_string(), "Unknown ticker: ZZZ");
    }

    #[test]
    fn invalid_transaction_shape() {
        let err = CoreError::InvalidTransactionShape("Buy requires a ticker".into());
        assert_eq!(
            err.to_string(),
            "Invalid transaction shape: Buy requires a ticker"
        );
    }

    #[test]
    fn invalid_index() {
        let err = CoreError::InvalidIndex { index: 7, len: 3 };
        assert_eq!(
            err.to_string(),
            "Invalid transaction index 7 (ledger has 3 transactions)"
        );
    }

    #[test]
    fn invalid_allocation() {
        let err = CoreError::InvalidAllocation("targets sum to 95%, expected 100%".into());
        assert_eq!(
            err.to_string(),
            "Invalid allocation: targets sum to 95%, expected 100%"
        );
    }

    #[test]
    fn validation_error() {
        let err = CoreError::ValidationError("quantity must be positive".into());
        assert_eq!(err.to_string(), "Validation failed: quantity must be positive");
    }

    #[test]
    fn transaction_not_found() {
        let err = CoreError::TransactionNotFound("abc-123".into());
        assert_eq!(err.to_string(), "Transaction not found: abc-123");
    }
}

// ── From conversions ────────────────────────────────────────────────

mod conversions {
    use super::*;

    #[test]
    fn from_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err: CoreError = io.into();
        assert!(matches!(err, CoreError::FileIO(ref msg) if msg.contains("no such file")));
    }

    #[test]
    fn from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: CoreError = json_err.into();
        assert!(matches!(err, CoreError::Deserialization(_)));
    }

    #[test]
    fn from_bincode_error() {
        let bin_err = bincode::deserialize::<String>(&[0xff]).unwrap_err();
        let err: CoreError = bin_err.into();
        assert!(matches!(err, CoreError::Serialization(_)));
    }

    #[test]
    fn from_aes_gcm_error() {
        let err: CoreError = aes_gcm::Error.into();
        assert!(matches!(err, CoreError::Decryption));
    }

    #[test]
    fn debug_format_names_variant() {
        let err = CoreError::UnknownTicker("OGDC".into());
        assert!(format!("{err:?}").contains("UnknownTicker"));
    }
}
