// ═══════════════════════════════════════════════════════════════════
// Storage Tests — encryption, file format, StorageManager
// ═══════════════════════════════════════════════════════════════════

use chrono::NaiveDate;
use rust_decimal_macros::dec;

use portfolio_ledger_core::errors::CoreError;
use portfolio_ledger_core::models::portfolio::Portfolio;
use portfolio_ledger_core::models::snapshot::{PriceQuote, PriceSnapshot};
use portfolio_ledger_core::models::transaction::TransactionRequest;
use portfolio_ledger_core::services::ledger_service::LedgerService;
use portfolio_ledger_core::storage::encryption::{
    decrypt, derive_key, encrypt, generate_nonce, generate_salt, KdfParams,
};
use portfolio_ledger_core::storage::format::{self, DocumentHeader, CURRENT_VERSION, HEADER_SIZE, MAGIC};
use portfolio_ledger_core::storage::manager::{DocumentKey, StorageManager};

/// Cheap parameters so the suite does not spend seconds in Argon2.
fn fast_params() -> KdfParams {
    KdfParams {
        memory_cost: 1024,
        time_cost: 1,
        parallelism: 1,
    }
}

fn sample_portfolio() -> Portfolio {
    let ledger = LedgerService::new();
    let snapshot = PriceSnapshot::from_quotes([("LUCK", PriceQuote::new(dec!(50), true))]);
    let day = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();

    let mut p = Portfolio::new("alice", "Retirement");
    ledger
        .apply(&mut p, TransactionRequest::deposit(dec!(100000), day), &snapshot)
        .unwrap();
    ledger
        .apply(
            &mut p,
            TransactionRequest::buy("LUCK", dec!(10), dec!(50), dec!(5), day).with_notes("first buy"),
            &snapshot,
        )
        .unwrap();
    p.targets.insert("LUCK".into(), dec!(100));
    p
}

// ═══════════════════════════════════════════════════════════════════
// KdfParams
// ═══════════════════════════════════════════════════════════════════

mod kdf_params {
    use super::*;

    #[test]
    fn default_values() {
        let p = KdfParams::default();
        assert_eq!(p.memory_cost, 65_536);
        assert_eq!(p.time_cost, 3);
        assert_eq!(p.parallelism, 4);
        assert!(p.validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range() {
        let huge = KdfParams {
            memory_cost: 4_000_000,
            ..KdfParams::default()
        };
        assert!(matches!(huge.validate(), Err(CoreError::InvalidFileFormat(_))));

        let no_iterations = KdfParams {
            time_cost: 0,
            ..KdfParams::default()
        };
        assert!(no_iterations.validate().is_err());

        let wide = KdfParams {
            parallelism: 64,
            ..KdfParams::default()
        };
        assert!(wide.validate().is_err());
    }
}

// ═══════════════════════════════════════════════════════════════════
// Encryption
// ═══════════════════════════════════════════════════════════════════

mod encryption {
    use super::*;

    #[test]
    fn derive_key_is_deterministic() {
        let salt = [7u8; 16];
        let a = derive_key("hunter2", &salt, &fast_params()).unwrap();
        let b = derive_key("hunter2", &salt, &fast_params()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn different_password_different_key() {
        let salt = [7u8; 16];
        let a = derive_key("hunter2", &salt, &fast_params()).unwrap();
        let b = derive_key("hunter3", &salt, &fast_params()).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn encrypt_then_decrypt() {
        let key = [1u8; 32];
        let nonce = generate_nonce().unwrap();
        let sealed = encrypt(b"ledger bytes", &key, &nonce).unwrap();
        assert_ne!(&sealed[..], b"ledger bytes");
        assert_eq!(decrypt(&sealed, &key, &nonce).unwrap(), b"ledger bytes");
    }

    #[test]
    fn tampered_ciphertext_fails() {
        let key = [1u8; 32];
        let nonce = generate_nonce().unwrap();
        let mut sealed = encrypt(b"ledger bytes", &key, &nonce).unwrap();
        sealed[0] ^= 0xff;
        assert!(matches!(decrypt(&sealed, &key, &nonce), Err(CoreError::Decryption)));
    }

    #[test]
    fn salts_are_fresh() {
        assert_ne!(generate_salt().unwrap(), generate_salt().unwrap());
    }
}

// ═══════════════════════════════════════════════════════════════════
// File format
// ═══════════════════════════════════════════════════════════════════

mod file_format {
    use super::*;

    fn header() -> DocumentHeader {
        DocumentHeader {
            version: CURRENT_VERSION,
            kdf_params: fast_params(),
            salt: [3u8; 16],
            nonce: [4u8; 12],
            ciphertext_len: 0,
        }
    }

    #[test]
    fn header_layout() {
        let doc = format::write_document(&header(), b"abc");
        assert_eq!(doc.len(), HEADER_SIZE + 3);
        assert_eq!(&doc[0..4], MAGIC);

        let (parsed, ciphertext) = format::read_document(&doc).unwrap();
        assert_eq!(parsed.version, CURRENT_VERSION);
        assert_eq!(parsed.kdf_params, fast_params());
        assert_eq!(parsed.salt, [3u8; 16]);
        assert_eq!(parsed.nonce, [4u8; 12]);
        assert_eq!(parsed.ciphertext_len, 3);
        assert_eq!(ciphertext, b"abc");
    }

    #[test]
    fn too_small() {
        let result = format::read_document(b"PLDG");
        assert!(matches!(result, Err(CoreError::InvalidFileFormat(_))));
    }

    #[test]
    fn bad_magic() {
        let mut doc = format::write_document(&header(), b"abc");
        doc[0] = b'X';
        assert!(matches!(
            format::read_document(&doc),
            Err(CoreError::InvalidFileFormat(_))
        ));
    }

    #[test]
    fn future_version_rejected() {
        let mut h = header();
        h.version = CURRENT_VERSION + 1;
        let doc = format::write_document(&h, b"abc");
        assert!(matches!(
            format::read_document(&doc),
            Err(CoreError::UnsupportedVersion(v)) if v == CURRENT_VERSION + 1
        ));
    }

    #[test]
    fn truncated_ciphertext() {
        let doc = format::write_document(&header(), b"abcdef");
        let cut = &doc[..doc.len() - 2];
        assert!(matches!(
            format::read_document(cut),
            Err(CoreError::InvalidFileFormat(ref msg)) if msg.contains("truncated")
        ));
    }

    #[test]
    fn hostile_kdf_params_rejected() {
        let mut h = header();
        h.kdf_params.memory_cost = u32::MAX;
        let doc = format::write_document(&h, b"abc");
        assert!(matches!(
            format::read_document(&doc),
            Err(CoreError::InvalidFileFormat(_))
        ));
    }
}

// ═══════════════════════════════════════════════════════════════════
// StorageManager
// ═══════════════════════════════════════════════════════════════════

mod manager {
    use super::*;

    #[test]
    fn bytes_roundtrip() {
        let p = sample_portfolio();
        let bytes = StorageManager::save_to_bytes_with_params(&p, "pw", fast_params()).unwrap();
        assert_eq!(&bytes[0..4], MAGIC);

        let loaded = StorageManager::load_from_bytes(&bytes, "pw").unwrap();
        assert_eq!(loaded, p);
        assert_eq!(loaded.cash, dec!(99495));
        assert_eq!(loaded.transactions[1].notes.as_deref(), Some("first buy"));
    }

    #[test]
    fn wrong_password() {
        let p = sample_portfolio();
        let bytes = StorageManager::save_to_bytes_with_params(&p, "right", fast_params()).unwrap();
        assert!(matches!(
            StorageManager::load_from_bytes(&bytes, "wrong"),
            Err(CoreError::Decryption)
        ));
    }

    #[test]
    fn each_save_uses_fresh_salt_and_nonce() {
        let p = sample_portfolio();
        let a = StorageManager::save_to_bytes_with_params(&p, "pw", fast_params()).unwrap();
        let b = StorageManager::save_to_bytes_with_params(&p, "pw", fast_params()).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn invalid_params_refused_on_save() {
        let p = sample_portfolio();
        let bad = KdfParams {
            time_cost: 0,
            ..fast_params()
        };
        assert!(StorageManager::save_to_bytes_with_params(&p, "pw", bad).is_err());
    }

    #[test]
    fn json_roundtrip() {
        let p = sample_portfolio();
        let json = StorageManager::to_json(&p).unwrap();
        assert!(json.contains("\"LUCK\""));
        assert_eq!(StorageManager::from_json(&json).unwrap(), p);
    }

    #[test]
    fn document_key_file_name() {
        assert_eq!(
            DocumentKey::new("alice", "Retirement").file_name(),
            "alice__Retirement.pldg"
        );
        assert_eq!(
            DocumentKey::new("a/b", "my fund!").file_name(),
            "a-b__my-fund-.pldg"
        );
        assert_eq!(DocumentKey::new("", "  ").file_name(), "unnamed__unnamed.pldg");
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = StorageManager::load_from_dir(dir.path(), &DocumentKey::new("x", "y"), "pw");
        assert!(matches!(result, Err(CoreError::FileIO(_))));
    }
}
