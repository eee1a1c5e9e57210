use log::info;

use crate::errors::CoreError;
use crate::models::portfolio::Portfolio;

use super::encryption::{self, KdfParams};
use super::format::{self, DocumentHeader};

/// Identifies a stored portfolio: one document per (owner, portfolio name).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentKey {
    pub owner: String,
    pub name: String,
}

impl DocumentKey {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    pub fn for_portfolio(portfolio: &Portfolio) -> Self {
        Self::new(portfolio.owner.clone(), portfolio.name.clone())
    }

    /// Stable file name for this key, e.g. `alice__retirement.pldg`.
    /// Characters outside `[A-Za-z0-9_-]` are replaced with `-`.
    pub fn file_name(&self) -> String {
        format!("{}__{}.pldg", sanitize(&self.owner), sanitize(&self.name))
    }
}

fn sanitize(part: &str) -> String {
    let cleaned: String = part
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '-' })
        .collect();
    if cleaned.is_empty() {
        "unnamed".into()
    } else {
        cleaned
    }
}

/// High-level storage operations: save/load portfolio documents to/from
/// encrypted bytes, files, or plain JSON.
pub struct StorageManager;

impl StorageManager {
    /// Encrypt and serialize a portfolio with the default key-derivation cost.
    ///
    /// Flow: Portfolio → bincode → AES-256-GCM(Argon2id(password)) → PLDG bytes
    pub fn save_to_bytes(portfolio: &Portfolio, password: &str) -> Result<Vec<u8>, CoreError> {
        Self::save_to_bytes_with_params(portfolio, password, KdfParams::default())
    }

    /// Encrypt and serialize a portfolio with explicit key-derivation parameters.
    pub fn save_to_bytes_with_params(
        portfolio: &Portfolio,
        password: &str,
        kdf_params: KdfParams,
    ) -> Result<Vec<u8>, CoreError> {
        kdf_params.validate()?;

        let plaintext = bincode::serialize(portfolio)
            .map_err(|e| CoreError::Serialization(format!("Failed to serialize portfolio: {e}")))?;

        let header = DocumentHeader {
            version: format::CURRENT_VERSION,
            kdf_params,
            salt: encryption::generate_salt()?,
            nonce: encryption::generate_nonce()?,
            ciphertext_len: 0,
        };
        let key = encryption::derive_key(password, &header.salt, &header.kdf_params)?;
        let ciphertext = encryption::encrypt(&plaintext, &key, &header.nonce)?;

        Ok(format::write_document(&header, &ciphertext))
    }

    /// Decrypt and deserialize a portfolio.
    ///
    /// Flow: PLDG bytes → parse header → Argon2id(password, salt) → AES-256-GCM decrypt → bincode → Portfolio
    pub fn load_from_bytes(data: &[u8], password: &str) -> Result<Portfolio, CoreError> {
        let (header, ciphertext) = format::read_document(data)?;
        let key = encryption::derive_key(password, &header.salt, &header.kdf_params)?;
        let plaintext = encryption::decrypt(ciphertext, &key, &header.nonce)?;

        bincode::deserialize(&plaintext)
            .map_err(|e| CoreError::Deserialization(format!("Failed to deserialize portfolio: {e}")))
    }

    /// Unencrypted JSON rendering of the whole document (decimals as strings, ISO-8601 dates).
    pub fn to_json(portfolio: &Portfolio) -> Result<String, CoreError> {
        serde_json::to_string_pretty(portfolio)
            .map_err(|e| CoreError::Serialization(format!("Failed to serialize portfolio: {e}")))
    }

    /// Parse a document previously produced by [`StorageManager::to_json`].
    pub fn from_json(json: &str) -> Result<Portfolio, CoreError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Save portfolio to an encrypted file on disk (native only).
    #[cfg(not(target_arch = "wasm32"))]
    pub fn save_to_file(portfolio: &Portfolio, path: &str, password: &str) -> Result<(), CoreError> {
        let bytes = Self::save_to_bytes(portfolio, password)?;
        std::fs::write(path, bytes)?;
        info!("Saved portfolio '{}' to {path}", portfolio.name);
        Ok(())
    }

    /// Load portfolio from an encrypted file on disk (native only).
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_from_file(path: &str, password: &str) -> Result<Portfolio, CoreError> {
        let bytes = std::fs::read(path)?;
        Self::load_from_bytes(&bytes, password)
    }

    /// Save into `dir` under the file name derived from the portfolio's owner and name.
    /// Returns the path written.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn save_to_dir(
        portfolio: &Portfolio,
        dir: &std::path::Path,
        password: &str,
    ) -> Result<std::path::PathBuf, CoreError> {
        let path = dir.join(DocumentKey::for_portfolio(portfolio).file_name());
        let bytes = Self::save_to_bytes(portfolio, password)?;
        std::fs::write(&path, bytes)?;
        info!("Saved portfolio '{}' to {}", portfolio.name, path.display());
        Ok(path)
    }

    /// Load the document stored in `dir` for `key`.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_from_dir(
        dir: &std::path::Path,
        key: &DocumentKey,
        password: &str,
    ) -> Result<Portfolio, CoreError> {
        let bytes = std::fs::read(dir.join(key.file_name()))?;
        Self::load_from_bytes(&bytes, password)
    }
}
