use super::encryption::KdfParams;
use crate::errors::CoreError;

/// Magic bytes identifying a PLDG (Portfolio Ledger) document.
pub const MAGIC: &[u8; 4] = b"PLDG";

/// Current document format version.
pub const CURRENT_VERSION: u16 = 1;

/// Header size in bytes:
/// magic(4) + version(2) + kdf_params(12) + salt(16) + nonce(12) + ciphertext_len(8) = 54
pub const HEADER_SIZE: usize = 54;

/// Header of an encrypted ledger document.
#[derive(Debug)]
pub struct DocumentHeader {
    pub version: u16,
    pub kdf_params: KdfParams,
    pub salt: [u8; 16],
    pub nonce: [u8; 12],
    pub ciphertext_len: u64,
}

/// Assemble an encrypted document.
///
/// Layout:
/// ```text
/// [PLDG: 4B] [version: 2B LE] [memory_cost: 4B LE] [time_cost: 4B LE]
/// [parallelism: 4B LE] [salt: 16B] [nonce: 12B] [ciphertext_len: 8B LE]
/// [ciphertext: variable]
/// ```
pub fn write_document(header: &DocumentHeader, ciphertext: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_SIZE + ciphertext.len());

    buf.extend_from_slice(MAGIC);
    buf.extend_from_slice(&header.version.to_le_bytes());
    buf.extend_from_slice(&header.kdf_params.memory_cost.to_le_bytes());
    buf.extend_from_slice(&header.kdf_params.time_cost.to_le_bytes());
    buf.extend_from_slice(&header.kdf_params.parallelism.to_le_bytes());
    buf.extend_from_slice(&header.salt);
    buf.extend_from_slice(&header.nonce);
    buf.extend_from_slice(&(ciphertext.len() as u64).to_le_bytes());
    buf.extend_from_slice(ciphertext);

    buf
}

/// Parse a document header. Returns the header and the ciphertext slice.
pub fn read_document(data: &[u8]) -> Result<(DocumentHeader, &[u8]), CoreError> {
    if data.len() < HEADER_SIZE {
        return Err(CoreError::InvalidFileFormat(
            "Document too small to be a ledger document".into(),
        ));
    }
    if &data[0..4] != MAGIC {
        return Err(CoreError::InvalidFileFormat(
            "Invalid magic bytes — not a ledger document".into(),
        ));
    }

    let mut reader = HeaderReader { data, offset: 4 };

    let version = u16::from_le_bytes(reader.take::<2>()?);
    if version == 0 || version > CURRENT_VERSION {
        return Err(CoreError::UnsupportedVersion(version));
    }

    let kdf_params = KdfParams {
        memory_cost: u32::from_le_bytes(reader.take::<4>()?),
        time_cost: u32::from_le_bytes(reader.take::<4>()?),
        parallelism: u32::from_le_bytes(reader.take::<4>()?),
    };
    kdf_params.validate()?;

    let salt = reader.take::<16>()?;
    let nonce = reader.take::<12>()?;
    let ciphertext_len = u64::from_le_bytes(reader.take::<8>()?);

    let available = (data.len() - reader.offset) as u64;
    if available < ciphertext_len {
        return Err(CoreError::InvalidFileFormat(format!(
            "Document truncated: expected {ciphertext_len} bytes of ciphertext, got {available}"
        )));
    }
    let ciphertext = &data[reader.offset..reader.offset + ciphertext_len as usize];

    Ok((
        DocumentHeader {
            version,
            kdf_params,
            salt,
            nonce,
            ciphertext_len,
        },
        ciphertext,
    ))
}

/// Sequential fixed-width reads over the header bytes.
struct HeaderReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl HeaderReader<'_> {
    fn take<const N: usize>(&mut self) -> Result<[u8; N], CoreError> {
        let bytes: [u8; N] = self
            .data
            .get(self.offset..self.offset + N)
            .and_then(|s| s.try_into().ok())
            .ok_or_else(|| {
                CoreError::InvalidFileFormat(format!("Header ends early at byte {}", self.offset))
            })?;
        self.offset += N;
        Ok(bytes)
    }
}
