//! Keypair parsing.
//!
//! Two encodings are accepted: the base58 string wallets export, and the
//! JSON byte array written by `solana-keygen`.

use solana_keypair::Keypair;

use crate::error::SolanaExecutorError;

/// Length of an ed25519 keypair (secret followed by public key).
pub const KEYPAIR_LENGTH: usize = 64;

/// Parses a keypair from base58 or a JSON array of 64 bytes.
///
/// # Errors
///
/// Returns [`SolanaExecutorError::InvalidKeypair`] if neither encoding yields
/// a valid 64-byte keypair.
pub fn parse_keypair(encoded: &str) -> Result<Keypair, SolanaExecutorError> {
    let encoded = encoded.trim();
    let bytes = if encoded.starts_with('[') {
        serde_json::from_str::<Vec<u8>>(encoded)
            .map_err(|e| SolanaExecutorError::InvalidKeypair(format!("bad JSON byte array: {e}")))?
    } else {
        bs58::decode(encoded)
            .into_vec()
            .map_err(|e| SolanaExecutorError::InvalidKeypair(format!("bad base58: {e}")))?
    };
    if bytes.len() != KEYPAIR_LENGTH {
        return Err(SolanaExecutorError::InvalidKeypair(format!(
            "expected {KEYPAIR_LENGTH} bytes, got {}",
            bytes.len()
        )));
    }
    Keypair::try_from(bytes.as_slice()).map_err(|e| SolanaExecutorError::InvalidKeypair(e.to_string()))
}
