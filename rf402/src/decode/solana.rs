//! SDK-free walker for the Solana transaction wire format.
//!
//! x402 Solana payments carry a fully serialized transaction instead of an
//! authorization object. The payer is not necessarily the fee payer: facilitators
//! usually sponsor fees, so the account that actually moves tokens is the
//! authority of the SPL Token transfer instruction.
//!
//! Layout walked by [`SolanaWireTransaction::parse`]:
//!
//! ```text
//! signatures        count, then count × 64 bytes
//! [version prefix]  one byte with the high bit set (v0 messages only)
//! header            num_required_signatures, num_readonly_signed, num_readonly_unsigned
//! account keys      count, then count × 32 bytes
//! recent blockhash  32 bytes
//! instructions      count, then per instruction:
//!                     program id index (1 byte)
//!                     account index count, then that many 1-byte indices
//!                     data length, then that many bytes
//! ```
//!
//! Counts and lengths are compact-u16 ("shortvec") values, which are a single
//! byte for anything below 128.

use crate::base58;

/// A raw 32-byte Solana public key.
pub type PublicKey = [u8; 32];

/// SPL Token program address.
pub const SPL_TOKEN_PROGRAM: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";

/// SPL Token-2022 program address.
pub const SPL_TOKEN_2022_PROGRAM: &str = "TokenzQdBNbLqP5VEhdkAS6EPFLC1PHnBqCXEpPxuEb";

const SIGNATURE_LEN: usize = 64;
const PUBKEY_LEN: usize = 32;
const BLOCKHASH_LEN: usize = 32;
const MESSAGE_HEADER_LEN: usize = 3;
const VERSION_PREFIX_MASK: u8 = 0x80;

/// Errors raised while walking transaction bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    /// The buffer ended before a field could be read.
    #[error("transaction truncated at offset {offset}: needed {needed} more bytes")]
    UnexpectedEnd {
        /// Offset at which the read started.
        offset: usize,
        /// Number of bytes that were required.
        needed: usize,
    },
    /// A compact-u16 value used more than three bytes or overflowed.
    #[error("invalid compact-u16 length at offset {0}")]
    InvalidShortVec(usize),
    /// An instruction referenced an account outside the account table.
    #[error("account index {0} out of range")]
    AccountIndexOutOfRange(usize),
}

/// One compiled instruction as laid out on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireInstruction {
    /// Index of the program id in the account table.
    pub program_id_index: u8,
    /// Indices into the account table, in instruction order.
    pub accounts: Vec<u8>,
    /// Length of the (uninterpreted) instruction data.
    pub data_len: usize,
}

/// The parts of a serialized transaction needed to recover the payer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolanaWireTransaction {
    /// Number of signatures carried by the transaction.
    pub signature_count: usize,
    /// Whether the message carried a version prefix.
    pub versioned: bool,
    /// Static account keys; index 0 is the fee payer.
    pub account_keys: Vec<PublicKey>,
    /// Compiled instructions in transaction order.
    pub instructions: Vec<WireInstruction>,
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], WireError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.bytes.len())
            .ok_or(WireError::UnexpectedEnd {
                offset: self.pos,
                needed: len,
            })?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, WireError> {
        Ok(self.take(1)?[0])
    }

    fn peek(&self) -> Result<u8, WireError> {
        self.bytes
            .get(self.pos)
            .copied()
            .ok_or(WireError::UnexpectedEnd {
                offset: self.pos,
                needed: 1,
            })
    }

    fn short_vec_len(&mut self) -> Result<usize, WireError> {
        let start = self.pos;
        let mut value: usize = 0;
        for shift in [0u32, 7, 14] {
            let byte = self.u8()?;
            value |= usize::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                return if value > usize::from(u16::MAX) {
                    Err(WireError::InvalidShortVec(start))
                } else {
                    Ok(value)
                };
            }
        }
        Err(WireError::InvalidShortVec(start))
    }
}

impl SolanaWireTransaction {
    /// Walks serialized transaction bytes.
    ///
    /// # Errors
    ///
    /// Returns [`WireError`] if the bytes are truncated or malformed. Instruction
    /// account indices are checked lazily by the lookup methods.
    pub fn parse(bytes: &[u8]) -> Result<Self, WireError> {
        let mut reader = Reader::new(bytes);

        let signature_count = reader.short_vec_len()?;
        reader.take(signature_count * SIGNATURE_LEN)?;

        let versioned = reader.peek()? & VERSION_PREFIX_MASK != 0;
        if versioned {
            reader.u8()?;
        }
        reader.take(MESSAGE_HEADER_LEN)?;

        let key_count = reader.short_vec_len()?;
        let mut account_keys = Vec::with_capacity(key_count);
        for _ in 0..key_count {
            let mut key = [0u8; PUBKEY_LEN];
            key.copy_from_slice(reader.take(PUBKEY_LEN)?);
            account_keys.push(key);
        }

        reader.take(BLOCKHASH_LEN)?;

        let instruction_count = reader.short_vec_len()?;
        let mut instructions = Vec::with_capacity(instruction_count);
        for _ in 0..instruction_count {
            let program_id_index = reader.u8()?;
            let account_count = reader.short_vec_len()?;
            let accounts = reader.take(account_count)?.to_vec();
            let data_len = reader.short_vec_len()?;
            reader.take(data_len)?;
            instructions.push(WireInstruction {
                program_id_index,
                accounts,
                data_len,
            });
        }

        Ok(Self {
            signature_count,
            versioned,
            account_keys,
            instructions,
        })
    }

    /// Returns the fee payer (account table index 0).
    #[must_use]
    pub fn fee_payer(&self) -> Option<&PublicKey> {
        self.account_keys.first()
    }

    fn key(&self, index: usize) -> Result<&PublicKey, WireError> {
        self.account_keys
            .get(index)
            .ok_or(WireError::AccountIndexOutOfRange(index))
    }

    /// Resolves the program id of an instruction through the account table.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::AccountIndexOutOfRange`] for a dangling index.
    pub fn program_id(&self, instruction: &WireInstruction) -> Result<&PublicKey, WireError> {
        self.key(usize::from(instruction.program_id_index))
    }

    /// Finds the authority of the first SPL Token transfer instruction.
    ///
    /// With four or more accounts the instruction is treated as `TransferChecked`
    /// (authority at position 3); with three as `Transfer` (authority at position 2).
    ///
    /// # Errors
    ///
    /// Returns [`WireError::AccountIndexOutOfRange`] if an index on the way
    /// points outside the account table.
    pub fn transfer_authority(&self) -> Result<Option<PublicKey>, WireError> {
        for instruction in &self.instructions {
            let program = base58::encode(self.program_id(instruction)?);
            if program != SPL_TOKEN_PROGRAM && program != SPL_TOKEN_2022_PROGRAM {
                continue;
            }
            let position = match instruction.accounts.len() {
                n if n >= 4 => 3,
                3 => 2,
                _ => continue,
            };
            let index = usize::from(instruction.accounts[position]);
            return Ok(Some(*self.key(index)?));
        }
        Ok(None)
    }

    /// Returns the best available payer: the token transfer authority, else the fee payer.
    ///
    /// # Errors
    ///
    /// Propagates [`WireError`] from [`transfer_authority`](Self::transfer_authority).
    pub fn payer(&self) -> Result<Option<PublicKey>, WireError> {
        match self.transfer_authority()? {
            Some(authority) => Ok(Some(authority)),
            None => Ok(self.fee_payer().copied()),
        }
    }
}

/// Recovers the base58 payer address from a base64-encoded transaction.
///
/// Any decoding or walking failure yields `None`.
#[must_use]
pub fn transaction_payer(transaction_b64: &str) -> Option<String> {
    let bytes = crate::encoding::decode_lenient(transaction_b64).ok()?;
    let walked = SolanaWireTransaction::parse(&bytes).and_then(|tx| tx.payer());
    match walked {
        Ok(payer) => payer.map(|key| base58::encode(&key)),
        Err(_e) => {
            #[cfg(feature = "telemetry")]
            tracing::debug!(error = %_e, "Could not walk Solana transaction bytes");
            None
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn token_program_key() -> PublicKey {
        let bytes = bs58::decode(SPL_TOKEN_PROGRAM).into_vec().unwrap();
        bytes.try_into().unwrap()
    }

    /// Builds a legacy transaction: one signature, four accounts
    /// `[fee_payer, source, mint, authority]` plus the token program, and a single
    /// `TransferChecked`-shaped instruction `[source, mint, destination, authority]`.
    pub(crate) fn transfer_checked_transaction(versioned: bool) -> (Vec<u8>, PublicKey, PublicKey) {
        let fee_payer = [1u8; 32];
        let source = [2u8; 32];
        let mint = [3u8; 32];
        let authority = [4u8; 32];

        let mut tx = vec![1u8];
        tx.extend([9u8; 64]);
        if versioned {
            tx.push(0x80);
        }
        tx.extend([1, 0, 1]);
        tx.push(5);
        for key in [fee_payer, source, mint, authority, token_program_key()] {
            tx.extend(key);
        }
        tx.extend([7u8; 32]);
        tx.push(1);
        tx.push(4);
        tx.push(4);
        tx.extend([1, 2, 1, 3]);
        tx.push(10);
        tx.extend([12u8, 0x40, 0x42, 0x0f, 0, 0, 0, 0, 0, 6]);
        if versioned {
            tx.push(0);
        }
        (tx, fee_payer, authority)
    }

    #[test]
    fn test_transfer_checked_authority_not_fee_payer() {
        let (bytes, fee_payer, authority) = transfer_checked_transaction(false);
        let tx = SolanaWireTransaction::parse(&bytes).unwrap();
        assert_eq!(tx.signature_count, 1);
        assert!(!tx.versioned);
        assert_eq!(tx.account_keys.len(), 5);
        assert_eq!(tx.fee_payer(), Some(&fee_payer));
        assert_eq!(tx.payer().unwrap(), Some(authority));
    }

    #[test]
    fn test_versioned_prefix_is_skipped() {
        let (bytes, _, authority) = transfer_checked_transaction(true);
        let tx = SolanaWireTransaction::parse(&bytes).unwrap();
        assert!(tx.versioned);
        assert_eq!(tx.transfer_authority().unwrap(), Some(authority));
    }

    #[test]
    fn test_transfer_with_three_accounts_uses_index_two() {
        let mut tx = vec![0u8];
        tx.extend([1, 0, 1]);
        tx.push(4);
        for key in [[1u8; 32], [2u8; 32], [5u8; 32], token_program_key()] {
            tx.extend(key);
        }
        tx.extend([0u8; 32]);
        tx.extend([1, 3, 3, 1, 0, 2, 9]);
        tx.extend([3u8, 1, 0, 0, 0, 0, 0, 0, 0]);
        let parsed = SolanaWireTransaction::parse(&tx).unwrap();
        assert_eq!(parsed.payer().unwrap(), Some([5u8; 32]));
    }

    #[test]
    fn test_no_token_instruction_falls_back_to_fee_payer() {
        let mut tx = vec![0u8];
        tx.extend([1, 0, 1]);
        tx.push(2);
        tx.extend([8u8; 32]);
        tx.extend([6u8; 32]);
        tx.extend([0u8; 32]);
        tx.extend([1, 1, 1, 0, 0]);
        let parsed = SolanaWireTransaction::parse(&tx).unwrap();
        assert_eq!(parsed.transfer_authority().unwrap(), None);
        assert_eq!(parsed.payer().unwrap(), Some([8u8; 32]));
    }

    #[test]
    fn test_truncated_bytes_are_an_error() {
        let (bytes, _, _) = transfer_checked_transaction(false);
        for cut in [0, 1, 40, 70, 100, 250] {
            assert!(SolanaWireTransaction::parse(&bytes[..cut]).is_err(), "cut at {cut}");
        }
    }

    #[test]
    fn test_dangling_account_index_yields_none() {
        let (mut bytes, _, _) = transfer_checked_transaction(false);
        let len = bytes.len();
        // last account index of the instruction points past the table
        bytes[len - 12] = 42;
        let encoded = crate::encoding::encode(&bytes);
        assert_eq!(transaction_payer(&encoded), None);
    }

    #[test]
    fn test_transaction_payer_encodes_base58() {
        let (bytes, _, authority) = transfer_checked_transaction(false);
        let encoded = crate::encoding::encode(&bytes);
        assert_eq!(
            transaction_payer(&encoded),
            Some(bs58::encode(authority).into_string())
        );
    }
}
