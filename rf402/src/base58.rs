//! Base58 encoding with the Bitcoin/Solana alphabet.
//!
//! Solana public keys are rendered as base58 strings. The payment decoder walks
//! raw transaction bytes without a Solana SDK, so the encoding lives here.

/// The Bitcoin/Solana base58 alphabet.
pub const ALPHABET: &[u8; 58] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// Encodes bytes as base58.
///
/// The input is read as a big-endian unsigned integer and repeatedly divided
/// by 58; every leading zero byte contributes one `'1'`. An input consisting
/// only of zero bytes (including the empty input) encodes to `"1"`.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn encode(bytes: &[u8]) -> String {
    let zeros = bytes.iter().take_while(|b| **b == 0).count();
    if zeros == bytes.len() {
        return "1".to_owned();
    }

    // Little-endian base58 digits of the non-zero tail.
    let mut digits: Vec<u8> = Vec::with_capacity(bytes.len() * 138 / 100 + 1);
    for &byte in &bytes[zeros..] {
        let mut carry = u32::from(byte);
        for digit in &mut digits {
            carry += u32::from(*digit) << 8;
            *digit = (carry % 58) as u8;
            carry /= 58;
        }
        while carry > 0 {
            digits.push((carry % 58) as u8);
            carry /= 58;
        }
    }

    let mut out = String::with_capacity(zeros + digits.len());
    out.extend(std::iter::repeat_n('1', zeros));
    out.extend(
        digits
            .iter()
            .rev()
            .map(|d| char::from(ALPHABET[usize::from(*d)])),
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_zero_key_encodes_to_one() {
        assert_eq!(encode(&[0u8; 32]), "1");
    }

    #[test]
    fn test_known_program_ids() {
        let token_program = bs58::decode("TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA")
            .into_vec()
            .unwrap();
        assert_eq!(
            encode(&token_program),
            "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA"
        );

        let usdc_mint = bs58::decode("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v")
            .into_vec()
            .unwrap();
        assert_eq!(encode(&usdc_mint), "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v");
    }

    #[test]
    fn test_leading_zero_bytes_become_ones() {
        let mut key = [7u8; 32];
        key[0] = 0;
        key[1] = 0;
        let encoded = encode(&key);
        assert!(encoded.starts_with("11"));
        assert_eq!(encoded, bs58::encode(key).into_string());
    }

    #[test]
    fn test_matches_reference_encoder() {
        for seed in 1u8..=16 {
            let key: Vec<u8> = (0..32u8)
                .map(|i| i.wrapping_mul(seed).wrapping_add(seed))
                .collect();
            assert_eq!(encode(&key), bs58::encode(&key).into_string());
        }
    }

    #[test]
    fn test_small_values() {
        assert_eq!(encode(&[57]), "z");
        assert_eq!(encode(&[58]), "21");
        assert_eq!(encode(&[0, 1]), "12");
    }
}
