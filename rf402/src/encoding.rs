//! Base64 decoding utilities for payment headers.
//!
//! Payment headers arrive base64-encoded by most clients, but padding and
//! alphabet vary between SDKs. [`decode_lenient`] accepts every variant seen
//! in practice: standard with or without padding, and URL-safe.

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD};

/// Decodes base64 text using the standard alphabet first, then the URL-safe one.
///
/// Surrounding whitespace is ignored.
///
/// # Errors
///
/// Returns the error from the last attempted engine if no variant decodes.
pub fn decode_lenient(input: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let input = input.trim();
    STANDARD
        .decode(input)
        .or_else(|_| STANDARD_NO_PAD.decode(input))
        .or_else(|_| URL_SAFE.decode(input))
        .or_else(|_| URL_SAFE_NO_PAD.decode(input))
}

/// Decodes base64 text into a UTF-8 string.
///
/// Returns `None` if the input is not base64 or the bytes are not UTF-8.
#[must_use]
pub fn decode_utf8(input: &str) -> Option<String> {
    let bytes = decode_lenient(input).ok()?;
    String::from_utf8(bytes).ok()
}

/// Encodes bytes with the standard padded alphabet.
pub fn encode<T: AsRef<[u8]>>(input: T) -> String {
    STANDARD.encode(input.as_ref())
}
