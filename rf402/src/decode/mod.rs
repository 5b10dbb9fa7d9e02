//! Payment header decoding.
//!
//! x402 clients send their payment as an opaque header: usually base64 of a
//! JSON envelope, sometimes the raw JSON. EVM payments carry an EIP-3009
//! authorization whose `from` is the payer. Solana payments carry a serialized
//! transaction, from which the payer is recovered by [`solana`]'s wire walker.
//!
//! Decoding is best effort. [`decode_payment_header`] never fails; anything it
//! cannot make sense of becomes `None`.

pub mod solana;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::encoding;

/// Payer fields, highest priority first.
const PAYER_FIELDS: &[&str] = &[
    "payload.authorization.from",
    "authorization.from",
    "payer",
    "from",
    "payload.from",
    "payload.signer",
    "signer",
];

/// Amount fields, highest priority first.
const AMOUNT_FIELDS: &[&str] = &[
    "payload.authorization.value",
    "accepted.amount",
    "accepted.maxAmountRequired",
    "amount",
    "value",
    "payload.amount",
    "maxAmountRequired",
];

/// Network fields, highest priority first.
const NETWORK_FIELDS: &[&str] = &["network", "accepted.network", "payload.network"];

/// Location of a base64 Solana transaction in the envelope.
const TRANSACTION_FIELD: &str = "payload.transaction";

/// Network assumed when the payer came from a Solana transaction.
pub const DEFAULT_SOLANA_NETWORK: &str = "solana";

/// What could be recovered from a payment header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodedPayment {
    /// Address that paid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payer: Option<String>,
    /// Amount paid, in token base units.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
    /// Network the payment was made on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
}

fn lookup<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(root, |value, key| value.get(key))
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn first_field(root: &Value, fields: &[&str]) -> Option<String> {
    fields
        .iter()
        .find_map(|path| lookup(root, path).and_then(scalar))
}

fn parse_envelope(header: &str) -> Option<Value> {
    let parsed = encoding::decode_utf8(header)
        .and_then(|text| serde_json::from_str::<Value>(&text).ok())
        .or_else(|| serde_json::from_str::<Value>(header.trim()).ok());
    #[cfg(feature = "telemetry")]
    if parsed.is_none() {
        tracing::debug!("Payment header is neither base64 JSON nor raw JSON");
    }
    parsed.filter(Value::is_object)
}

/// Decodes a payment header into payer, amount and network.
///
/// Returns `None` when the header is not a JSON object (directly or
/// base64-encoded) or none of the three values can be found.
#[must_use]
pub fn decode_payment_header(header: &str) -> Option<DecodedPayment> {
    let envelope = parse_envelope(header)?;

    let mut from_transaction = false;
    let payer = first_field(&envelope, PAYER_FIELDS).or_else(|| {
        let transaction = lookup(&envelope, TRANSACTION_FIELD)?.as_str()?;
        let payer = solana::transaction_payer(transaction)?;
        from_transaction = true;
        Some(payer)
    });

    let amount = first_field(&envelope, AMOUNT_FIELDS);
    let network = first_field(&envelope, NETWORK_FIELDS)
        .or_else(|| from_transaction.then(|| DEFAULT_SOLANA_NETWORK.to_owned()));

    let decoded = DecodedPayment {
        payer,
        amount,
        network,
    };
    (decoded != DecodedPayment::default()).then_some(decoded)
}
