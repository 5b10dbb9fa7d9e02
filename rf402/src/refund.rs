//! Refund instructions issued by the refund authority.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::money;
use crate::networks::NetworkId;

/// A refund the remote authority asks this process to execute.
///
/// The `id` is assigned by the authority and is the idempotency key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingRefund {
    /// Authority-assigned identifier.
    pub id: String,
    /// URL of the request being refunded.
    pub url: String,
    /// Network to refund on.
    pub network: NetworkId,
    /// Amount in cents.
    pub amount_cents: u64,
    /// Amount in USD, informational.
    pub amount_usd: Decimal,
    /// Address receiving the refund.
    pub recipient: String,
    /// Why the authority decided to refund.
    pub reason: String,
    /// Upstream status code of the refunded request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    /// Meaningfulness score of the refunded response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meaningfulness_score: Option<f64>,
    /// Hash of the original payment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_tx_hash: Option<String>,
}

impl PendingRefund {
    /// Amount in USDC base units, derived from `amount_cents`.
    #[must_use]
    pub const fn amount_base_units(&self) -> u64 {
        money::cents_to_base_units(self.amount_cents)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::networks::NetworkFamily;

    #[test]
    fn test_deserialize_wire_refund() {
        let refund: PendingRefund = serde_json::from_value(json!({
            "id": "rf_1",
            "url": "https://api.example.com/weather",
            "network": "base-sepolia",
            "amountCents": 25,
            "amountUsd": 0.25,
            "recipient": "0x0000000000000000000000000000000000000001",
            "reason": "server_error",
            "statusCode": 502
        }))
        .unwrap();
        assert_eq!(refund.network.family(), NetworkFamily::Evm);
        assert_eq!(refund.amount_base_units(), 250_000);
        assert_eq!(refund.status_code, Some(502));
        assert!(refund.payment_tx_hash.is_none());
    }
}
