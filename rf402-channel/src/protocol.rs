//! Wire messages exchanged with the refund authority.
//!
//! Every frame is a JSON text message tagged by `"type"` with camelCase
//! payload fields.
//!
//! | Direction | `type`             | Payload                                                       |
//! |-----------|--------------------|---------------------------------------------------------------|
//! | server    | `connected`        | `registrationId`                                              |
//! | server    | `refund_required`  | `refund` ([`PendingRefund`])                                  |
//! | server    | `pong`             |                                                               |
//! | client    | `refund_executing` | `refundId`                                                    |
//! | client    | `refund_confirmed` | `refundId`, `txId`, `network`, `amountRaw`, `token`, `costEstimate` |
//! | client    | `refund_rejected`  | `refundId`, `reason`, `note`                                  |
//! | client    | `ping`             |                                                               |

use rf402::executor::{CostEstimate, TransferReceipt};
use rf402::refund::PendingRefund;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Rejection reason used for non-retryable execution failures.
pub const EXECUTION_FAILED: &str = "execution_failed";

/// Rejection reason for a `refund_required` frame whose refund cannot be decoded.
pub const INVALID_REQUEST: &str = "invalid_request";

/// Messages sent by the refund authority.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Registration confirmed.
    #[serde(rename_all = "camelCase")]
    Connected {
        /// Identifier of this registration.
        registration_id: String,
    },
    /// A refund to execute.
    RefundRequired {
        /// The refund instruction.
        refund: PendingRefund,
    },
    /// Heartbeat acknowledgment.
    Pong,
}

const SERVER_MESSAGE_TYPES: &[&str] = &["connected", "refund_required", "pong"];

/// Messages sent to the refund authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Execution of a refund has started.
    #[serde(rename_all = "camelCase")]
    RefundExecuting {
        /// Refund being executed.
        refund_id: String,
    },
    /// A refund was executed.
    #[serde(rename_all = "camelCase")]
    RefundConfirmed {
        /// Executed refund.
        refund_id: String,
        /// Transaction hash or signature.
        tx_id: String,
        /// Network the transfer ran on.
        network: String,
        /// Amount in token base units.
        amount_raw: String,
        /// Token symbol.
        token: String,
        /// Network fee paid.
        cost_estimate: CostEstimate,
    },
    /// A refund will not be executed.
    #[serde(rename_all = "camelCase")]
    RefundRejected {
        /// Rejected refund.
        refund_id: String,
        /// Machine-readable reason.
        reason: String,
        /// Human-readable detail.
        note: String,
    },
    /// Heartbeat.
    Ping,
}

impl ClientMessage {
    /// Builds a confirmation from a transfer receipt.
    #[must_use]
    pub fn confirmed(refund_id: &str, receipt: &TransferReceipt) -> Self {
        Self::RefundConfirmed {
            refund_id: refund_id.to_owned(),
            tx_id: receipt.tx_id.clone(),
            network: receipt.network.clone(),
            amount_raw: receipt.amount_raw.clone(),
            token: receipt.token.clone(),
            cost_estimate: receipt.cost_estimate.clone(),
        }
    }

    /// Builds a rejection.
    pub fn rejected(refund_id: &str, reason: impl Into<String>, note: impl Into<String>) -> Self {
        Self::RefundRejected {
            refund_id: refund_id.to_owned(),
            reason: reason.into(),
            note: note.into(),
        }
    }

    /// Serializes the message to a JSON text frame.
    ///
    /// # Errors
    ///
    /// Returns a [`serde_json::Error`] if serialization fails.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// A known message.
    Message(ServerMessage),
    /// A well-formed frame with a type this client does not know.
    Unknown(String),
}

/// Decodes an inbound text frame.
///
/// # Errors
///
/// Returns a [`serde_json::Error`] if the frame is not JSON or a known
/// message type has an invalid payload.
pub fn decode_server_message(text: &str) -> Result<Inbound, serde_json::Error> {
    let value: Value = serde_json::from_str(text)?;
    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned();
    if !SERVER_MESSAGE_TYPES.contains(&kind.as_str()) {
        return Ok(Inbound::Unknown(kind));
    }
    serde_json::from_value(value).map(Inbound::Message)
}

/// The `refund.id` of a `refund_required` frame, read without decoding the
/// rest of the refund.
///
/// Lets a malformed instruction be rejected instead of silently dropped.
#[must_use]
pub fn refund_id_hint(text: &str) -> Option<String> {
    let value: Value = serde_json::from_str(text).ok()?;
    if value.get("type").and_then(Value::as_str) != Some("refund_required") {
        return None;
    }
    value
        .pointer("/refund/id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_decode_refund_required() {
        let text = json!({
            "type": "refund_required",
            "refund": {
                "id": "rf_1",
                "url": "https://api.example.com/x",
                "network": "solana-devnet",
                "amountCents": 5,
                "amountUsd": "0.05",
                "recipient": "9xQeWvG816bUx9EPjHmaT23yvVM2ZWbrrpZb9PusVFin",
                "reason": "empty_response",
                "meaningfulnessScore": 0.6
            }
        })
        .to_string();
        let Inbound::Message(ServerMessage::RefundRequired { refund }) =
            decode_server_message(&text).unwrap()
        else {
            panic!("expected refund_required");
        };
        assert_eq!(refund.id, "rf_1");
        assert_eq!(refund.meaningfulness_score, Some(0.6));
    }

    #[test]
    fn test_decode_connected_and_unknown() {
        assert_eq!(
            decode_server_message(r#"{"type":"connected","registrationId":"reg_7"}"#).unwrap(),
            Inbound::Message(ServerMessage::Connected {
                registration_id: "reg_7".into()
            })
        );
        assert_eq!(
            decode_server_message(r#"{"type":"stats","n":1}"#).unwrap(),
            Inbound::Unknown("stats".into())
        );
        assert!(decode_server_message("not json").is_err());
        assert!(decode_server_message(r#"{"type":"refund_required"}"#).is_err());
    }

    #[test]
    fn test_encode_client_messages() {
        assert_eq!(ClientMessage::Ping.encode().unwrap(), r#"{"type":"ping"}"#);
        let executing = ClientMessage::RefundExecuting {
            refund_id: "rf_2".into(),
        };
        assert_eq!(
            serde_json::to_value(&executing).unwrap(),
            json!({"type": "refund_executing", "refundId": "rf_2"})
        );
        let rejected = ClientMessage::rejected("rf_3", "daily_cap_exceeded", "cap reached");
        assert_eq!(
            serde_json::to_value(&rejected).unwrap(),
            json!({"type": "refund_rejected", "refundId": "rf_3",
                   "reason": "daily_cap_exceeded", "note": "cap reached"})
        );
    }

    #[test]
    fn test_confirmed_copies_receipt() {
        let receipt = TransferReceipt {
            tx_id: "0xhash".into(),
            network: "base".into(),
            amount_raw: "50000".into(),
            token: "USDC".into(),
            cost_estimate: CostEstimate {
                native_amount: "21000".into(),
                unit: "wei".into(),
            },
        };
        let value = serde_json::to_value(ClientMessage::confirmed("rf_4", &receipt)).unwrap();
        assert_eq!(value["type"], "refund_confirmed");
        assert_eq!(value["txId"], "0xhash");
        assert_eq!(value["amountRaw"], "50000");
        assert_eq!(value["costEstimate"]["unit"], "wei");
    }

    #[test]
    fn test_refund_id_hint() {
        let missing_network = json!({
            "type": "refund_required",
            "refund": { "id": "rf_5", "url": "https://api.example.com/x", "amountCents": 5 }
        })
        .to_string();
        assert!(decode_server_message(&missing_network).is_err());
        assert_eq!(refund_id_hint(&missing_network).as_deref(), Some("rf_5"));

        assert_eq!(refund_id_hint(r#"{"type":"refund_required","refund":{}}"#), None);
        assert_eq!(refund_id_hint(r#"{"type":"refund_required","refund":{"id":7}}"#), None);
        assert_eq!(refund_id_hint(r#"{"type":"connected","refund":{"id":"x"}}"#), None);
        assert_eq!(refund_id_hint("not json"), None);
    }
}
