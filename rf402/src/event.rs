//! Telemetry events and the sink capability that receives them.
//!
//! Both the request-capturing path ([`assess`](crate::assess)) and the refund
//! channel emit [`Event`]s. Delivering them is the job of an [`EventSink`],
//! which this crate only specifies.

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::assess::RefundAssessment;
use crate::executor::TransferReceipt;
use crate::policy::PolicyDenial;

/// Current time as an RFC 3339 UTC timestamp with millisecond precision.
#[must_use]
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// A telemetry event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A paid request was captured and assessed.
    #[serde(rename_all = "camelCase")]
    RequestAssessed {
        /// RFC 3339 time of the assessment.
        timestamp: String,
        /// Request URL.
        url: String,
        /// The assessment.
        assessment: Box<RefundAssessment>,
    },
    /// A refund transfer succeeded.
    #[serde(rename_all = "camelCase")]
    RefundExecuted {
        /// RFC 3339 time of confirmation.
        timestamp: String,
        /// Authority-assigned refund id.
        refund_id: String,
        /// Transfer receipt.
        receipt: TransferReceipt,
    },
    /// A refund was rejected or its transfer failed.
    #[serde(rename_all = "camelCase")]
    RefundFailed {
        /// RFC 3339 time of the failure.
        timestamp: String,
        /// Authority-assigned refund id.
        refund_id: String,
        /// Network of the refund.
        network: String,
        /// Failure detail.
        message: String,
        /// Whether the authority may re-deliver.
        retryable: bool,
        /// Local policy denial, when that was the cause.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        denial: Option<PolicyDenial>,
    },
}

impl Event {
    /// Wire name of the event kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::RequestAssessed { .. } => "request_assessed",
            Self::RefundExecuted { .. } => "refund_executed",
            Self::RefundFailed { .. } => "refund_failed",
        }
    }
}

/// Outcome of submitting a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitSummary {
    /// Events the sink accepted.
    pub accepted: usize,
    /// Events the sink refused.
    pub rejected: usize,
    /// Per-event error messages.
    #[serde(default)]
    pub errors: Vec<String>,
}

/// Failure to deliver a batch or to read the sink's answer.
#[derive(Debug, thiserror::Error)]
pub enum EventSinkError {
    /// The sink could not be reached.
    #[error("event sink unreachable: {0}")]
    Unreachable(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// The sink answered with an error status.
    #[error("event sink returned {status}: {body}")]
    Status {
        /// Response status code.
        status: u16,
        /// Response body.
        body: String,
    },
    /// The sink accepted the request but its summary could not be decoded.
    #[error("event sink summary undecodable: {0}")]
    Decode(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Accepts batches of telemetry events.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Submits a batch.
    ///
    /// # Errors
    ///
    /// Returns [`EventSinkError`] when the batch could not be delivered.
    async fn submit(&self, batch: Vec<Event>) -> Result<SubmitSummary, EventSinkError>;
}
