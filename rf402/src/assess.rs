//! The request-capturing path.
//!
//! An [`Assessor`] takes a captured paid request (URL, status, body and
//! payment header) and produces a [`RefundAssessment`]: who paid, how
//! meaningful the response was, whether a refund is warranted and whether it
//! would fit the local caps. It executes nothing; in deployed use the refund
//! authority decides and pushes instructions down the refund channel.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{EndpointMatcher, RefundConfig};
use crate::decode::{DecodedPayment, decode_payment_header};
use crate::error::ConfigError;
use crate::event::{Event, timestamp_now};
use crate::money;
use crate::policy::{CapDecision, RefundReason, SpendCaps, check_caps, decide_refund_reason};
use crate::validate::{CustomValidator, ValidationResult, validate_response, validate_schema};

/// A captured paid request.
#[derive(Debug, Clone, Copy)]
pub struct CapturedRequest<'a> {
    /// Full request URL.
    pub url: &'a str,
    /// Upstream response status.
    pub status: u16,
    /// Response body as JSON.
    pub body: &'a Value,
    /// Raw payment header, if the request carried one.
    pub payment_header: Option<&'a str>,
}

/// Outcome of assessing one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundAssessment {
    /// Decoded payment, when the header was readable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decoded_payment: Option<DecodedPayment>,
    /// Response validation, merged with the schema result when a schema is configured.
    pub validation: ValidationResult,
    /// Refund reason, if a trigger fired.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<RefundReason>,
    /// Refund amount in cents, when a reason fired and the payment amount is known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_cents: Option<u64>,
    /// Local cap decision for that amount.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cap_decision: Option<CapDecision>,
    /// Pattern of the endpoint override that applied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

impl RefundAssessment {
    /// Returns `true` if a refund is warranted and allowed locally.
    #[must_use]
    pub fn refund_warranted(&self) -> bool {
        self.reason.is_some() && self.cap_decision.as_ref().is_some_and(CapDecision::is_allowed)
    }
}

/// Assesses captured requests against a refund configuration.
#[derive(Clone)]
pub struct Assessor {
    config: RefundConfig,
    matcher: EndpointMatcher,
    custom: Option<Arc<dyn CustomValidator>>,
}

impl std::fmt::Debug for Assessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Assessor")
            .field("config", &self.config)
            .field("endpoints", &self.matcher.len())
            .field("custom", &self.custom.is_some())
            .finish()
    }
}

impl Assessor {
    /// Creates an assessor, compiling endpoint patterns.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration is invalid.
    pub fn new(config: RefundConfig) -> Result<Self, ConfigError> {
        let matcher = config.matcher()?;
        Ok(Self {
            config,
            matcher,
            custom: None,
        })
    }

    /// Attaches a custom validator applied to every response.
    #[must_use]
    pub fn with_custom_validator(mut self, validator: impl CustomValidator + 'static) -> Self {
        self.custom = Some(Arc::new(validator));
        self
    }

    /// The configuration in use.
    #[must_use]
    pub const fn config(&self) -> &RefundConfig {
        &self.config
    }

    /// Assesses a request.
    ///
    /// Caps are checked against a rolled-over copy of `caps`; the counters
    /// themselves are never changed here.
    #[must_use]
    pub fn assess(
        &self,
        request: &CapturedRequest<'_>,
        caps: &SpendCaps,
        today: NaiveDate,
    ) -> (RefundAssessment, Event) {
        let endpoint = self.matcher.find(request.url);
        let policy = self.config.effective(endpoint);

        let decoded_payment = request.payment_header.and_then(decode_payment_header);

        let mut validation_config = policy.expected_response.validation_config();
        validation_config.custom.clone_from(&self.custom);
        let mut validation = validate_response(request.body, request.status, &validation_config);
        if let Some(schema) = &policy.expected_response.schema {
            validation = validation.merge(&validate_schema(request.body, schema));
        }

        let reason = decide_refund_reason(&validation, request.status, &policy.triggers);
        let amount_cents = reason.and_then(|_| {
            decoded_payment
                .as_ref()
                .and_then(|p| p.amount.as_deref())
                .and_then(money::base_units_to_cents)
        });
        let cap_decision = amount_cents.map(|cents| {
            let mut snapshot = caps.clone();
            snapshot.roll_over(today);
            check_caps(cents, &policy, &snapshot)
        });

        #[cfg(feature = "telemetry")]
        tracing::debug!(
            url = request.url,
            status = request.status,
            score = validation.meaningfulness_score,
            reason = ?reason,
            "Request assessed"
        );

        let assessment = RefundAssessment {
            decoded_payment,
            validation,
            reason,
            amount_cents,
            cap_decision,
            endpoint: policy.pattern,
        };
        let event = Event::RequestAssessed {
            timestamp: timestamp_now(),
            url: request.url.to_owned(),
            assessment: Box::new(assessment.clone()),
        };
        (assessment, event)
    }
}
