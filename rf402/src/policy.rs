//! Refund decisions and local spend caps.
//!
//! [`decide_refund_reason`] maps a validation outcome to the first matching
//! [`RefundReason`]. [`check_caps`] decides whether an amount may be refunded
//! under the effective endpoint policy and the local [`SpendCaps`] counters.
//!
//! Local counters are advisory. The remote refund authority keeps the
//! authoritative accounting; these only let a process fail fast.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::{EffectivePolicy, RefundTriggers};
use crate::money;
use crate::validate::ValidationResult;

/// Why a response warrants a refund.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundReason {
    /// The upstream answered with a 5xx status.
    ServerError,
    /// The response body was empty.
    EmptyResponse,
    /// Required fields or the declared schema were not met.
    SchemaValidation,
    /// The meaningfulness score fell below the configured threshold.
    LowMeaningfulness,
}

impl RefundReason {
    /// Wire name of the reason.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ServerError => "server_error",
            Self::EmptyResponse => "empty_response",
            Self::SchemaValidation => "schema_validation",
            Self::LowMeaningfulness => "low_meaningfulness",
        }
    }
}

impl fmt::Display for RefundReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Checks whose failure fires the schema-validation trigger.
const SCHEMA_CHECKS: &[&str] = &["required_fields", "schema_type", "schema_required"];

/// Picks the refund reason for a validated response, if any trigger fires.
///
/// Triggers are evaluated in priority order: server error, empty response,
/// schema validation, low meaningfulness.
#[must_use]
pub fn decide_refund_reason(
    result: &ValidationResult,
    status: u16,
    triggers: &RefundTriggers,
) -> Option<RefundReason> {
    if triggers.server_error && status >= 500 {
        return Some(RefundReason::ServerError);
    }
    if triggers.empty_response && result.failed("not_empty") {
        return Some(RefundReason::EmptyResponse);
    }
    if triggers.schema_validation && SCHEMA_CHECKS.iter().any(|c| result.failed(c)) {
        return Some(RefundReason::SchemaValidation);
    }
    match triggers.min_meaningfulness {
        Some(threshold) if result.meaningfulness_score < threshold => {
            Some(RefundReason::LowMeaningfulness)
        }
        _ => None,
    }
}

/// Why a refund was refused locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyDenial {
    /// Refunds are disabled for the endpoint.
    EndpointDisabled,
    /// The amount exceeds the per-request maximum.
    ExceedsMaxRefund,
    /// The local daily budget would be exceeded.
    DailyCapExceeded,
    /// The local monthly budget would be exceeded.
    MonthlyCapExceeded,
    /// The network belongs to no supported family.
    UnsupportedNetwork,
    /// No executor is configured for the network's family.
    ExecutorNotConfigured,
}

impl PolicyDenial {
    /// Wire name of the denial.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EndpointDisabled => "endpoint_disabled",
            Self::ExceedsMaxRefund => "exceeds_max_refund",
            Self::DailyCapExceeded => "daily_cap_exceeded",
            Self::MonthlyCapExceeded => "monthly_cap_exceeded",
            Self::UnsupportedNetwork => "unsupported_network",
            Self::ExecutorNotConfigured => "executor_not_configured",
        }
    }
}

impl fmt::Display for PolicyDenial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of [`check_caps`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum CapDecision {
    /// The refund fits all limits.
    Allow,
    /// The refund is refused.
    Deny {
        /// Typed reason.
        denial: PolicyDenial,
        /// Human-readable detail.
        note: String,
    },
}

impl CapDecision {
    fn deny(denial: PolicyDenial, note: String) -> Self {
        Self::Deny { denial, note }
    }

    /// Returns `true` for [`CapDecision::Allow`].
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// Process-local refund counters with lazy day and month rollover.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpendCaps {
    today_refunded_cents: u64,
    month_refunded_cents: u64,
    day_marker: String,
    month_marker: String,
}

fn day_marker(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn month_marker(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}

impl SpendCaps {
    /// Creates zeroed counters for the given date.
    #[must_use]
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today_refunded_cents: 0,
            month_refunded_cents: 0,
            day_marker: day_marker(today),
            month_marker: month_marker(today),
        }
    }

    /// Creates counters with existing totals, as if restored from elsewhere.
    #[must_use]
    pub fn with_totals(today: NaiveDate, today_cents: u64, month_cents: u64) -> Self {
        Self {
            today_refunded_cents: today_cents,
            month_refunded_cents: month_cents,
            ..Self::new(today)
        }
    }

    /// Resets each counter whose marker differs from `today`.
    pub fn roll_over(&mut self, today: NaiveDate) {
        let day = day_marker(today);
        if self.day_marker != day {
            self.today_refunded_cents = 0;
            self.day_marker = day;
        }
        let month = month_marker(today);
        if self.month_marker != month {
            self.month_refunded_cents = 0;
            self.month_marker = month;
        }
    }

    /// Adds an amount to both counters.
    pub const fn record(&mut self, cents: u64) {
        self.today_refunded_cents = self.today_refunded_cents.saturating_add(cents);
        self.month_refunded_cents = self.month_refunded_cents.saturating_add(cents);
    }

    /// Removes a previously recorded amount.
    pub const fn release(&mut self, cents: u64) {
        self.today_refunded_cents = self.today_refunded_cents.saturating_sub(cents);
        self.month_refunded_cents = self.month_refunded_cents.saturating_sub(cents);
    }

    /// Rolls over, checks and on success records the amount in one step.
    pub fn admit(&mut self, cents: u64, policy: &EffectivePolicy, today: NaiveDate) -> CapDecision {
        self.roll_over(today);
        let decision = check_caps(cents, policy, self);
        if decision.is_allowed() {
            self.record(cents);
        }
        decision
    }

    /// Cents refunded on the current day.
    #[must_use]
    pub const fn today_refunded_cents(&self) -> u64 {
        self.today_refunded_cents
    }

    /// Cents refunded in the current month.
    #[must_use]
    pub const fn month_refunded_cents(&self) -> u64 {
        self.month_refunded_cents
    }

    /// Current `YYYY-MM-DD` marker.
    #[must_use]
    pub fn day_marker(&self) -> &str {
        &self.day_marker
    }

    /// Current `YYYY-MM` marker.
    #[must_use]
    pub fn month_marker(&self) -> &str {
        &self.month_marker
    }
}

fn usd(cents: u64) -> String {
    format!("${}", money::cents_to_usd(cents))
}

/// Decides whether `amount_cents` may be refunded.
///
/// Checked in order: endpoint enablement, per-request maximum, daily cap,
/// monthly cap. A cap is exceeded when `counter + amount > cap`. The counters
/// are read as given; call [`SpendCaps::roll_over`] first.
#[must_use]
pub fn check_caps(amount_cents: u64, policy: &EffectivePolicy, caps: &SpendCaps) -> CapDecision {
    if !policy.enabled {
        let scope = policy.pattern.as_deref().unwrap_or("global config");
        return CapDecision::deny(
            PolicyDenial::EndpointDisabled,
            format!("refunds disabled by {scope}"),
        );
    }
    if amount_cents > policy.max_refund_cents {
        return CapDecision::deny(
            PolicyDenial::ExceedsMaxRefund,
            format!(
                "amount {} exceeds max refund {}",
                usd(amount_cents),
                usd(policy.max_refund_cents)
            ),
        );
    }
    if let Some(cap) = policy.daily_cap_cents
        && caps.today_refunded_cents.saturating_add(amount_cents) > cap
    {
        return CapDecision::deny(
            PolicyDenial::DailyCapExceeded,
            format!(
                "daily cap {} reached ({} refunded today)",
                usd(cap),
                usd(caps.today_refunded_cents)
            ),
        );
    }
    if let Some(cap) = policy.monthly_cap_cents
        && caps.month_refunded_cents.saturating_add(amount_cents) > cap
    {
        return CapDecision::deny(
            PolicyDenial::MonthlyCapExceeded,
            format!(
                "monthly cap {} reached ({} refunded this month)",
                usd(cap),
                usd(caps.month_refunded_cents)
            ),
        );
    }
    CapDecision::Allow
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::config::RefundConfig;
    use crate::validate::{ValidationConfig, validate_response};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn policy(daily: Option<&str>, monthly: Option<&str>, max: &str) -> EffectivePolicy {
        RefundConfig {
            max_refund_usd: max.parse().unwrap(),
            daily_cap_usd: daily.map(|d| d.parse().unwrap()),
            monthly_cap_usd: monthly.map(|m| m.parse().unwrap()),
            ..RefundConfig::default()
        }
        .effective(None)
    }

    #[test]
    fn test_reason_priority() {
        let triggers = RefundTriggers {
            schema_validation: true,
            min_meaningfulness: Some(0.9),
            ..RefundTriggers::default()
        };
        let cfg = ValidationConfig {
            required_fields: vec!["data".into()],
            ..ValidationConfig::default()
        };

        let empty = validate_response(&json!(""), 502, &cfg);
        assert_eq!(
            decide_refund_reason(&empty, 502, &triggers),
            Some(RefundReason::ServerError)
        );
        let empty = validate_response(&json!(""), 200, &cfg);
        assert_eq!(
            decide_refund_reason(&empty, 200, &triggers),
            Some(RefundReason::EmptyResponse)
        );
        let partial = validate_response(&json!({"other": 1}), 200, &cfg);
        assert_eq!(
            decide_refund_reason(&partial, 200, &triggers),
            Some(RefundReason::SchemaValidation)
        );
        let noisy = validate_response(&json!({"data": 1, "error": "x"}), 200, &cfg);
        assert_eq!(
            decide_refund_reason(&noisy, 200, &triggers),
            Some(RefundReason::LowMeaningfulness)
        );
        let fine = validate_response(&json!({"data": 1}), 200, &cfg);
        assert_eq!(decide_refund_reason(&fine, 200, &triggers), None);
    }

    #[test]
    fn test_disabled_triggers_do_not_fire() {
        let triggers = RefundTriggers {
            server_error: false,
            empty_response: false,
            ..RefundTriggers::default()
        };
        let result = validate_response(&json!(""), 500, &ValidationConfig::default());
        assert_eq!(decide_refund_reason(&result, 500, &triggers), None);
    }

    #[test]
    fn test_daily_cap_boundary() {
        let policy = policy(Some("50"), None, "5");
        let today = date(2026, 3, 14);
        let mut caps = SpendCaps::with_totals(today, 4950, 4950);

        let denied = caps.admit(100, &policy, today);
        assert!(matches!(
            denied,
            CapDecision::Deny {
                denial: PolicyDenial::DailyCapExceeded,
                ..
            }
        ));
        assert_eq!(caps.today_refunded_cents(), 4950);

        assert_eq!(caps.admit(50, &policy, today), CapDecision::Allow);
        assert_eq!(caps.today_refunded_cents(), 5000);
    }

    #[test]
    fn test_check_order() {
        let caps = SpendCaps::with_totals(date(2026, 1, 1), 0, 9_990);
        let mut disabled = policy(Some("1"), Some("100"), "1");
        disabled.enabled = false;
        assert!(matches!(
            check_caps(500, &disabled, &caps),
            CapDecision::Deny {
                denial: PolicyDenial::EndpointDisabled,
                ..
            }
        ));
        let capped = policy(Some("1"), Some("100"), "1");
        assert!(matches!(
            check_caps(500, &capped, &caps),
            CapDecision::Deny {
                denial: PolicyDenial::ExceedsMaxRefund,
                ..
            }
        ));
        assert!(matches!(
            check_caps(100, &policy(Some("50"), Some("100"), "1"), &caps),
            CapDecision::Deny {
                denial: PolicyDenial::MonthlyCapExceeded,
                ..
            }
        ));
        assert_eq!(
            check_caps(10, &policy(Some("50"), Some("100"), "1"), &caps),
            CapDecision::Allow
        );
    }

    #[test]
    fn test_day_rollover_resets_before_check() {
        let policy = policy(Some("50"), None, "5");
        let mut caps = SpendCaps::with_totals(date(2026, 3, 14), 5000, 5000);
        assert!(!caps.admit(100, &policy, date(2026, 3, 14)).is_allowed());
        assert!(caps.admit(100, &policy, date(2026, 3, 15)).is_allowed());
        assert_eq!(caps.today_refunded_cents(), 100);
        assert_eq!(caps.month_refunded_cents(), 5100);
        assert_eq!(caps.day_marker(), "2026-03-15");
    }

    #[test]
    fn test_month_rollover() {
        let mut caps = SpendCaps::with_totals(date(2026, 1, 31), 10, 900);
        caps.roll_over(date(2026, 2, 1));
        assert_eq!(caps.today_refunded_cents(), 0);
        assert_eq!(caps.month_refunded_cents(), 0);
        assert_eq!(caps.month_marker(), "2026-02");
    }

    #[test]
    fn test_release_undoes_record() {
        let mut caps = SpendCaps::new(date(2026, 5, 1));
        caps.record(70);
        caps.release(70);
        assert_eq!(caps, SpendCaps::new(date(2026, 5, 1)));
    }

    #[test]
    fn test_wire_names() {
        assert_eq!(
            serde_json::to_value(PolicyDenial::ExecutorNotConfigured).unwrap(),
            json!("executor_not_configured")
        );
        assert_eq!(RefundReason::LowMeaningfulness.to_string(), "low_meaningfulness");
        assert_eq!(
            serde_json::to_value(CapDecision::Allow).unwrap(),
            json!({"decision": "allow"})
        );
    }
}
