//! Refund configuration and endpoint pattern matching.
//!
//! A [`RefundConfig`] holds the global refund settings plus an ordered list of
//! per-endpoint overrides. Endpoint patterns use `*` as the only wildcard; every
//! other character matches literally. A pattern matches when it covers the whole
//! request URL or the whole request path, and the first declared match wins.

use std::borrow::Cow;

use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ConfigError;
use crate::money;
use crate::validate::{ResponseSchema, ValidationConfig};

const fn default_true() -> bool {
    true
}

fn default_max_refund_usd() -> Decimal {
    Decimal::ONE
}

fn default_error_fields() -> Vec<String> {
    vec!["error".to_owned(), "errors".to_owned()]
}

const fn default_min_length() -> usize {
    2
}

/// Which validation outcomes warrant a refund.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundTriggers {
    /// Refund when the upstream answered with a 5xx status.
    #[serde(default = "default_true")]
    pub server_error: bool,
    /// Refund when the response body is empty.
    #[serde(default = "default_true")]
    pub empty_response: bool,
    /// Refund when required fields or the declared schema are not met.
    #[serde(default)]
    pub schema_validation: bool,
    /// Refund when the meaningfulness score drops below this threshold.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_meaningfulness: Option<f64>,
}

impl Default for RefundTriggers {
    fn default() -> Self {
        Self {
            server_error: true,
            empty_response: true,
            schema_validation: false,
            min_meaningfulness: None,
        }
    }
}

/// What a meaningful response from an endpoint looks like.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpectedResponse {
    /// Top-level fields that must be present and non-null.
    #[serde(default)]
    pub required_fields: Vec<String>,
    /// Fields whose presence signals an error.
    #[serde(default = "default_error_fields")]
    pub error_fields: Vec<String>,
    /// Strings shorter than this (after trimming) count as empty.
    #[serde(default = "default_min_length")]
    pub min_length: usize,
    /// Fail when the body or any top-level value is an empty collection.
    #[serde(default)]
    pub reject_empty_collections: bool,
    /// Optional structural schema checked separately.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<ResponseSchema>,
}

impl Default for ExpectedResponse {
    fn default() -> Self {
        Self {
            required_fields: Vec::new(),
            error_fields: default_error_fields(),
            min_length: default_min_length(),
            reject_empty_collections: false,
            schema: None,
        }
    }
}

impl ExpectedResponse {
    /// Builds the validator configuration for this expectation.
    #[must_use]
    pub fn validation_config(&self) -> ValidationConfig {
        ValidationConfig {
            check_status: true,
            check_empty: true,
            min_length: self.min_length,
            error_fields: self.error_fields.clone(),
            required_fields: self.required_fields.clone(),
            reject_empty_collections: self.reject_empty_collections,
            custom: None,
        }
    }
}

/// Per-endpoint override of the global refund settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointRefundConfig {
    /// URL or path pattern, `*` matching any run of characters.
    pub pattern: String,
    /// Overrides global enablement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// Overrides the global per-request maximum.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_refund_usd: Option<Decimal>,
    /// Overrides the global triggers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub triggers: Option<RefundTriggers>,
    /// Overrides the global response expectation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_response: Option<ExpectedResponse>,
}

/// Global refund settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundConfig {
    /// Whether refunds are enabled unless an endpoint says otherwise.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Largest single refund, in USD.
    #[serde(default = "default_max_refund_usd")]
    pub max_refund_usd: Decimal,
    /// Local daily refund budget, in USD.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_cap_usd: Option<Decimal>,
    /// Local monthly refund budget, in USD.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_cap_usd: Option<Decimal>,
    /// Default triggers.
    #[serde(default)]
    pub triggers: RefundTriggers,
    /// Default response expectation.
    #[serde(default)]
    pub expected_response: ExpectedResponse,
    /// Endpoint overrides in declaration order.
    #[serde(default)]
    pub endpoints: Vec<EndpointRefundConfig>,
}

impl Default for RefundConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_refund_usd: default_max_refund_usd(),
            daily_cap_usd: None,
            monthly_cap_usd: None,
            triggers: RefundTriggers::default(),
            expected_response: ExpectedResponse::default(),
            endpoints: Vec::new(),
        }
    }
}

/// The settings in force for one request, global values overlaid by the matching endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectivePolicy {
    /// Pattern of the endpoint override that applied, if any.
    pub pattern: Option<String>,
    /// Whether refunds are enabled.
    pub enabled: bool,
    /// Per-request maximum in cents.
    pub max_refund_cents: u64,
    /// Daily cap in cents.
    pub daily_cap_cents: Option<u64>,
    /// Monthly cap in cents.
    pub monthly_cap_cents: Option<u64>,
    /// Triggers in force.
    pub triggers: RefundTriggers,
    /// Response expectation in force.
    pub expected_response: ExpectedResponse,
}

impl RefundConfig {
    /// Overlays an endpoint override (if any) on the global settings.
    #[must_use]
    pub fn effective(&self, endpoint: Option<&EndpointRefundConfig>) -> EffectivePolicy {
        EffectivePolicy {
            pattern: endpoint.map(|e| e.pattern.clone()),
            enabled: endpoint.and_then(|e| e.enabled).unwrap_or(self.enabled),
            max_refund_cents: money::usd_to_cents(
                endpoint
                    .and_then(|e| e.max_refund_usd)
                    .unwrap_or(self.max_refund_usd),
            ),
            daily_cap_cents: self.daily_cap_usd.map(money::usd_to_cents),
            monthly_cap_cents: self.monthly_cap_usd.map(money::usd_to_cents),
            triggers: endpoint
                .and_then(|e| e.triggers.clone())
                .unwrap_or_else(|| self.triggers.clone()),
            expected_response: endpoint
                .and_then(|e| e.expected_response.clone())
                .unwrap_or_else(|| self.expected_response.clone()),
        }
    }

    /// Checks thresholds and compiles the endpoint patterns.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Threshold`] for a `minMeaningfulness` outside
    /// `[0, 1]` and [`ConfigError::Pattern`] if a pattern cannot be compiled.
    pub fn matcher(&self) -> Result<EndpointMatcher, ConfigError> {
        let thresholds = std::iter::once(&self.triggers)
            .chain(self.endpoints.iter().filter_map(|e| e.triggers.as_ref()))
            .filter_map(|t| t.min_meaningfulness);
        for threshold in thresholds {
            if !(0.0..=1.0).contains(&threshold) {
                return Err(ConfigError::Threshold(threshold));
            }
        }
        EndpointMatcher::new(&self.endpoints)
    }
}

/// Converts a `*`-wildcard pattern into an anchored regular expression.
fn wildcard_regex(pattern: &str) -> Result<Regex, ConfigError> {
    let body = pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    Regex::new(&format!("^{body}$")).map_err(|source| ConfigError::Pattern {
        pattern: pattern.to_owned(),
        source,
    })
}

/// Extracts the path (without query or fragment) from an absolute URL, or
/// returns the input unchanged if it does not parse as one.
fn request_path(url: &str) -> Cow<'_, str> {
    Url::parse(url).map_or(Cow::Borrowed(url), |parsed| {
        Cow::Owned(parsed.path().to_owned())
    })
}

/// Compiled endpoint overrides, matched in declaration order.
#[derive(Debug, Clone)]
pub struct EndpointMatcher {
    entries: Vec<(Regex, EndpointRefundConfig)>,
}

impl EndpointMatcher {
    /// Compiles the given endpoint overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Pattern`] if a pattern cannot be compiled.
    pub fn new(endpoints: &[EndpointRefundConfig]) -> Result<Self, ConfigError> {
        let entries = endpoints
            .iter()
            .map(|e| Ok((wildcard_regex(&e.pattern)?, e.clone())))
            .collect::<Result<Vec<_>, ConfigError>>()?;
        Ok(Self { entries })
    }

    /// Returns the first override whose pattern matches the full URL or its path.
    #[must_use]
    pub fn find(&self, url: &str) -> Option<&EndpointRefundConfig> {
        let path = request_path(url);
        self.entries
            .iter()
            .find(|(re, _)| re.is_match(url) || re.is_match(&path))
            .map(|(_, endpoint)| endpoint)
    }

    /// Number of compiled patterns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no patterns are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(pattern: &str, max: Option<&str>) -> EndpointRefundConfig {
        EndpointRefundConfig {
            pattern: pattern.to_owned(),
            enabled: None,
            max_refund_usd: max.map(|m| m.parse().unwrap()),
            triggers: None,
            expected_response: None,
        }
    }

    #[test]
    fn test_first_declared_match_wins() {
        let matcher = EndpointMatcher::new(&[
            endpoint("/api/*", Some("0.50")),
            endpoint("/api/weather", Some("2.00")),
        ])
        .unwrap();
        let hit = matcher.find("https://example.com/api/weather?q=1").unwrap();
        assert_eq!(hit.pattern, "/api/*");
    }

    #[test]
    fn test_pattern_matches_full_url_or_path() {
        let matcher = EndpointMatcher::new(&[
            endpoint("https://*.example.com/paid/*", None),
            endpoint("/free", None),
        ])
        .unwrap();
        assert_eq!(
            matcher.find("https://api.example.com/paid/x").unwrap().pattern,
            "https://*.example.com/paid/*"
        );
        assert_eq!(matcher.find("http://host:8080/free").unwrap().pattern, "/free");
        assert!(matcher.find("http://host/free/more").is_none());
    }

    #[test]
    fn test_slash_in_query_is_not_the_path() {
        let matcher = EndpointMatcher::new(&[endpoint("/admin/*", None)]).unwrap();
        assert!(matcher.find("https://api.example.com?next=/admin/x").is_none());
        assert!(matcher.find("https://api.example.com/#/admin/x").is_none());
        assert_eq!(
            matcher.find("https://api.example.com/admin/x?next=/").unwrap().pattern,
            "/admin/*"
        );
    }

    #[test]
    fn test_regex_metacharacters_are_literal() {
        let matcher = EndpointMatcher::new(&[endpoint("/v1.0/items?id=*", None)]).unwrap();
        assert!(matcher.find("/v1.0/items?id=7").is_some());
        assert!(matcher.find("/v1x0/items?id=7").is_none());
        assert!(matcher.find("/v1.0/item?id=7").is_none());
    }

    #[test]
    fn test_effective_policy_overlays_endpoint() {
        let mut config = RefundConfig {
            daily_cap_usd: Some("50".parse().unwrap()),
            ..RefundConfig::default()
        };
        let mut over = endpoint("/x", Some("0.25"));
        over.enabled = Some(false);
        config.endpoints.push(over.clone());

        let global = config.effective(None);
        assert!(global.enabled);
        assert_eq!(global.max_refund_cents, 100);
        assert_eq!(global.daily_cap_cents, Some(5000));

        let scoped = config.effective(Some(&over));
        assert!(!scoped.enabled);
        assert_eq!(scoped.max_refund_cents, 25);
        assert_eq!(scoped.pattern.as_deref(), Some("/x"));
    }

    #[test]
    fn test_endpoint_enabled_overrides_disabled_global() {
        let config = RefundConfig {
            enabled: false,
            ..RefundConfig::default()
        };
        let mut over = endpoint("/x", None);
        over.enabled = Some(true);
        assert!(config.effective(Some(&over)).enabled);
        assert!(!config.effective(None).enabled);
    }

    #[test]
    fn test_out_of_range_threshold_is_rejected() {
        let mut config = RefundConfig::default();
        config.endpoints.push(EndpointRefundConfig {
            triggers: Some(RefundTriggers {
                min_meaningfulness: Some(1.5),
                ..RefundTriggers::default()
            }),
            ..endpoint("/x", None)
        });
        assert!(matches!(config.matcher(), Err(ConfigError::Threshold(_))));
    }

    #[test]
    fn test_defaults_from_empty_json() {
        let config: RefundConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, RefundConfig::default());
        assert_eq!(config.expected_response.error_fields, ["error", "errors"]);
        assert_eq!(config.expected_response.min_length, 2);
        assert!(config.triggers.server_error);
        assert!(!config.triggers.schema_validation);
    }

    #[test]
    fn test_camel_case_fields() {
        let config: RefundConfig = serde_json::from_str(
            r#"{"maxRefundUsd": 2.5, "monthlyCapUsd": "100",
                "endpoints": [{"pattern": "/a", "expectedResponse": {"requiredFields": ["data"]}}]}"#,
        )
        .unwrap();
        assert_eq!(config.effective(None).max_refund_cents, 250);
        assert_eq!(config.effective(None).monthly_cap_cents, Some(10_000));
        let policy = config.effective(config.endpoints.first());
        assert_eq!(policy.expected_response.required_fields, ["data"]);
    }
}
