//! Response meaningfulness scoring.
//!
//! [`validate_response`] runs a fixed sequence of checks against a captured
//! response and folds them into a [`ValidationResult`]: a pass/fail verdict, the
//! individual checks in evaluation order and a meaningfulness score in `[0, 1]`.
//!
//! Check order and penalties:
//!
//! | Check                   | Penalty |
//! |-------------------------|---------|
//! | `status_code`           | 0.3     |
//! | `not_empty`             | 0.4     |
//! | `no_error_indicators`   | 0.3     |
//! | `required_fields`       | 0.2     |
//! | `non_empty_collections` | 0.1     |
//! | `custom_validator`      | 0.3     |
//!
//! A response is valid only if its score is at least 0.5 *and* its status is
//! 2xx *and* its body is not empty. The last two are hard floors independent
//! of the score.
//!
//! [`validate_schema`] is a separate, simpler check of the top-level JSON type
//! and required property names.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Score penalties in hundredths, so thresholds compare exactly.
const STATUS_PENALTY: u32 = 30;
const EMPTY_PENALTY: u32 = 40;
const ERROR_INDICATOR_PENALTY: u32 = 30;
const REQUIRED_FIELDS_PENALTY: u32 = 20;
const EMPTY_COLLECTIONS_PENALTY: u32 = 10;
const CUSTOM_PENALTY: u32 = 30;
const FULL_SCORE: u32 = 100;
const VALID_THRESHOLD: u32 = 50;
const SCHEMA_MISSING_SCORE: f64 = 0.3;

/// Outcome of a single named check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationCheck {
    /// Check identifier, e.g. `"status_code"`.
    pub name: String,
    /// Whether the check passed.
    pub passed: bool,
    /// Human-readable detail.
    pub message: String,
}

impl ValidationCheck {
    /// Creates a check outcome.
    pub fn new(name: impl Into<String>, passed: bool, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed,
            message: message.into(),
        }
    }
}

/// Scored outcome of validating one response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    /// Overall verdict.
    pub valid: bool,
    /// Checks in evaluation order.
    pub checks: Vec<ValidationCheck>,
    /// Confidence that the response is meaningful, in `[0, 1]`.
    pub meaningfulness_score: f64,
    /// Failed check messages joined with `"; "`, present when invalid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

fn failure_reason(checks: &[ValidationCheck]) -> Option<String> {
    let failed: Vec<&str> = checks
        .iter()
        .filter(|c| !c.passed)
        .map(|c| c.message.as_str())
        .collect();
    (!failed.is_empty()).then(|| failed.join("; "))
}

impl ValidationResult {
    /// Returns the check with the given name, if it ran.
    #[must_use]
    pub fn check(&self, name: &str) -> Option<&ValidationCheck> {
        self.checks.iter().find(|c| c.name == name)
    }

    /// Returns `true` if a check with this name ran and failed.
    #[must_use]
    pub fn failed(&self, name: &str) -> bool {
        self.checks.iter().any(|c| c.name == name && !c.passed)
    }

    /// Combines this result with another (typically a schema result) into a new one.
    ///
    /// Checks are concatenated, the score is the minimum and the result is valid
    /// only if both are.
    #[must_use]
    pub fn merge(&self, other: &Self) -> Self {
        let checks: Vec<ValidationCheck> =
            self.checks.iter().chain(&other.checks).cloned().collect();
        let valid = self.valid && other.valid;
        Self {
            valid,
            reason: if valid { None } else { failure_reason(&checks) },
            meaningfulness_score: self.meaningfulness_score.min(other.meaningfulness_score),
            checks,
        }
    }
}

/// Verdict returned by a [`CustomValidator`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CustomVerdict {
    /// Whether the custom logic accepts the response.
    pub valid: bool,
    /// Message for the `custom_validator` check.
    pub message: Option<String>,
    /// Additional named checks, appended after `custom_validator`.
    pub checks: Vec<ValidationCheck>,
}

/// Caller-supplied validation logic.
///
/// An `Err` is recorded as a failed `custom_validator` check carrying the error text.
pub trait CustomValidator: Send + Sync {
    /// Judges a response body and status.
    ///
    /// # Errors
    ///
    /// Any error is captured into the result, never propagated.
    fn validate(&self, body: &Value, status: u16) -> Result<CustomVerdict, String>;
}

impl<F> CustomValidator for F
where
    F: Fn(&Value, u16) -> Result<CustomVerdict, String> + Send + Sync,
{
    fn validate(&self, body: &Value, status: u16) -> Result<CustomVerdict, String> {
        self(body, status)
    }
}

/// Which checks to run and with what parameters.
#[derive(Clone)]
pub struct ValidationConfig {
    /// Check for a 2xx status.
    pub check_status: bool,
    /// Check that the body is not empty.
    pub check_empty: bool,
    /// Minimum trimmed string length for a non-empty string body.
    pub min_length: usize,
    /// Fields whose presence signals an error.
    pub error_fields: Vec<String>,
    /// Top-level fields that must be present and non-null.
    pub required_fields: Vec<String>,
    /// Fail on empty collections at the top level.
    pub reject_empty_collections: bool,
    /// Optional caller-supplied check.
    pub custom: Option<Arc<dyn CustomValidator>>,
}

impl fmt::Debug for ValidationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationConfig")
            .field("check_status", &self.check_status)
            .field("check_empty", &self.check_empty)
            .field("min_length", &self.min_length)
            .field("error_fields", &self.error_fields)
            .field("required_fields", &self.required_fields)
            .field("reject_empty_collections", &self.reject_empty_collections)
            .field("custom", &self.custom.as_ref().map(|_| "<custom>"))
            .finish()
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        crate::config::ExpectedResponse::default().validation_config()
    }
}

impl ValidationConfig {
    /// Attaches a custom validator.
    #[must_use]
    pub fn with_custom(mut self, validator: impl CustomValidator + 'static) -> Self {
        self.custom = Some(Arc::new(validator));
        self
    }
}

/// A captured response body as JSON.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseBody(Value);

impl ResponseBody {
    /// Interprets raw bytes: JSON when parseable, otherwise a (lossy UTF-8) string.
    /// Empty input becomes `null`.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        if bytes.is_empty() {
            return Self(Value::Null);
        }
        serde_json::from_slice(bytes).map_or_else(
            |_| Self(Value::String(String::from_utf8_lossy(bytes).into_owned())),
            Self,
        )
    }

    /// The body as a JSON value.
    #[must_use]
    pub const fn as_value(&self) -> &Value {
        &self.0
    }

    /// Unwraps the JSON value.
    #[must_use]
    pub fn into_value(self) -> Value {
        self.0
    }
}

impl From<Value> for ResponseBody {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// Returns `true` if a body carries no content.
///
/// `null`, strings shorter than `min_length` after trimming, empty arrays and
/// empty objects are empty.
#[must_use]
pub fn is_empty_response(body: &Value, min_length: usize) -> bool {
    match body {
        Value::Null => true,
        Value::String(s) => s.trim().chars().count() < min_length,
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

fn is_error_indicator(value: &Value) -> bool {
    match value {
        Value::String(s) => !s.is_empty(),
        Value::Object(map) => !map.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Bool(b) => *b,
        Value::Null | Value::Number(_) => false,
    }
}

fn error_indicators(map: &Map<String, Value>, fields: &[String]) -> Vec<String> {
    let mut found: Vec<String> = fields
        .iter()
        .filter(|f| map.get(f.as_str()).is_some_and(is_error_indicator))
        .cloned()
        .collect();
    for flag in ["ok", "success"] {
        if map.get(flag) == Some(&Value::Bool(false)) {
            found.push(format!("{flag}=false"));
        }
    }
    found
}

fn is_empty_collection(value: &Value) -> bool {
    match value {
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

fn empty_collections(body: &Value) -> Option<String> {
    if is_empty_collection(body) {
        return Some("response body is an empty collection".to_owned());
    }
    let empty: Vec<String> = match body {
        Value::Object(map) => map
            .iter()
            .filter(|(_, v)| is_empty_collection(v))
            .map(|(k, _)| k.clone())
            .collect(),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .filter(|(_, v)| is_empty_collection(v))
            .map(|(i, _)| format!("[{i}]"))
            .collect(),
        _ => Vec::new(),
    };
    (!empty.is_empty()).then(|| format!("empty collections: {}", empty.join(", ")))
}

/// Scores a response against a validation configuration.
#[must_use]
pub fn validate_response(body: &Value, status: u16, config: &ValidationConfig) -> ValidationResult {
    let mut checks = Vec::new();
    let mut penalty = 0u32;
    let mut record = |check: ValidationCheck, cost: u32| {
        if !check.passed {
            penalty += cost;
        }
        checks.push(check);
    };

    let success_status = (200..300).contains(&status);
    if config.check_status {
        let message = if success_status {
            format!("status code {status}")
        } else {
            format!("status code {status} is not 2xx")
        };
        record(
            ValidationCheck::new("status_code", success_status, message),
            STATUS_PENALTY,
        );
    }

    let empty = is_empty_response(body, config.min_length);
    if config.check_empty {
        let message = if empty {
            "response body is empty"
        } else {
            "response body has content"
        };
        record(ValidationCheck::new("not_empty", !empty, message), EMPTY_PENALTY);
    }

    let indicators = body
        .as_object()
        .map(|map| error_indicators(map, &config.error_fields))
        .unwrap_or_default();
    let message = if indicators.is_empty() {
        "no error indicators".to_owned()
    } else {
        format!("error indicators present: {}", indicators.join(", "))
    };
    record(
        ValidationCheck::new("no_error_indicators", indicators.is_empty(), message),
        ERROR_INDICATOR_PENALTY,
    );

    if !config.required_fields.is_empty() {
        let missing: Vec<&str> = config
            .required_fields
            .iter()
            .filter(|field| {
                body.as_object()
                    .and_then(|map| map.get(field.as_str()))
                    .is_none_or(Value::is_null)
            })
            .map(String::as_str)
            .collect();
        let message = if missing.is_empty() {
            "all required fields present".to_owned()
        } else {
            format!("missing required fields: {}", missing.join(", "))
        };
        record(
            ValidationCheck::new("required_fields", missing.is_empty(), message),
            REQUIRED_FIELDS_PENALTY,
        );
    }

    if config.reject_empty_collections {
        let found = empty_collections(body);
        let passed = found.is_none();
        record(
            ValidationCheck::new(
                "non_empty_collections",
                passed,
                found.unwrap_or_else(|| "no empty collections".to_owned()),
            ),
            EMPTY_COLLECTIONS_PENALTY,
        );
    }

    if let Some(custom) = &config.custom {
        match custom.validate(body, status) {
            Ok(verdict) => {
                let message = verdict.message.unwrap_or_else(|| {
                    if verdict.valid {
                        "custom validation passed".to_owned()
                    } else {
                        "custom validation failed".to_owned()
                    }
                });
                record(
                    ValidationCheck::new("custom_validator", verdict.valid, message),
                    CUSTOM_PENALTY,
                );
                for check in verdict.checks {
                    record(check, 0);
                }
            }
            Err(error) => record(
                ValidationCheck::new(
                    "custom_validator",
                    false,
                    format!("custom validator error: {error}"),
                ),
                CUSTOM_PENALTY,
            ),
        }
    }

    let points = FULL_SCORE.saturating_sub(penalty);
    let valid = points >= VALID_THRESHOLD && success_status && !empty;
    ValidationResult {
        valid,
        reason: if valid { None } else { failure_reason(&checks) },
        meaningfulness_score: f64::from(points) / f64::from(FULL_SCORE),
        checks,
    }
}

/// Top-level JSON type a schema may require.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    /// A JSON object.
    Object,
    /// A JSON array.
    Array,
    /// A JSON string.
    String,
    /// Any JSON number.
    Number,
    /// A number without a fractional part.
    Integer,
    /// `true` or `false`.
    Boolean,
}

impl SchemaType {
    fn matches(self, value: &Value) -> bool {
        match self {
            Self::Object => value.is_object(),
            Self::Array => value.is_array(),
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Integer => {
                value.is_i64() || value.is_u64() || value.as_f64().is_some_and(|f| f.fract() == 0.0)
            }
            Self::Boolean => value.is_boolean(),
        }
    }
}

impl fmt::Display for SchemaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Object => "object",
            Self::Array => "array",
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
        })
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Minimal structural schema for a response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseSchema {
    /// Required top-level type.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<SchemaType>,
    /// Property names that must be present.
    #[serde(default)]
    pub required: Vec<String>,
}

/// Checks a body against a [`ResponseSchema`].
///
/// Scores 0 on a type mismatch, 0.3 when required properties are missing and 1 otherwise.
#[must_use]
pub fn validate_schema(body: &Value, schema: &ResponseSchema) -> ValidationResult {
    let mut checks = Vec::new();

    if let Some(kind) = schema.kind {
        if !kind.matches(body) {
            checks.push(ValidationCheck::new(
                "schema_type",
                false,
                format!("expected {kind}, got {}", type_name(body)),
            ));
            return ValidationResult {
                valid: false,
                reason: failure_reason(&checks),
                meaningfulness_score: 0.0,
                checks,
            };
        }
        checks.push(ValidationCheck::new("schema_type", true, format!("body is {kind}")));
    }

    if !schema.required.is_empty() {
        let missing: Vec<&str> = schema
            .required
            .iter()
            .filter(|name| !body.as_object().is_some_and(|m| m.contains_key(name.as_str())))
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            checks.push(ValidationCheck::new(
                "schema_required",
                false,
                format!("missing properties: {}", missing.join(", ")),
            ));
            return ValidationResult {
                valid: false,
                reason: failure_reason(&checks),
                meaningfulness_score: SCHEMA_MISSING_SCORE,
                checks,
            };
        }
        checks.push(ValidationCheck::new(
            "schema_required",
            true,
            "all required properties present",
        ));
    }

    ValidationResult {
        valid: true,
        checks,
        meaningfulness_score: 1.0,
        reason: None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn config() -> ValidationConfig {
        ValidationConfig::default()
    }

    #[test]
    fn test_empty_response_rules() {
        assert!(is_empty_response(&json!(""), 2));
        assert!(is_empty_response(&json!("  a "), 2));
        assert!(!is_empty_response(&json!("ok"), 2));
        assert!(is_empty_response(&json!({}), 0));
        assert!(is_empty_response(&json!([]), 0));
        assert!(is_empty_response(&Value::Null, 0));
        assert!(!is_empty_response(&json!(0), 2));
        assert!(!is_empty_response(&json!(false), 2));
    }

    #[test]
    fn test_complete_response_scores_full() {
        let cfg = ValidationConfig {
            required_fields: vec!["temp".into(), "city".into()],
            reject_empty_collections: true,
            ..config()
        };
        let result = validate_response(&json!({"temp": 21, "city": "Oslo"}), 200, &cfg);
        assert!(result.valid);
        assert!((result.meaningfulness_score - 1.0).abs() < f64::EPSILON);
        assert!(result.reason.is_none());
        let names: Vec<&str> = result.checks.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            [
                "status_code",
                "not_empty",
                "no_error_indicators",
                "required_fields",
                "non_empty_collections"
            ]
        );
    }

    #[test]
    fn test_server_error_is_never_valid() {
        for body in [json!({"data": [1, 2, 3]}), json!("a long plain text answer")] {
            let result = validate_response(&body, 503, &config());
            assert!(!result.valid);
            assert!((result.meaningfulness_score - 0.7).abs() < 1e-9);
            assert!(result.failed("status_code"));
        }
    }

    #[test]
    fn test_client_error_fails_regardless_of_score() {
        let result = validate_response(&json!({"data": 1}), 404, &config());
        assert!(result.meaningfulness_score >= 0.5);
        assert!(!result.valid);
    }

    #[test]
    fn test_empty_body_is_a_hard_floor() {
        let cfg = ValidationConfig {
            check_empty: false,
            ..config()
        };
        let result = validate_response(&json!({}), 200, &cfg);
        assert!((result.meaningfulness_score - 1.0).abs() < f64::EPSILON);
        assert!(!result.valid);
    }

    #[test]
    fn test_error_indicators() {
        let cases = [
            (json!({"error": "boom"}), false),
            (json!({"error": ""}), true),
            (json!({"errors": {"code": 1}}), false),
            (json!({"errors": {}}), true),
            (json!({"error": true}), false),
            (json!({"error": false}), true),
            (json!({"ok": false, "data": 1}), false),
            (json!({"success": false, "data": 1}), false),
            (json!({"success": true, "data": 1}), true),
        ];
        for (body, clean) in cases {
            let result = validate_response(&body, 200, &config());
            assert_eq!(!result.failed("no_error_indicators"), clean, "{body}");
        }
    }

    #[test]
    fn test_penalties_sum_and_reason_joins_messages() {
        let cfg = ValidationConfig {
            required_fields: vec!["data".into()],
            ..config()
        };
        let result = validate_response(&json!({"error": "quota"}), 200, &cfg);
        assert!((result.meaningfulness_score - 0.5).abs() < 1e-9);
        assert!(result.valid);

        let result = validate_response(&json!({"error": "quota"}), 500, &cfg);
        assert!((result.meaningfulness_score - 0.2).abs() < 1e-9);
        assert_eq!(
            result.reason.as_deref(),
            Some(
                "status code 500 is not 2xx; error indicators present: error; \
                 missing required fields: data"
            )
        );
    }

    #[test]
    fn test_score_clamps_at_zero() {
        let cfg = ValidationConfig {
            required_fields: vec!["data".into()],
            reject_empty_collections: true,
            ..config()
        }
        .with_custom(|_: &Value, _: u16| -> Result<CustomVerdict, String> {
            Ok(CustomVerdict::default())
        });
        let result = validate_response(&Value::Null, 500, &cfg);
        assert!(result.meaningfulness_score.abs() < f64::EPSILON);
    }

    #[test]
    fn test_required_fields_on_non_object() {
        let cfg = ValidationConfig {
            required_fields: vec!["a".into(), "b".into()],
            ..config()
        };
        let result = validate_response(&json!([1]), 200, &cfg);
        assert_eq!(
            result.check("required_fields").unwrap().message,
            "missing required fields: a, b"
        );
        let result = validate_response(&json!({"a": null, "b": 0}), 200, &cfg);
        assert_eq!(
            result.check("required_fields").unwrap().message,
            "missing required fields: a"
        );
    }

    #[test]
    fn test_empty_collections_opt_in() {
        let cfg = ValidationConfig {
            reject_empty_collections: true,
            ..config()
        };
        let result = validate_response(&json!({"items": [], "meta": {"n": 0}}), 200, &cfg);
        assert!(result.failed("non_empty_collections"));
        assert!((result.meaningfulness_score - 0.9).abs() < 1e-9);
        assert!(validate_response(&json!({"items": []}), 200, &config())
            .check("non_empty_collections")
            .is_none());
    }

    #[test]
    fn test_custom_validator_checks_and_errors() {
        let cfg = config().with_custom(|body: &Value, _: u16| -> Result<CustomVerdict, String> {
            Ok(CustomVerdict {
                valid: body.get("price").is_some(),
                message: None,
                checks: vec![ValidationCheck::new("price_positive", false, "price <= 0")],
            })
        });
        let result = validate_response(&json!({"price": -1}), 200, &cfg);
        let names: Vec<&str> = result.checks.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(&names[3..], ["custom_validator", "price_positive"]);
        assert!((result.meaningfulness_score - 1.0).abs() < f64::EPSILON);

        let cfg = config().with_custom(|_: &Value, _: u16| -> Result<CustomVerdict, String> {
            Err("lookup failed".to_owned())
        });
        let result = validate_response(&json!({"price": 1}), 200, &cfg);
        let check = result.check("custom_validator").unwrap();
        assert!(!check.passed);
        assert_eq!(check.message, "custom validator error: lookup failed");
        assert!((result.meaningfulness_score - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_schema_scores() {
        let schema = ResponseSchema {
            kind: Some(SchemaType::Object),
            required: vec!["id".into()],
        };
        let ok = validate_schema(&json!({"id": 1}), &schema);
        assert!(ok.valid);
        assert!((ok.meaningfulness_score - 1.0).abs() < f64::EPSILON);

        let missing = validate_schema(&json!({"name": "x"}), &schema);
        assert!(!missing.valid);
        assert!((missing.meaningfulness_score - 0.3).abs() < 1e-9);
        assert!(missing.failed("schema_required"));

        let mismatch = validate_schema(&json!([1]), &schema);
        assert!(mismatch.meaningfulness_score.abs() < f64::EPSILON);
        assert_eq!(mismatch.reason.as_deref(), Some("expected object, got array"));
    }

    #[test]
    fn test_schema_integer_accepts_whole_floats() {
        let schema: ResponseSchema = serde_json::from_str(r#"{"type": "integer"}"#).unwrap();
        assert!(validate_schema(&json!(3), &schema).valid);
        assert!(validate_schema(&json!(3.0), &schema).valid);
        assert!(!validate_schema(&json!(3.5), &schema).valid);
    }

    #[test]
    fn test_merge_takes_minimum() {
        let response = validate_response(&json!({"id": 1}), 200, &config());
        let schema = validate_schema(
            &json!({"id": 1}),
            &ResponseSchema {
                kind: Some(SchemaType::Array),
                required: Vec::new(),
            },
        );
        let merged = response.merge(&schema);
        assert!(!merged.valid);
        assert_eq!(merged.checks.len(), response.checks.len() + 1);
        assert!(merged.meaningfulness_score.abs() < f64::EPSILON);
        assert_eq!(merged.reason.as_deref(), Some("expected array, got object"));
    }

    #[test]
    fn test_body_from_bytes() {
        assert_eq!(ResponseBody::from_bytes(b"").into_value(), Value::Null);
        assert_eq!(
            ResponseBody::from_bytes(br#"{"a":1}"#).into_value(),
            json!({"a": 1})
        );
        assert_eq!(
            ResponseBody::from_bytes(b"plain text").into_value(),
            json!("plain text")
        );
    }
}
