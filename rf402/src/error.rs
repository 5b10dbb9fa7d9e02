//! Error types for the refund core.
//!
//! Most outcomes in this crate are values rather than errors: decode failures
//! degrade to "unknown", failed validation is a scored result and policy
//! denials are [`PolicyDenial`](crate::policy::PolicyDenial)s. Only invalid
//! configuration is an error.

/// Invalid refund configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An endpoint pattern could not be compiled.
    #[error("invalid endpoint pattern {pattern:?}: {source}")]
    Pattern {
        /// The offending pattern.
        pattern: String,
        /// The underlying regex error.
        #[source]
        source: regex::Error,
    },
    /// A threshold lies outside `[0, 1]`.
    #[error("minMeaningfulness must be within [0, 1], got {0}")]
    Threshold(f64),
}
