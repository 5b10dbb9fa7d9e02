#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Core types for refund protection of x402 payment endpoints.
//!
//! An x402 endpoint is paid before it answers. When the answer turns out to be
//! useless (a server error, an empty body, a response missing what was
//! promised) the payer deserves their money back. This crate holds the
//! chain-agnostic pieces of that decision:
//!
//! - recover who paid, how much and on which network from the payment header
//! - score how meaningful a captured response is
//! - decide whether a refund is warranted and whether it fits local spend caps
//! - describe the chain execution and event sink capabilities that the
//!   channel, chain and agent crates plug in
//!
//! # Modules
//!
//! - [`assess`] - The request-capturing path tying decoding, validation and policy together
//! - [`base58`] - Base58 encoding for Solana public keys
//! - [`config`] - Refund configuration and endpoint pattern matching
//! - [`decode`] - Payment header decoding, including the Solana transaction walker
//! - [`encoding`] - Lenient base64 decoding
//! - [`event`] - Telemetry events and the [`EventSink`](event::EventSink) capability
//! - [`executor`] - The [`ChainExecutor`](executor::ChainExecutor) capability
//! - [`money`] - USD, cents and USDC base-unit conversions
//! - [`networks`] - Network family classification
//! - [`policy`] - Refund reasons, cap checks and spend counters
//! - [`refund`] - Refund instructions from the refund authority
//! - [`validate`] - Response meaningfulness and schema validation
//!
//! # Feature Flags
//!
//! - `telemetry` - Enables tracing instrumentation for debugging and monitoring

pub mod assess;
pub mod base58;
pub mod config;
pub mod decode;
pub mod encoding;
pub mod error;
pub mod event;
pub mod executor;
pub mod money;
pub mod networks;
pub mod policy;
pub mod refund;
pub mod validate;

pub use assess::{Assessor, CapturedRequest, RefundAssessment};
pub use config::{EffectivePolicy, EndpointMatcher, EndpointRefundConfig, RefundConfig};
pub use decode::{DecodedPayment, decode_payment_header};
pub use error::ConfigError;
pub use event::{Event, EventSink, EventSinkError, SubmitSummary};
pub use executor::{ChainExecutor, CostEstimate, ExecutorSet, TransferFailure, TransferReceipt};
pub use networks::{NetworkFamily, NetworkId};
pub use policy::{CapDecision, PolicyDenial, RefundReason, SpendCaps};
pub use refund::PendingRefund;
pub use validate::{ValidationCheck, ValidationResult};
