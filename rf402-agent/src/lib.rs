//! Refund agent for x402 endpoint operators.
//!
//! Wires a TOML configuration into chain executors, a
//! [`RefundProcessor`](rf402_channel::RefundProcessor) and a
//! [`RefundChannel`](rf402_channel::RefundChannel), and forwards refund
//! outcomes to an event sink.
//!
//! # Modules
//!
//! - [`config`] - Agent configuration with environment variable expansion
//! - [`hooks`] - Refund hooks that forward outcomes to an event sink
//! - [`sig_down`] - SIGINT / SIGTERM handling
//! - [`sink`] - Logging and HTTP event sinks

pub mod config;
pub mod hooks;
pub mod sig_down;
pub mod sink;

pub use config::{AgentConfig, AgentConfigError};
pub use hooks::SinkHooks;
pub use sig_down::SigDown;
pub use sink::{HttpEventSink, LogEventSink};
