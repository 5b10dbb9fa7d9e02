#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Refund channel client for x402 endpoint operators.
//!
//! The refund authority decides which payments deserve a refund. This crate
//! keeps a long-lived duplex connection to it, receives refund instructions,
//! checks them against local policy, executes the token transfer through a
//! [`ChainExecutor`](rf402::ChainExecutor) and reports the outcome.
//!
//! ```text
//! authority                      RefundChannel                RefundProcessor
//!    | refund_required ------------> |                              |
//!    | <------------ refund_executing|                              |
//!    |                               | process(refund) -----------> | ledger.admit
//!    |                               |                              | executor.transfer_token
//!    |                               | <-------------------- outcome| hooks
//!    | <--- refund_confirmed/rejected|                              |
//! ```
//!
//! # Modules
//!
//! - [`backoff`] - Reconnect schedule
//! - [`channel`] - The connection state machine
//! - [`error`] - Transport and configuration errors
//! - [`hooks`] - Outcome callbacks
//! - [`processor`] - Local checks and executor dispatch
//! - [`protocol`] - Wire messages
//! - [`session`] - Idempotency index and spend counters
//! - [`transport`] - The duplex transport capability
//!
//! # Feature Flags
//!
//! - `websocket` (default) - [`WsTransport`] over tokio-tungstenite
//! - `telemetry` - Forwards to `rf402/telemetry`

pub mod backoff;
pub mod channel;
pub mod error;
pub mod hooks;
pub mod processor;
pub mod protocol;
pub mod session;
pub mod transport;

pub use backoff::{ReconnectPhase, ReconnectPolicy, Reconnector};
pub use channel::{ChannelConfig, ChannelState, RefundChannel};
pub use error::{ChannelError, TransportError};
pub use hooks::{NoHooks, RefundFailure, RefundHooks};
pub use processor::{Clock, RefundOutcome, RefundProcessor, SystemClock};
pub use protocol::{ClientMessage, ServerMessage};
pub use session::{Admission, SessionLedger};
pub use transport::{Connection, Frame, Transport};
#[cfg(feature = "websocket")]
pub use transport::WsTransport;
