//! Executes refund instructions.
//!
//! [`RefundProcessor::process`] runs one [`PendingRefund`] through the local
//! checks and the chain executor:
//!
//! 1. idempotency (already executed, or executing right now)
//! 2. endpoint enablement and per-request maximum
//! 3. day/month rollover, then daily and monthly caps
//! 4. network dispatch to the executor for the network's family
//!
//! The outcome tells the channel what to answer. Hooks fire for every
//! executed, denied or failed refund.

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use rf402::config::{EndpointMatcher, RefundConfig};
use rf402::error::ConfigError;
use rf402::executor::{ExecutorSet, TransferFailure, TransferReceipt};
use rf402::networks::NetworkFamily;
use rf402::policy::{PolicyDenial, SpendCaps};
use rf402::refund::PendingRefund;

use crate::hooks::{NoHooks, RefundFailure, RefundHooks};
use crate::protocol::{ClientMessage, EXECUTION_FAILED};
use crate::session::{Admission, DEFAULT_PROCESSED_CAPACITY, SessionLedger};

/// Default limit on a single executor call.
pub const DEFAULT_EXECUTION_TIMEOUT: Duration = Duration::from_secs(120);

/// Source of the current calendar date for cap rollover.
pub trait Clock: Send + Sync {
    /// Today's date.
    fn today(&self) -> NaiveDate;
}

/// UTC wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}

impl<F> Clock for F
where
    F: Fn() -> NaiveDate + Send + Sync,
{
    fn today(&self) -> NaiveDate {
        self()
    }
}

/// What happened to a refund instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefundOutcome {
    /// The transfer executed now.
    Executed(TransferReceipt),
    /// The transfer had already executed; this is its receipt.
    AlreadyExecuted(TransferReceipt),
    /// The same refund is executing; nothing to do.
    InFlight,
    /// Local policy refused the refund.
    Denied {
        /// Typed reason.
        denial: PolicyDenial,
        /// Human-readable detail.
        note: String,
    },
    /// The executor failed.
    Failed(TransferFailure),
}

impl RefundOutcome {
    /// The message to send back, if any.
    ///
    /// Retryable failures and in-flight duplicates get no answer so the
    /// authority's own redelivery logic decides what happens next.
    #[must_use]
    pub fn reply(&self, refund_id: &str) -> Option<ClientMessage> {
        match self {
            Self::Executed(receipt) | Self::AlreadyExecuted(receipt) => {
                Some(ClientMessage::confirmed(refund_id, receipt))
            }
            Self::Denied { denial, note } => {
                Some(ClientMessage::rejected(refund_id, denial.as_str(), note.clone()))
            }
            Self::Failed(failure) if !failure.retryable => Some(ClientMessage::rejected(
                refund_id,
                EXECUTION_FAILED,
                failure.message.clone(),
            )),
            Self::Failed(_) | Self::InFlight => None,
        }
    }
}

/// Runs refund instructions against local policy and the chain executors.
pub struct RefundProcessor {
    config: RefundConfig,
    matcher: EndpointMatcher,
    executors: ExecutorSet,
    ledger: SessionLedger,
    hooks: Arc<dyn RefundHooks>,
    clock: Arc<dyn Clock>,
    execution_timeout: Duration,
}

impl std::fmt::Debug for RefundProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefundProcessor")
            .field("config", &self.config)
            .field("executors", &self.executors)
            .field("ledger", &self.ledger)
            .field("execution_timeout", &self.execution_timeout)
            .finish_non_exhaustive()
    }
}

impl RefundProcessor {
    /// Creates a processor with no hooks, the system clock and default limits.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the refund configuration is invalid.
    pub fn new(config: RefundConfig, executors: ExecutorSet) -> Result<Self, ConfigError> {
        let matcher = config.matcher()?;
        Ok(Self {
            config,
            matcher,
            executors,
            ledger: SessionLedger::new(DEFAULT_PROCESSED_CAPACITY, SystemClock.today()),
            hooks: Arc::new(NoHooks),
            clock: Arc::new(SystemClock),
            execution_timeout: DEFAULT_EXECUTION_TIMEOUT,
        })
    }

    /// Sets the outcome hooks.
    #[must_use]
    pub fn with_hooks(mut self, hooks: impl RefundHooks + 'static) -> Self {
        self.hooks = Arc::new(hooks);
        self
    }

    /// Sets the clock used for cap rollover.
    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Sets the executor call timeout.
    #[must_use]
    pub const fn with_execution_timeout(mut self, timeout: Duration) -> Self {
        self.execution_timeout = timeout;
        self
    }

    /// Replaces the ledger, e.g. to seed spend counters.
    #[must_use]
    pub fn with_ledger(mut self, ledger: SessionLedger) -> Self {
        self.ledger = ledger;
        self
    }

    /// The session ledger.
    #[must_use]
    pub const fn ledger(&self) -> &SessionLedger {
        &self.ledger
    }

    /// Current spend counters.
    #[must_use]
    pub fn caps(&self) -> SpendCaps {
        self.ledger.caps()
    }

    /// Processes one refund instruction.
    pub async fn process(&self, refund: &PendingRefund) -> RefundOutcome {
        let endpoint = self.matcher.find(&refund.url);
        let policy = self.config.effective(endpoint);

        match self
            .ledger
            .admit(&refund.id, refund.amount_cents, &policy, self.clock.today())
        {
            Admission::Admitted => {}
            Admission::AlreadyExecuted(receipt) => {
                tracing::info!(refund_id = %refund.id, tx_id = %receipt.tx_id, "Refund already executed, re-confirming");
                return RefundOutcome::AlreadyExecuted(receipt);
            }
            Admission::InFlight => {
                tracing::debug!(refund_id = %refund.id, "Refund already executing, ignoring duplicate");
                return RefundOutcome::InFlight;
            }
            Admission::Denied { denial, note } => {
                let outcome = RefundOutcome::Denied { denial, note };
                self.report_failure(refund, &outcome).await;
                return outcome;
            }
        }

        let outcome = self.dispatch(refund).await;
        match &outcome {
            RefundOutcome::Executed(receipt) => {
                self.ledger.complete(&refund.id, receipt.clone());
                tracing::info!(
                    refund_id = %refund.id,
                    network = %refund.network,
                    tx_id = %receipt.tx_id,
                    amount_cents = refund.amount_cents,
                    "Refund executed"
                );
                self.hooks.on_refund_executed(refund, receipt).await;
            }
            _ => {
                self.ledger.abort(&refund.id, refund.amount_cents);
                self.report_failure(refund, &outcome).await;
            }
        }
        outcome
    }

    async fn dispatch(&self, refund: &PendingRefund) -> RefundOutcome {
        let family = refund.network.family();
        if family == NetworkFamily::Unsupported {
            return RefundOutcome::Denied {
                denial: PolicyDenial::UnsupportedNetwork,
                note: format!("network {} is not supported", refund.network),
            };
        }
        let Some(executor) = self.executors.get(family) else {
            return RefundOutcome::Denied {
                denial: PolicyDenial::ExecutorNotConfigured,
                note: format!("no {family} executor configured"),
            };
        };

        let transfer = executor.transfer_token(
            &refund.network,
            &refund.recipient,
            refund.amount_base_units(),
        );
        match tokio::time::timeout(self.execution_timeout, transfer).await {
            Ok(Ok(receipt)) => RefundOutcome::Executed(receipt),
            Ok(Err(failure)) => RefundOutcome::Failed(failure),
            Err(_) => RefundOutcome::Failed(TransferFailure::retryable(format!(
                "transfer timed out after {}s",
                self.execution_timeout.as_secs()
            ))),
        }
    }

    async fn report_failure(&self, refund: &PendingRefund, outcome: &RefundOutcome) {
        let failure = match outcome {
            RefundOutcome::Denied { denial, note } => {
                tracing::warn!(refund_id = %refund.id, network = %refund.network, %denial, note, "Refund denied");
                RefundFailure {
                    message: note.clone(),
                    retryable: false,
                    denial: Some(*denial),
                }
            }
            RefundOutcome::Failed(failure) => {
                tracing::warn!(
                    refund_id = %refund.id,
                    network = %refund.network,
                    retryable = failure.retryable,
                    error = %failure.message,
                    "Refund transfer failed"
                );
                RefundFailure {
                    message: failure.message.clone(),
                    retryable: failure.retryable,
                    denial: None,
                }
            }
            _ => return,
        };
        self.hooks.on_refund_failed(refund, &failure).await;
    }
}
