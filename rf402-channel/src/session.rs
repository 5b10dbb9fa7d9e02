//! Refund idempotency and spend accounting for one process.
//!
//! The [`SessionLedger`] keeps three things behind a single mutex so that
//! admission is one atomic read-check-increment:
//!
//! - a bounded LRU of executed refund ids with their receipts
//! - the set of refund ids currently executing
//! - the local [`SpendCaps`] counters
//!
//! Admission reserves the amount in the counters. Completion keeps the
//! reservation; abort releases it.
//!
//! The ledger lives as long as the process, across reconnects. It is not
//! persisted: the refund authority is the durable record.

use std::collections::HashSet;
use std::num::NonZeroUsize;

use chrono::NaiveDate;
use lru::LruCache;
use parking_lot::Mutex;
use rf402::config::EffectivePolicy;
use rf402::executor::TransferReceipt;
use rf402::policy::{CapDecision, PolicyDenial, SpendCaps};

/// Default number of executed refund ids remembered.
pub const DEFAULT_PROCESSED_CAPACITY: NonZeroUsize = match NonZeroUsize::new(10_000) {
    Some(n) => n,
    None => NonZeroUsize::MIN,
};

/// Result of asking the ledger to admit a refund.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// The refund may execute; its amount is reserved.
    Admitted,
    /// The refund already executed in this process.
    AlreadyExecuted(TransferReceipt),
    /// The refund is executing right now.
    InFlight,
    /// Local policy refuses the refund.
    Denied {
        /// Typed reason.
        denial: PolicyDenial,
        /// Human-readable detail.
        note: String,
    },
}

#[derive(Debug)]
struct LedgerState {
    processed: LruCache<String, TransferReceipt>,
    in_flight: HashSet<String>,
    caps: SpendCaps,
}

/// Process-scoped idempotency index and spend counters.
#[derive(Debug)]
pub struct SessionLedger {
    state: Mutex<LedgerState>,
}

impl SessionLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new(capacity: NonZeroUsize, today: NaiveDate) -> Self {
        Self::with_caps(capacity, SpendCaps::new(today))
    }

    /// Creates a ledger starting from existing counters.
    #[must_use]
    pub fn with_caps(capacity: NonZeroUsize, caps: SpendCaps) -> Self {
        Self {
            state: Mutex::new(LedgerState {
                processed: LruCache::new(capacity),
                in_flight: HashSet::new(),
                caps,
            }),
        }
    }

    /// Atomically checks idempotency and caps, then marks the refund in flight.
    pub fn admit(
        &self,
        refund_id: &str,
        amount_cents: u64,
        policy: &EffectivePolicy,
        today: NaiveDate,
    ) -> Admission {
        let mut state = self.state.lock();
        if let Some(receipt) = state.processed.get(refund_id) {
            return Admission::AlreadyExecuted(receipt.clone());
        }
        if state.in_flight.contains(refund_id) {
            return Admission::InFlight;
        }
        match state.caps.admit(amount_cents, policy, today) {
            CapDecision::Allow => {
                state.in_flight.insert(refund_id.to_owned());
                Admission::Admitted
            }
            CapDecision::Deny { denial, note } => Admission::Denied { denial, note },
        }
    }

    /// Records a successful execution, keeping the reserved amount.
    pub fn complete(&self, refund_id: &str, receipt: TransferReceipt) {
        let mut state = self.state.lock();
        state.in_flight.remove(refund_id);
        state.processed.put(refund_id.to_owned(), receipt);
    }

    /// Abandons an admitted refund, releasing its reserved amount.
    pub fn abort(&self, refund_id: &str, amount_cents: u64) {
        let mut state = self.state.lock();
        if state.in_flight.remove(refund_id) {
            state.caps.release(amount_cents);
        }
    }

    /// Returns `true` if the refund executed in this process.
    #[must_use]
    pub fn is_processed(&self, refund_id: &str) -> bool {
        self.state.lock().processed.contains(refund_id)
    }

    /// Returns a copy of the current counters.
    #[must_use]
    pub fn caps(&self) -> SpendCaps {
        self.state.lock().caps.clone()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rf402::config::RefundConfig;
    use rf402::executor::CostEstimate;

    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 10).unwrap()
    }

    fn policy(daily_usd: &str) -> EffectivePolicy {
        RefundConfig {
            max_refund_usd: "10".parse().unwrap(),
            daily_cap_usd: Some(daily_usd.parse().unwrap()),
            ..RefundConfig::default()
        }
        .effective(None)
    }

    fn receipt() -> TransferReceipt {
        TransferReceipt {
            tx_id: "0x1".into(),
            network: "base".into(),
            amount_raw: "10000".into(),
            token: "USDC".into(),
            cost_estimate: CostEstimate {
                native_amount: "1".into(),
                unit: "wei".into(),
            },
        }
    }

    #[test]
    fn test_duplicate_admission() {
        let ledger = SessionLedger::new(DEFAULT_PROCESSED_CAPACITY, today());
        let policy = policy("50");
        assert_eq!(ledger.admit("a", 1, &policy, today()), Admission::Admitted);
        assert_eq!(ledger.admit("a", 1, &policy, today()), Admission::InFlight);
        ledger.complete("a", receipt());
        assert_eq!(
            ledger.admit("a", 1, &policy, today()),
            Admission::AlreadyExecuted(receipt())
        );
        assert!(ledger.is_processed("a"));
        assert_eq!(ledger.caps().today_refunded_cents(), 1);
    }

    #[test]
    fn test_abort_releases_reservation() {
        let ledger = SessionLedger::new(DEFAULT_PROCESSED_CAPACITY, today());
        let policy = policy("50");
        assert_eq!(ledger.admit("a", 300, &policy, today()), Admission::Admitted);
        assert_eq!(ledger.caps().today_refunded_cents(), 300);
        ledger.abort("a", 300);
        assert_eq!(ledger.caps().today_refunded_cents(), 0);
        ledger.abort("a", 300);
        assert_eq!(ledger.caps().today_refunded_cents(), 0);
        assert_eq!(ledger.admit("a", 300, &policy, today()), Admission::Admitted);
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let ledger = SessionLedger::new(NonZeroUsize::new(2).unwrap(), today());
        let policy = policy("50");
        for id in ["a", "b", "c"] {
            assert_eq!(ledger.admit(id, 1, &policy, today()), Admission::Admitted);
            ledger.complete(id, receipt());
        }
        assert!(!ledger.is_processed("a"));
        assert!(ledger.is_processed("c"));
    }

    #[test]
    fn test_concurrent_admissions_respect_cap() {
        let ledger = Arc::new(SessionLedger::new(DEFAULT_PROCESSED_CAPACITY, today()));
        let policy = Arc::new(policy("1"));
        let handles: Vec<_> = (0..16)
            .map(|i| {
                let ledger = Arc::clone(&ledger);
                let policy = Arc::clone(&policy);
                std::thread::spawn(move || ledger.admit(&format!("r{i}"), 10, &policy, today()))
            })
            .collect();
        let admitted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|a| *a == Admission::Admitted)
            .count();
        assert_eq!(admitted, 10);
        assert_eq!(ledger.caps().today_refunded_cents(), 100);
    }
}
