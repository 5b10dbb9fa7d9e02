//! Two-phase reconnect schedule.
//!
//! The fast phase backs off exponentially from [`ReconnectPolicy::base_delay`]
//! for [`ReconnectPolicy::fast_attempts`] attempts. After that the persistent
//! phase retries at a fixed [`ReconnectPolicy::persistent_interval`] forever.
//! With the defaults: 1s, 2s, 4s, 8s, 16s, then 60s.

use std::time::Duration;

/// Reconnect schedule parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// First fast-phase delay.
    pub base_delay: Duration,
    /// Number of fast-phase attempts.
    pub fast_attempts: u32,
    /// Delay between persistent-phase attempts.
    pub persistent_interval: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            fast_attempts: 5,
            persistent_interval: Duration::from_secs(60),
        }
    }
}

/// Which phase an attempt falls in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectPhase {
    /// Exponential backoff.
    Fast,
    /// Fixed interval.
    Persistent,
}

impl ReconnectPolicy {
    /// Phase of the zero-based `attempt`.
    #[must_use]
    pub const fn phase(&self, attempt: u32) -> ReconnectPhase {
        if attempt < self.fast_attempts {
            ReconnectPhase::Fast
        } else {
            ReconnectPhase::Persistent
        }
    }

    /// Delay before the zero-based `attempt`.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self.phase(attempt) {
            ReconnectPhase::Fast => self
                .base_delay
                .saturating_mul(2u32.saturating_pow(attempt)),
            ReconnectPhase::Persistent => self.persistent_interval,
        }
    }
}

/// Stateful attempt counter over a [`ReconnectPolicy`].
#[derive(Debug, Clone)]
pub struct Reconnector {
    policy: ReconnectPolicy,
    attempt: u32,
    phase: ReconnectPhase,
}

impl Reconnector {
    /// Starts a fresh schedule.
    #[must_use]
    pub const fn new(policy: ReconnectPolicy) -> Self {
        Self {
            policy,
            attempt: 0,
            phase: ReconnectPhase::Fast,
        }
    }

    /// Returns the delay for the next attempt and advances the counter.
    ///
    /// Entering the persistent phase is logged once; later attempts log at debug.
    pub fn next_delay(&mut self) -> Duration {
        let attempt = self.attempt;
        let delay = self.policy.delay_for(attempt);
        let phase = self.policy.phase(attempt);
        if phase == ReconnectPhase::Persistent && self.phase == ReconnectPhase::Fast {
            tracing::info!(
                attempts = attempt,
                interval_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "Refund channel still unreachable, retrying at a fixed interval"
            );
        } else {
            tracing::debug!(
                attempt,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "Scheduling refund channel reconnect"
            );
        }
        self.phase = phase;
        self.attempt = self.attempt.saturating_add(1);
        delay
    }

    /// Resets the counter after a successful connection.
    pub const fn reset(&mut self) {
        self.attempt = 0;
        self.phase = ReconnectPhase::Fast;
    }

    /// Number of attempts scheduled since the last reset.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempt
    }

    /// Phase of the most recently scheduled attempt.
    #[must_use]
    pub const fn phase(&self) -> ReconnectPhase {
        self.phase
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schedule() {
        let policy = ReconnectPolicy::default();
        let delays: Vec<u128> = (0..8).map(|a| policy.delay_for(a).as_millis()).collect();
        assert_eq!(
            delays,
            [1000, 2000, 4000, 8000, 16000, 60000, 60000, 60000]
        );
        assert_eq!(policy.delay_for(10_000).as_millis(), 60000);
    }

    #[test]
    fn test_reconnector_resets() {
        let mut reconnector = Reconnector::new(ReconnectPolicy::default());
        for _ in 0..6 {
            reconnector.next_delay();
        }
        assert_eq!(reconnector.attempts(), 6);
        reconnector.reset();
        assert_eq!(reconnector.next_delay(), Duration::from_secs(1));
    }

    #[test]
    fn test_phase_boundary() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.phase(4), ReconnectPhase::Fast);
        assert_eq!(policy.phase(5), ReconnectPhase::Persistent);
    }

    #[test]
    fn test_persistent_phase_entered_once() {
        let mut reconnector = Reconnector::new(ReconnectPolicy::default());
        let mut phases = Vec::new();
        for _ in 0..7 {
            reconnector.next_delay();
            phases.push(reconnector.phase());
        }
        let entered = phases
            .windows(2)
            .filter(|w| w[0] == ReconnectPhase::Fast && w[1] == ReconnectPhase::Persistent)
            .count();
        assert_eq!(entered, 1);
        assert_eq!(phases[4], ReconnectPhase::Fast);
        assert_eq!(phases[5..], [ReconnectPhase::Persistent; 2]);

        reconnector.reset();
        assert_eq!(reconnector.phase(), ReconnectPhase::Fast);
    }
}
