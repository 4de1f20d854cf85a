use std::{
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

use crate::clock::Clock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakerPhase {
    Closed,
    Open,
    HalfOpen,
}

/// Snapshot of a breaker. `healthy == false` implies `last_failure_at` is set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AvailabilityState {
    pub healthy: bool,
    pub phase: BreakerPhase,
    pub last_failure_at: Option<DateTime<Utc>>,
    pub cooldown_secs: u64,
}

#[derive(Debug)]
struct Inner {
    phase: BreakerPhase,
    last_failure_at: Option<DateTime<Utc>>,
    trial_started_at: Option<DateTime<Utc>>,
}

/// Circuit breaker guarding one upstream provider.
///
/// A single failure opens the breaker. After `cooldown` one trial call is let
/// through (half-open); its success closes the breaker, its failure reopens it
/// with a fresh timer. There is no backoff across repeated trips.
///
/// Shared by every request through an `Arc`; the state sits behind a mutex
/// that is never held across an await point.
pub struct ProviderAvailability {
    provider: &'static str,
    cooldown: Duration,
    clock: Arc<dyn Clock>,
    inner: Mutex<Inner>,
}

impl ProviderAvailability {
    pub fn new(provider: &'static str, cooldown: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            provider,
            cooldown,
            clock,
            inner: Mutex::new(Inner {
                phase: BreakerPhase::Closed,
                last_failure_at: None,
                trial_started_at: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn cooldown_delta(&self) -> TimeDelta {
        TimeDelta::from_std(self.cooldown).unwrap_or(TimeDelta::MAX)
    }

    /// Whether the caller may try the provider now.
    ///
    /// While open this turns true once more than `cooldown` has passed since the
    /// last failure; the caller that sees it becomes the half-open trial and
    /// every other caller keeps getting `false` until the trial reports. A trial
    /// that never reports is replaced after another cooldown.
    pub fn is_available(&self) -> bool {
        let now = self.clock.now();
        let cooldown = self.cooldown_delta();
        let mut inner = self.lock();

        match inner.phase {
            BreakerPhase::Closed => true,
            BreakerPhase::Open => {
                let elapsed = inner.last_failure_at.map(|at| now - at);
                if elapsed.is_none_or(|e| e > cooldown) {
                    inner.phase = BreakerPhase::HalfOpen;
                    inner.trial_started_at = Some(now);
                    tracing::info!(provider = self.provider, "breaker half-open, trying provider");
                    true
                } else {
                    false
                }
            }
            BreakerPhase::HalfOpen => {
                let stale = inner.trial_started_at.is_none_or(|at| now - at > cooldown);
                if stale {
                    inner.trial_started_at = Some(now);
                }
                stale
            }
        }
    }

    /// Opens the breaker and restarts the cooldown timer.
    pub fn record_failure(&self) {
        let now = self.clock.now();
        let mut inner = self.lock();
        if inner.phase != BreakerPhase::Open {
            tracing::warn!(provider = self.provider, "breaker opened");
        }
        inner.phase = BreakerPhase::Open;
        inner.last_failure_at = Some(now);
        inner.trial_started_at = None;
    }

    /// Closes the breaker after a successful half-open trial.
    ///
    /// A success reported while the breaker is open came from a call that
    /// started before the failure that opened it, so it leaves the breaker open.
    pub fn record_success(&self) {
        let mut inner = self.lock();
        if inner.phase == BreakerPhase::HalfOpen {
            tracing::info!(provider = self.provider, "breaker closed");
            inner.phase = BreakerPhase::Closed;
            inner.trial_started_at = None;
        }
    }

    pub fn state(&self) -> AvailabilityState {
        let inner = self.lock();
        AvailabilityState {
            healthy: inner.phase == BreakerPhase::Closed,
            phase: inner.phase,
            last_failure_at: inner.last_failure_at,
            cooldown_secs: self.cooldown.as_secs(),
        }
    }

    pub fn provider(&self) -> &'static str {
        self.provider
    }
}
