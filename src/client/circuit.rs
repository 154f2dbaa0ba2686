//! # Circuit Breaker
//! Per rate-limit-bucket resilience state machine. One breaker instance per
//! client; never shared across clients pointed at different credentials.
//!
//! All transitions take an explicit `now` (unix seconds) so behavior is
//! deterministic under test. State lives in process memory only: a restart
//! resets to `Closed`.

use std::sync::Mutex;

use crate::error::SourceError;

#[derive(Debug, Clone, Copy)]
pub struct CircuitConfig {
    /// Consecutive failures within the window that trip the breaker.
    pub failure_threshold: u32,
    /// Sliding window for the failure counter, in seconds.
    pub failure_window_secs: u64,
    /// Base for the exponential backoff hint (`base * 2^failures`).
    pub base_backoff_secs: u64,
    /// Cap for the backoff hint.
    pub max_backoff_secs: u64,
    /// Initial Open cooldown.
    pub cooldown_secs: u64,
    /// Cap for cooldown doubling after a failed probe.
    pub max_cooldown_secs: u64,
}

impl Default for CircuitConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            failure_window_secs: 60,
            base_backoff_secs: 2,
            max_backoff_secs: 120,
            cooldown_secs: 60,
            max_cooldown_secs: 600,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    failures: u32,
    window_started_at: u64,
    opened_at: u64,
    cooldown_secs: u64,
    probe_in_flight: bool,
}

#[derive(Debug)]
pub struct CircuitBreaker {
    cfg: CircuitConfig,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(cfg: CircuitConfig) -> Self {
        let cooldown = cfg.cooldown_secs;
        Self {
            cfg,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                failures: 0,
                window_started_at: 0,
                opened_at: 0,
                cooldown_secs: cooldown,
                probe_in_flight: false,
            }),
        }
    }

    /// Gate a request. While `Open` and cooling down, fails fast with a
    /// retry hint and no I/O. Once the cooldown elapses, admits exactly one
    /// probe (`HalfOpen`); concurrent callers keep failing fast until the
    /// probe resolves.
    pub fn check(&self, now: u64) -> Result<(), SourceError> {
        let mut g = self.inner.lock().expect("circuit mutex poisoned");
        match g.state {
            CircuitState::Closed => Ok(()),
            CircuitState::Open => {
                let elapsed = now.saturating_sub(g.opened_at);
                if elapsed >= g.cooldown_secs {
                    g.state = CircuitState::HalfOpen;
                    g.probe_in_flight = true;
                    Ok(())
                } else {
                    Err(SourceError::CircuitOpen {
                        retry_after_secs: g.cooldown_secs - elapsed,
                    })
                }
            }
            CircuitState::HalfOpen => {
                if g.probe_in_flight {
                    Err(SourceError::CircuitOpen { retry_after_secs: 1 })
                } else {
                    g.probe_in_flight = true;
                    Ok(())
                }
            }
        }
    }

    /// A successful call closes the breaker and resets the failure counter
    /// and the cooldown schedule.
    pub fn record_success(&self, _now: u64) {
        let mut g = self.inner.lock().expect("circuit mutex poisoned");
        g.state = CircuitState::Closed;
        g.failures = 0;
        g.probe_in_flight = false;
        g.cooldown_secs = self.cfg.cooldown_secs;
    }

    /// Count an observed upstream failure (429, connection failure, 5xx).
    /// Caller-initiated cancels must NOT be recorded here.
    pub fn record_failure(&self, now: u64) {
        let mut g = self.inner.lock().expect("circuit mutex poisoned");
        match g.state {
            CircuitState::HalfOpen => {
                // Failed probe: reopen with a doubled, capped cooldown.
                g.state = CircuitState::Open;
                g.opened_at = now;
                g.probe_in_flight = false;
                g.cooldown_secs = (g.cooldown_secs * 2).min(self.cfg.max_cooldown_secs);
            }
            CircuitState::Open => {}
            CircuitState::Closed => {
                if g.failures == 0
                    || now.saturating_sub(g.window_started_at) > self.cfg.failure_window_secs
                {
                    g.failures = 0;
                    g.window_started_at = now;
                }
                g.failures += 1;
                if g.failures >= self.cfg.failure_threshold {
                    g.state = CircuitState::Open;
                    g.opened_at = now;
                }
            }
        }
    }

    /// Resolve a probe that ended without an upstream health verdict
    /// (caller cancel, auth rejection). Returns to `Open` and restarts the
    /// current cooldown without doubling it, so a later probe still runs.
    /// No-op outside an in-flight probe.
    pub fn probe_aborted(&self, now: u64) {
        let mut g = self.inner.lock().expect("circuit mutex poisoned");
        if g.state == CircuitState::HalfOpen && g.probe_in_flight {
            g.state = CircuitState::Open;
            g.opened_at = now;
            g.probe_in_flight = false;
        }
    }

    /// Exponential backoff hint for the current failure streak,
    /// `base * 2^failures` capped at `max_backoff_secs`.
    pub fn backoff_secs(&self) -> u64 {
        let g = self.inner.lock().expect("circuit mutex poisoned");
        let exp = g.failures.min(16);
        self.cfg
            .base_backoff_secs
            .saturating_mul(1u64 << exp)
            .min(self.cfg.max_backoff_secs)
    }

    pub fn state(&self) -> CircuitState {
        self.inner.lock().expect("circuit mutex poisoned").state
    }
}
