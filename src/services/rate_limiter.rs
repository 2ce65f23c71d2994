// src/services/rate_limiter.rs

//! Per-domain request throttling.
//!
//! [`RateLimiter`] enforces a fixed minimum interval per domain key.
//! [`AdaptiveRateLimiter`] additionally tunes that interval from the outcome
//! of the previous request: rate-limit statuses back off exponentially,
//! successes recover one step at a time, other failures back off softly.
//!
//! Neither limiter ever fails or caps retries; they only delay.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::models::RateLimitConfig;

/// Statuses treated as "slow down".
const RATE_LIMIT_STATUSES: [u16; 3] = [429, 502, 503];

/// Soft backoff multiplier for failures without a rate-limit status.
const SOFT_BACKOFF: f64 = 1.5;

/// Time source for the limiters.
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

/// Wall clock with a blocking sleep.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Result of the previous request to a domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub success: bool,
    pub status: Option<u16>,
}

impl Outcome {
    /// Outcome of a request that produced a response.
    pub fn from_status(status: u16) -> Self {
        Self {
            success: (200..300).contains(&status),
            status: Some(status),
        }
    }

    /// Outcome of a request that never got a response.
    pub fn transport_failure() -> Self {
        Self {
            success: false,
            status: None,
        }
    }

    fn is_rate_limited(&self) -> bool {
        self.status.is_some_and(|s| RATE_LIMIT_STATUSES.contains(&s))
    }

    fn is_normal_success(&self) -> bool {
        self.success && self.status.is_some_and(|s| (200..300).contains(&s))
    }
}

/// Fixed minimum-interval throttle.
pub struct RateLimiter {
    last_request: HashMap<String, Instant>,
    clock: Box<dyn Clock>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::with_clock(Box::new(SystemClock))
    }

    pub fn with_clock(clock: Box<dyn Clock>) -> Self {
        Self {
            last_request: HashMap::new(),
            clock,
        }
    }

    /// Delay still owed before the next request to `domain`.
    pub fn delay_for(&self, domain: &str, interval: Duration) -> Duration {
        self.last_request
            .get(domain)
            .map(|last| interval.saturating_sub(self.clock.now().duration_since(*last)))
            .unwrap_or(Duration::ZERO)
    }

    /// Block until `interval` has passed since the last request, then record
    /// this one. Returns the time slept.
    pub fn throttle(&mut self, domain: &str, interval: Duration) -> Duration {
        let wait = self.delay_for(domain, interval);
        if !wait.is_zero() {
            log::debug!("Rate limiting: waiting {:.2}s for {}", wait.as_secs_f64(), domain);
            self.clock.sleep(wait);
        }
        self.last_request.insert(domain.to_string(), self.clock.now());
        wait
    }
}

/// Per-domain adaptive state. Lives only as long as the limiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateState {
    pub last_request: Option<Instant>,
    pub interval: Duration,
    pub consecutive_errors: u32,
}

impl RateState {
    fn new(base: Duration) -> Self {
        Self {
            last_request: None,
            interval: base,
            consecutive_errors: 0,
        }
    }
}

/// Throttle with exponential backoff and stepwise recovery.
pub struct AdaptiveRateLimiter {
    policy: RateLimitConfig,
    states: HashMap<String, RateState>,
    clock: Box<dyn Clock>,
}

impl AdaptiveRateLimiter {
    pub fn new(policy: RateLimitConfig) -> Self {
        Self::with_clock(policy, Box::new(SystemClock))
    }

    pub fn with_clock(policy: RateLimitConfig, clock: Box<dyn Clock>) -> Self {
        Self {
            policy,
            states: HashMap::new(),
            clock,
        }
    }

    /// Retries allowed on primary fetches. Not enforced here.
    pub fn retry_count(&self) -> u32 {
        self.policy.retry_count
    }

    /// Fold the previous outcome into the domain's interval, block until the
    /// interval has elapsed since the last request, then record this one.
    ///
    /// Returns the time slept. A domain with no history never waits.
    pub fn throttle(&mut self, domain: &str, previous: Option<Outcome>) -> Duration {
        let base = self.policy.base_interval(domain);
        let max = self.policy.max_interval();
        let state = self
            .states
            .entry(domain.to_string())
            .or_insert_with(|| RateState::new(base));

        if let Some(outcome) = previous {
            adjust(state, outcome, base, max, domain);
        }

        let wait = state
            .last_request
            .map(|last| {
                state
                    .interval
                    .saturating_sub(self.clock.now().duration_since(last))
            })
            .unwrap_or(Duration::ZERO);

        if !wait.is_zero() {
            log::debug!(
                "Adaptive rate limiting: waiting {:.2}s for {}",
                wait.as_secs_f64(),
                domain
            );
            self.clock.sleep(wait);
        }
        state.last_request = Some(self.clock.now());
        wait
    }

    /// Forget everything about a domain.
    pub fn reset(&mut self, domain: &str) {
        if self.states.remove(domain).is_some() {
            log::info!("Reset rate limiting for domain: {}", domain);
        }
    }

    pub fn state(&self, domain: &str) -> Option<&RateState> {
        self.states.get(domain)
    }

    /// Current interval, the base interval for unseen domains.
    pub fn interval(&self, domain: &str) -> Duration {
        self.states
            .get(domain)
            .map(|s| s.interval)
            .unwrap_or_else(|| self.policy.base_interval(domain))
    }

    pub fn consecutive_errors(&self, domain: &str) -> u32 {
        self.states
            .get(domain)
            .map(|s| s.consecutive_errors)
            .unwrap_or(0)
    }
}

fn adjust(state: &mut RateState, outcome: Outcome, base: Duration, max: Duration, domain: &str) {
    if outcome.is_rate_limited() {
        state.consecutive_errors = state.consecutive_errors.saturating_add(1);
        state.interval = scaled(base, exp2(state.consecutive_errors), max);
        log::warn!(
            "Server returned {} for {}, backing off to {:.1}s",
            outcome.status.unwrap_or_default(),
            domain,
            state.interval.as_secs_f64()
        );
    } else if outcome.is_normal_success() {
        if state.consecutive_errors > 0 {
            state.consecutive_errors -= 1;
            state.interval = scaled(base, exp2(state.consecutive_errors), max);
        }
    } else if !outcome.success {
        state.consecutive_errors = state.consecutive_errors.saturating_add(1);
        state.interval = scaled(state.interval, SOFT_BACKOFF, max);
    }
}

fn exp2(n: u32) -> f64 {
    2f64.powi(n.min(i32::MAX as u32) as i32)
}

/// `d × factor`, never above `cap`.
fn scaled(d: Duration, factor: f64, cap: Duration) -> Duration {
    let secs = d.as_secs_f64() * factor;
    if !secs.is_finite() || secs >= cap.as_secs_f64() {
        cap
    } else {
        Duration::from_secs_f64(secs.max(0.0))
    }
}
