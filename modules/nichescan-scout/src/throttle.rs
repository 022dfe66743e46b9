//! Process-wide request pacing.
//!
//! Every outbound catalog request passes through one [`RateGate`]. The gate
//! serializes callers on a single turn lock and performs the whole
//! read-elapsed / wait / stamp sequence while holding it, so the minimum gap
//! between requests holds across every task in the process, not per caller.

use std::sync::Mutex;
use std::time::Duration;

use nichescan_common::PacingSettings;
use rand::Rng;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::cancel::CancelToken;
use crate::error::{AcquireError, Result};

/// Pacing constants, resolved from `[pacing]` settings.
#[derive(Debug, Clone, PartialEq)]
pub struct PacingConfig {
    pub min_delay: Duration,
    pub jitter_max: Duration,
    pub human_pause: (Duration, Duration),
    pub reading_pause_probability: f64,
    pub reading_pause: (Duration, Duration),
    pub backoff_cap: Duration,
    pub session_cooldown: Duration,
    pub poll_interval: Duration,
}

impl PacingConfig {
    pub fn from_settings(s: &PacingSettings) -> Self {
        let probability = if s.reading_pause_probability.is_nan() {
            0.0
        } else {
            s.reading_pause_probability.clamp(0.0, 1.0)
        };

        Self {
            min_delay: secs(s.min_delay_secs),
            jitter_max: secs(s.jitter_max_secs),
            human_pause: (secs(s.human_pause_min_secs), secs(s.human_pause_max_secs)),
            reading_pause_probability: probability,
            reading_pause: (secs(s.reading_pause_min_secs), secs(s.reading_pause_max_secs)),
            backoff_cap: secs(s.backoff_cap_secs),
            session_cooldown: secs(s.session_cooldown_secs),
            poll_interval: Duration::from_millis(s.poll_interval_ms.max(1)),
        }
    }

    /// No waits at all apart from the minimum gap. Useful for tests.
    pub fn fixed_gap(min_delay: Duration) -> Self {
        Self {
            min_delay,
            jitter_max: Duration::ZERO,
            human_pause: (Duration::ZERO, Duration::ZERO),
            reading_pause_probability: 0.0,
            reading_pause: (Duration::ZERO, Duration::ZERO),
            backoff_cap: Duration::ZERO,
            session_cooldown: Duration::ZERO,
            poll_interval: Duration::from_millis(500),
        }
    }
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self::from_settings(&PacingSettings::default())
    }
}

fn secs(v: f64) -> Duration {
    Duration::try_from_secs_f64(v.max(0.0)).unwrap_or(Duration::ZERO)
}

fn random_between(lo: Duration, hi: Duration) -> Duration {
    if hi <= lo {
        return lo;
    }
    let picked = rand::rng().random_range(lo.as_secs_f64()..hi.as_secs_f64());
    Duration::from_secs_f64(picked)
}

/// `min(2^errors, cap)` seconds; zero when there are no recent errors.
pub fn backoff_for(consecutive_errors: u32, cap: Duration) -> Duration {
    if consecutive_errors == 0 {
        return Duration::ZERO;
    }
    let exp = Duration::from_secs(1u64 << consecutive_errors.min(32));
    exp.min(cap)
}

#[derive(Debug, Default)]
struct ThrottleState {
    last_request: Option<Instant>,
    consecutive_errors: u32,
}

pub struct RateGate {
    config: PacingConfig,
    /// Held across the full wait so callers take turns.
    turn: tokio::sync::Mutex<()>,
    state: Mutex<ThrottleState>,
}

impl RateGate {
    pub fn new(config: PacingConfig) -> Self {
        Self {
            config,
            turn: tokio::sync::Mutex::new(()),
            state: Mutex::new(ThrottleState::default()),
        }
    }

    /// Block until one outbound request may be issued.
    ///
    /// Returns `Cancelled` as soon as the token is signaled, including while
    /// queued behind other callers.
    pub async fn acquire(&self, token: &CancelToken) -> Result<()> {
        token.check()?;
        let _turn = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(AcquireError::Cancelled),
            guard = self.turn.lock() => guard,
        };

        let (since_last, errors) = {
            let state = self.lock_state();
            (state.last_request.map(|t| t.elapsed()), state.consecutive_errors)
        };

        let pacing = self.pacing_wait(since_last);
        debug!(wait_ms = pacing.as_millis() as u64, "Throttle wait");
        interruptible_sleep(pacing, token, self.config.poll_interval).await?;

        if rand::rng().random_bool(self.config.reading_pause_probability) {
            let (lo, hi) = self.config.reading_pause;
            let pause = random_between(lo, hi);
            info!(pause_secs = pause.as_secs_f64(), "Reading pause");
            interruptible_sleep(pause, token, self.config.poll_interval).await?;
        }

        let backoff = backoff_for(errors, self.config.backoff_cap);
        if !backoff.is_zero() {
            info!(
                consecutive_errors = errors,
                backoff_secs = backoff.as_secs(),
                "Backing off after errors"
            );
            interruptible_sleep(backoff, token, self.config.poll_interval).await?;
        }

        self.lock_state().last_request = Some(Instant::now());
        Ok(())
    }

    /// Wait out the session cooldown before starting an acquisition burst.
    pub async fn cooldown(&self, token: &CancelToken) -> Result<()> {
        let Some(elapsed) = self.since_last_request() else {
            return Ok(());
        };
        if elapsed >= self.config.session_cooldown {
            return Ok(());
        }

        let remaining = self.config.session_cooldown - elapsed;
        info!(wait_secs = remaining.as_secs(), "Session cooldown");
        interruptible_sleep(remaining, token, self.config.poll_interval).await
    }

    pub fn record_success(&self) {
        self.lock_state().consecutive_errors = 0;
    }

    pub fn record_failure(&self) {
        let mut state = self.lock_state();
        state.consecutive_errors = state.consecutive_errors.saturating_add(1);
    }

    pub fn consecutive_errors(&self) -> u32 {
        self.lock_state().consecutive_errors
    }

    pub fn since_last_request(&self) -> Option<Duration> {
        self.lock_state().last_request.map(|t| t.elapsed())
    }

    fn pacing_wait(&self, since_last: Option<Duration>) -> Duration {
        match since_last {
            Some(elapsed) if elapsed < self.config.min_delay => {
                (self.config.min_delay - elapsed)
                    + random_between(Duration::ZERO, self.config.jitter_max)
            }
            _ => {
                let (lo, hi) = self.config.human_pause;
                random_between(lo, hi)
            }
        }
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, ThrottleState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Sleep for `duration` in steps of at most `poll`, checking `token` at every
/// step. Cancellation is observed within one poll interval.
pub async fn interruptible_sleep(
    duration: Duration,
    token: &CancelToken,
    poll: Duration,
) -> Result<()> {
    let deadline = Instant::now() + duration;
    loop {
        token.check()?;
        let now = Instant::now();
        if now >= deadline {
            return Ok(());
        }
        let step = (deadline - now).min(poll);
        tokio::select! {
            _ = token.cancelled() => return Err(AcquireError::Cancelled),
            _ = tokio::time::sleep(step) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_then_caps() {
        let cap = Duration::from_secs(60);
        assert_eq!(backoff_for(0, cap), Duration::ZERO);
        assert_eq!(backoff_for(1, cap), Duration::from_secs(2));
        assert_eq!(backoff_for(3, cap), Duration::from_secs(8));
        assert_eq!(backoff_for(6, cap), cap);
        assert_eq!(backoff_for(u32::MAX, cap), cap);
    }

    #[test]
    fn settings_are_sanitized() {
        let settings = PacingSettings {
            min_delay_secs: -5.0,
            reading_pause_probability: 3.0,
            poll_interval_ms: 0,
            ..PacingSettings::default()
        };
        let config = PacingConfig::from_settings(&settings);
        assert_eq!(config.min_delay, Duration::ZERO);
        assert_eq!(config.reading_pause_probability, 1.0);
        assert_eq!(config.poll_interval, Duration::from_millis(1));
    }

    #[test]
    fn default_pacing_matches_settings_defaults() {
        let config = PacingConfig::default();
        assert_eq!(config.min_delay, Duration::from_secs(10));
        assert_eq!(config.session_cooldown, Duration::from_secs(90));
        assert_eq!(config.backoff_cap, Duration::from_secs(60));
        assert_eq!(config.poll_interval, Duration::from_millis(500));
    }

    #[test]
    fn wait_covers_remaining_gap_plus_bounded_jitter() {
        let gate = RateGate::new(PacingConfig::default());
        for _ in 0..50 {
            let wait = gate.pacing_wait(Some(Duration::from_secs(4)));
            assert!(wait >= Duration::from_secs(6), "wait {wait:?} shorter than gap");
            assert!(wait <= Duration::from_secs(9), "wait {wait:?} exceeds gap + jitter");
        }
    }

    #[test]
    fn idle_gate_uses_human_pause() {
        let gate = RateGate::new(PacingConfig::default());
        for _ in 0..50 {
            let wait = gate.pacing_wait(None);
            assert!(wait >= Duration::from_secs(1) && wait <= Duration::from_secs(4));
        }
    }

    #[test]
    fn error_counter_resets_on_success() {
        let gate = RateGate::new(PacingConfig::default());
        gate.record_failure();
        gate.record_failure();
        assert_eq!(gate.consecutive_errors(), 2);
        gate.record_success();
        assert_eq!(gate.consecutive_errors(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_backoff_returns_within_poll_interval() {
        let gate = std::sync::Arc::new(RateGate::new(PacingConfig {
            backoff_cap: Duration::from_secs(60),
            ..PacingConfig::fixed_gap(Duration::ZERO)
        }));
        for _ in 0..6 {
            gate.record_failure();
        }
        let token = CancelToken::new("test");

        let task = {
            let gate = gate.clone();
            let token = token.clone();
            tokio::spawn(async move { gate.acquire(&token).await })
        };

        tokio::time::sleep(Duration::from_secs(5)).await;
        let signaled_at = Instant::now();
        token.cancel();
        let result = task.await.unwrap();

        assert!(matches!(result, Err(AcquireError::Cancelled)));
        assert!(signaled_at.elapsed() <= Duration::from_millis(500));
        assert!(gate.since_last_request().is_none(), "cancelled acquire must not stamp");
    }
}
