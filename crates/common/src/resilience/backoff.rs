//! Exponential backoff calculator
//!
//! `delay(attempt) = min(base_delay * factor^(attempt - 1), max_delay)`, with
//! optional symmetric jitter of `± delay * jitter_factor`. The jittered value
//! is clamped to `[1 ms, max_delay]` and floored to whole milliseconds.
//!
//! The calculator is pure: randomness comes from a caller-supplied
//! [`rand::Rng`], so a seeded generator makes every delay reproducible.

use std::time::Duration;

use rand::Rng;

use crate::error::{CommonError, CommonResult};

/// Smallest delay a jittered backoff may produce.
pub const MIN_JITTERED_DELAY: Duration = Duration::from_millis(1);

/// Exponential backoff parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    /// Delay before the second attempt
    pub base_delay: Duration,
    /// Ceiling applied before and after jitter
    pub max_delay: Duration,
    /// Growth multiplier per attempt
    pub factor: f64,
    /// Whether jitter is applied
    pub jitter_enabled: bool,
    /// Jitter amplitude as a fraction of the delay, in `[0, 1]`
    pub jitter_factor: f64,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(30_000),
            factor: 2.0,
            jitter_enabled: true,
            jitter_factor: 0.1,
        }
    }
}

impl Backoff {
    /// Exponential backoff without jitter
    pub fn exponential(base_delay: Duration, max_delay: Duration, factor: f64) -> Self {
        Self { base_delay, max_delay, factor, jitter_enabled: false, jitter_factor: 0.0 }
    }

    /// Enable jitter with the given amplitude
    #[must_use]
    pub fn with_jitter(mut self, jitter_factor: f64) -> Self {
        self.jitter_enabled = true;
        self.jitter_factor = jitter_factor;
        self
    }

    /// Disable jitter
    #[must_use]
    pub fn without_jitter(mut self) -> Self {
        self.jitter_enabled = false;
        self
    }

    /// Check the parameters describe a usable backoff
    ///
    /// # Errors
    ///
    /// Returns [`CommonError::Config`] naming the offending field.
    pub fn validate(&self) -> CommonResult<()> {
        if self.base_delay < Duration::from_millis(1) {
            return Err(CommonError::config_field("base_delay", "must be at least 1ms"));
        }
        if self.max_delay < self.base_delay {
            return Err(CommonError::config_field(
                "max_delay",
                format!(
                    "must be >= base_delay ({}ms), got {}ms",
                    self.base_delay.as_millis(),
                    self.max_delay.as_millis()
                ),
            ));
        }
        if !self.factor.is_finite() || self.factor < 1.0 {
            return Err(CommonError::config_field(
                "backoff_factor",
                format!("must be a finite number >= 1.0, got {}", self.factor),
            ));
        }
        if !(0.0..=1.0).contains(&self.jitter_factor) {
            return Err(CommonError::config_field(
                "jitter_factor",
                format!("must be within [0, 1], got {}", self.jitter_factor),
            ));
        }
        Ok(())
    }

    /// Delay after the given failed attempt, before jitter
    ///
    /// # Errors
    ///
    /// `attempt` is 1-indexed; `0` yields [`CommonError::Validation`].
    pub fn base_delay_for(&self, attempt: u32) -> CommonResult<Duration> {
        let exponent = Self::exponent(attempt)?;
        Ok(millis_to_duration(self.capped_millis(exponent)))
    }

    /// Delay after the given failed attempt, jittered with `rng` when enabled
    ///
    /// # Errors
    ///
    /// `attempt` is 1-indexed; `0` yields [`CommonError::Validation`].
    pub fn delay_with<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> CommonResult<Duration> {
        let exponent = Self::exponent(attempt)?;
        Ok(self.delay_from_exponent(exponent, rng))
    }

    /// Delay after the given failed attempt using the thread-local generator
    ///
    /// # Errors
    ///
    /// `attempt` is 1-indexed; `0` yields [`CommonError::Validation`].
    pub fn delay(&self, attempt: u32) -> CommonResult<Duration> {
        self.delay_with(attempt, &mut rand::thread_rng())
    }

    /// Infallible variant for callers that already hold a valid attempt
    /// number (`attempt >= 1`); an attempt of zero is treated as one.
    pub(crate) fn next_delay(&self, attempt: u32) -> Duration {
        self.delay_from_exponent(attempt.saturating_sub(1), &mut rand::thread_rng())
    }

    fn exponent(attempt: u32) -> CommonResult<u32> {
        if attempt == 0 {
            return Err(CommonError::validation_with_value(
                "attempt",
                "attempt numbers are 1-indexed",
                "0",
            ));
        }
        Ok(attempt - 1)
    }

    fn delay_from_exponent<R: Rng + ?Sized>(&self, exponent: u32, rng: &mut R) -> Duration {
        let delay = self.capped_millis(exponent);
        if !self.jitter_enabled || self.jitter_factor <= 0.0 {
            return millis_to_duration(delay);
        }

        let range = delay * self.jitter_factor;
        let jittered = delay + rng.gen_range(-range..=range);
        let floor = duration_to_millis(MIN_JITTERED_DELAY);
        let ceiling = duration_to_millis(self.max_delay).max(floor);
        millis_to_duration(jittered.clamp(floor, ceiling))
    }

    fn capped_millis(&self, exponent: u32) -> f64 {
        let base = duration_to_millis(self.base_delay);
        let max = duration_to_millis(self.max_delay);
        // powf saturates to +inf for huge exponents, which min() then caps
        let raw = base * self.factor.powf(f64::from(exponent));
        if raw.is_nan() {
            return max;
        }
        raw.min(max)
    }
}

fn duration_to_millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn millis_to_duration(millis: f64) -> Duration {
    // Inputs are clamped to [0, max_delay] by the callers
    Duration::from_millis(millis.max(0.0).floor() as u64)
}
