//! Flat, serializable resilience settings
//!
//! [`ResilienceConfig`] is the configuration surface embedding code exposes
//! (config files, environment, CLI). It is validated once, when converted
//! into the typed [`RetryConfig`] and [`CircuitBreakerConfig`].

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::backoff::Backoff;
use super::circuit_breaker::CircuitBreakerConfig;
use super::retry::RetryConfig;
use crate::error::{CommonError, CommonResult};
use crate::utils::serde::duration_millis;

/// Retry and circuit breaker settings for one remote dependency
///
/// Durations are (de)serialized as whole milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResilienceConfig {
    pub max_attempts: u32,
    #[serde(with = "duration_millis")]
    pub base_delay: Duration,
    #[serde(with = "duration_millis")]
    pub max_delay: Duration,
    pub backoff_factor: f64,
    pub jitter_enabled: bool,
    pub jitter_factor: f64,
    pub failure_threshold: u32,
    #[serde(with = "duration_millis")]
    pub reset_timeout: Duration,
    pub half_open_successes_required: u32,
    /// Per-attempt timeout
    #[serde(with = "duration_millis")]
    pub timeout: Duration,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(30_000),
            backoff_factor: 2.0,
            jitter_enabled: true,
            jitter_factor: 0.1,
            failure_threshold: 5,
            reset_timeout: Duration::from_millis(60_000),
            half_open_successes_required: 3,
            timeout: Duration::from_millis(30_000),
        }
    }
}

impl ResilienceConfig {
    /// Preset tuned for the GitHub contents and raw APIs
    ///
    /// Secondary rate limits on GitHub clear within a minute or two, so this
    /// preset allows more attempts and wider jitter than the default.
    pub fn github() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(30_000),
            backoff_factor: 2.0,
            jitter_enabled: true,
            jitter_factor: 0.2,
            failure_threshold: 5,
            reset_timeout: Duration::from_millis(60_000),
            half_open_successes_required: 3,
            timeout: Duration::from_millis(30_000),
        }
    }

    /// Check every field without building anything
    ///
    /// # Errors
    ///
    /// Returns [`CommonError::Config`] naming the first invalid field.
    pub fn validate(&self) -> CommonResult<()> {
        self.retry_config()?;
        self.circuit_breaker_config()?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`CommonError::Config`] if any retry field is out of range.
    pub fn retry_config(&self) -> CommonResult<RetryConfig> {
        if self.timeout.is_zero() {
            return Err(CommonError::config_field("timeout", "must be greater than 0"));
        }

        let backoff = Backoff {
            base_delay: self.base_delay,
            max_delay: self.max_delay,
            factor: self.backoff_factor,
            jitter_enabled: self.jitter_enabled,
            jitter_factor: self.jitter_factor,
        };

        RetryConfig::builder()
            .max_attempts(self.max_attempts)
            .backoff(backoff)
            .attempt_timeout(self.timeout)
            .build()
    }

    /// # Errors
    ///
    /// Returns [`CommonError::Config`] if any breaker field is out of range.
    pub fn circuit_breaker_config(&self) -> CommonResult<CircuitBreakerConfig> {
        CircuitBreakerConfig::builder()
            .failure_threshold(self.failure_threshold)
            .reset_timeout(self.reset_timeout)
            .half_open_successes_required(self.half_open_successes_required)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Validates the defaults convert into matching typed configs.
    #[test]
    fn test_default_converts() {
        let config = ResilienceConfig::default();

        let retry = config.retry_config().unwrap();
        assert_eq!(retry.max_attempts, 3);
        assert_eq!(retry.backoff.base_delay, Duration::from_secs(1));
        assert_eq!(retry.attempt_timeout, Some(Duration::from_secs(30)));

        let breaker = config.circuit_breaker_config().unwrap();
        assert_eq!(breaker.failure_threshold, 5);
        assert_eq!(breaker.reset_timeout, Duration::from_secs(60));
        assert_eq!(breaker.half_open_successes_required, 3);
    }

    /// Validates the GitHub preset is valid and more patient than the default.
    #[test]
    fn test_github_preset() {
        let github = ResilienceConfig::github();
        assert!(github.validate().is_ok());
        assert!(github.max_attempts > ResilienceConfig::default().max_attempts);
    }

    /// Validates invalid fields are reported by name.
    #[test]
    fn test_invalid_fields_named() {
        let config = ResilienceConfig { max_attempts: 0, ..ResilienceConfig::default() };
        assert!(matches!(
            config.validate(),
            Err(CommonError::Config { field: Some(ref f), .. }) if f == "max_attempts"
        ));

        let config = ResilienceConfig {
            base_delay: Duration::from_secs(10),
            max_delay: Duration::from_secs(1),
            ..ResilienceConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(CommonError::Config { field: Some(ref f), .. }) if f == "max_delay"
        ));

        let config = ResilienceConfig { failure_threshold: 0, ..ResilienceConfig::default() };
        assert!(config.validate().is_err());

        let config = ResilienceConfig { timeout: Duration::ZERO, ..ResilienceConfig::default() };
        assert!(config.validate().is_err());
    }

    /// Validates TOML with partial fields fills the rest from defaults.
    #[test]
    fn test_deserialize_partial_toml() {
        let config: ResilienceConfig = toml::from_str(
            r"
            max_attempts = 4
            base_delay = 250
            jitter_enabled = false
            ",
        )
        .unwrap();

        assert_eq!(config.max_attempts, 4);
        assert_eq!(config.base_delay, Duration::from_millis(250));
        assert!(!config.jitter_enabled);
        assert_eq!(config.reset_timeout, Duration::from_secs(60));
    }

    /// Validates durations serialize as milliseconds in JSON.
    #[test]
    fn test_serialize_json_millis() {
        let json = serde_json::to_value(ResilienceConfig::default()).unwrap();
        assert_eq!(json["base_delay"], 1000);
        assert_eq!(json["reset_timeout"], 60_000);
    }
}
