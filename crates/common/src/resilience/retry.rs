//! Retry executor with exponential backoff and classified failures
//!
//! [`RetryExecutor`] runs a caller-supplied asynchronous operation until it
//! succeeds, fails with an error its [`RetryPolicy`] refuses to retry, or
//! `max_attempts` attempts have been made. Between attempts it sleeps for the
//! delay computed by [`Backoff`] and notifies its [`RetryObserver`].
//!
//! The default policy, [`policies::Classified`], retries exactly the errors
//! whose [`ErrorClassification::is_retryable`] returns `true`, and honours a
//! rate-limit `retry_after` hint when the error carries one.
//!
//! ```rust
//! use std::time::Duration;
//!
//! use dotclaude_common::error::CommonError;
//! use dotclaude_common::resilience::{RetryConfig, RetryExecutor};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RetryConfig::builder()
//!     .max_attempts(3)
//!     .base_delay(Duration::from_millis(100))
//!     .no_jitter()
//!     .build()?;
//!
//! let executor = RetryExecutor::new(config);
//! let value = executor
//!     .execute(|attempt| async move {
//!         if attempt < 2 {
//!             Err(CommonError::timeout("probe", Duration::from_millis(5)))
//!         } else {
//!             Ok(attempt)
//!         }
//!     })
//!     .await?;
//! assert_eq!(value, 2);
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use super::backoff::Backoff;
use crate::error::{
    CommonError, CommonResult, ErrorCategory, ErrorClassification, TransportFailure,
};

/// Terminal failures of a retry execution
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// Every permitted attempt failed; `source` is the last error seen
    #[error("gave up after {attempts} attempts: {source}")]
    Exhausted { attempts: u32, source: E },

    /// An attempt failed with an error the policy refused to retry
    #[error("{source}")]
    NonRetryable { attempts: u32, source: E },
}

impl<E> RetryError<E> {
    /// Number of attempts made before giving up
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Exhausted { attempts, .. } | Self::NonRetryable { attempts, .. } => *attempts,
        }
    }

    /// The terminal underlying error
    pub fn last_error(&self) -> &E {
        match self {
            Self::Exhausted { source, .. } | Self::NonRetryable { source, .. } => source,
        }
    }

    /// Consume the wrapper and return the terminal underlying error
    pub fn into_last_error(self) -> E {
        match self {
            Self::Exhausted { source, .. } | Self::NonRetryable { source, .. } => source,
        }
    }

    /// Whether the attempt budget ran out
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }
}

/// Result type for retry operations
pub type RetryResult<T, E> = Result<T, RetryError<E>>;

/// An attempt did not settle within the configured per-attempt timeout
///
/// Operation error types convert from this through `From`, so a timed-out
/// attempt flows through classification like any other failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("attempt {attempt} timed out after {after:?}")]
pub struct AttemptTimeout {
    /// Attempt number that timed out (1-indexed)
    pub attempt: u32,
    /// The configured per-attempt limit
    pub after: Duration,
}

impl ErrorClassification for AttemptTimeout {
    fn category(&self) -> ErrorCategory {
        ErrorCategory::Transport(TransportFailure::Timeout)
    }
}

impl From<AttemptTimeout> for CommonError {
    fn from(timeout: AttemptTimeout) -> Self {
        CommonError::timeout(format!("attempt {}", timeout.attempt), timeout.after)
    }
}

/// Outcome of a retry execution including result and summary statistics.
#[derive(Debug)]
pub struct RetryOutcome<T, E> {
    pub result: RetryResult<T, E>,
    /// Attempts actually made
    pub attempts: u32,
    /// Sum of the inter-attempt sleeps
    pub total_delay: Duration,
    /// Wall time from the first attempt to completion
    pub elapsed: Duration,
}

impl<T, E> RetryOutcome<T, E> {
    /// Consume the outcome and return only the result.
    pub fn into_result(self) -> RetryResult<T, E> {
        self.result
    }

    /// Get the average delay between attempts (excludes operation execution
    /// time).
    pub fn average_delay(&self) -> Duration {
        if self.attempts <= 1 {
            return Duration::ZERO;
        }
        self.total_delay / (self.attempts - 1)
    }
}

/// Record of one failed attempt that will be retried
#[derive(Debug)]
pub struct AttemptOutcome<'a, E> {
    /// The attempt that just failed (1-indexed)
    pub attempt: u32,
    /// Why it failed
    pub error: &'a E,
    /// How long the executor will sleep before the next attempt
    pub delay_before_next: Duration,
}

/// Observer notified before each inter-attempt sleep
///
/// Notifications are side effects only; they cannot alter control flow.
/// The final failed attempt is never reported.
pub trait RetryObserver<E> {
    fn on_retry(&self, outcome: &AttemptOutcome<'_, E>);
}

impl<E, F> RetryObserver<E> for F
where
    F: Fn(&AttemptOutcome<'_, E>),
{
    fn on_retry(&self, outcome: &AttemptOutcome<'_, E>) {
        self(outcome);
    }
}

/// Observer that does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl<E> RetryObserver<E> for NoopObserver {
    fn on_retry(&self, _outcome: &AttemptOutcome<'_, E>) {}
}

/// Observer that logs each retry through `tracing`
#[derive(Debug, Clone)]
pub struct TracingObserver {
    operation: String,
}

impl TracingObserver {
    pub fn new(operation: impl Into<String>) -> Self {
        Self { operation: operation.into() }
    }
}

impl<E: fmt::Display> RetryObserver<E> for TracingObserver {
    fn on_retry(&self, outcome: &AttemptOutcome<'_, E>) {
        warn!(
            operation = %self.operation,
            attempt = outcome.attempt,
            delay_ms = u64::try_from(outcome.delay_before_next.as_millis()).unwrap_or(u64::MAX),
            error = %outcome.error,
            "attempt failed, retrying"
        );
    }
}

/// Trait for determining whether an error should be retried
pub trait RetryPolicy<E> {
    /// Determine if the error should be retried and optionally provide a custom
    /// delay
    fn should_retry(&self, error: &E, attempt: u32) -> RetryDecision;
}

/// Decision for whether to retry an operation
#[derive(Debug, Clone, PartialEq)]
pub enum RetryDecision {
    /// Retry the operation with the default backoff delay
    Retry,
    /// Retry after at least this long (the backoff delay still applies if
    /// larger)
    RetryAfter(Duration),
    /// Don't retry the operation
    Stop,
}

/// Configuration for retry behavior
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first
    pub max_attempts: u32,
    /// Delay schedule between attempts
    pub backoff: Backoff,
    /// Deadline for a single attempt
    pub attempt_timeout: Option<Duration>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { max_attempts: 3, backoff: Backoff::default(), attempt_timeout: None }
    }
}

impl RetryConfig {
    /// Create a configuration builder
    pub fn builder() -> RetryConfigBuilder {
        RetryConfigBuilder::new()
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns [`CommonError::Config`] naming the offending field.
    pub fn validate(&self) -> CommonResult<()> {
        if self.max_attempts == 0 {
            return Err(CommonError::config_field("max_attempts", "must be at least 1"));
        }
        if self.attempt_timeout == Some(Duration::ZERO) {
            return Err(CommonError::config_field("timeout", "must be greater than 0"));
        }
        self.backoff.validate()
    }
}

/// Builder for RetryConfig with fluent API
#[derive(Debug, Default)]
pub struct RetryConfigBuilder {
    config: RetryConfig,
}

impl RetryConfigBuilder {
    pub fn new() -> Self {
        Self { config: RetryConfig::default() }
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.max_attempts = attempts;
        self
    }

    pub fn base_delay(mut self, delay: Duration) -> Self {
        self.config.backoff.base_delay = delay;
        self
    }

    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.config.backoff.max_delay = delay;
        self
    }

    pub fn backoff_factor(mut self, factor: f64) -> Self {
        self.config.backoff.factor = factor;
        self
    }

    pub fn backoff(mut self, backoff: Backoff) -> Self {
        self.config.backoff = backoff;
        self
    }

    pub fn jitter(mut self, jitter_factor: f64) -> Self {
        self.config.backoff = self.config.backoff.with_jitter(jitter_factor);
        self
    }

    pub fn no_jitter(mut self) -> Self {
        self.config.backoff = self.config.backoff.without_jitter();
        self
    }

    pub fn attempt_timeout(mut self, timeout: Duration) -> Self {
        self.config.attempt_timeout = Some(timeout);
        self
    }

    pub fn no_attempt_timeout(mut self) -> Self {
        self.config.attempt_timeout = None;
        self
    }

    /// # Errors
    ///
    /// Returns [`CommonError::Config`] if any field is out of range.
    pub fn build(self) -> CommonResult<RetryConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// The main retry executor
#[derive(Debug, Clone)]
pub struct RetryExecutor<P = policies::Classified, O = NoopObserver> {
    config: RetryConfig,
    policy: P,
    observer: O,
}

impl RetryExecutor {
    /// Create an executor that retries classified-retryable errors
    pub fn new(config: RetryConfig) -> Self {
        Self::with_policy(config, policies::Classified)
    }
}

impl<P> RetryExecutor<P> {
    /// Create an executor with a custom retry policy
    pub fn with_policy(config: RetryConfig, policy: P) -> Self {
        Self { config, policy, observer: NoopObserver }
    }
}

impl<P, O> RetryExecutor<P, O> {
    /// Replace the observer notified before each retry
    pub fn with_observer<O2>(self, observer: O2) -> RetryExecutor<P, O2> {
        RetryExecutor { config: self.config, policy: self.policy, observer }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Execute an operation with retry logic
    ///
    /// The operation receives the 1-indexed attempt number.
    ///
    /// # Errors
    ///
    /// [`RetryError::NonRetryable`] carrying the original error when the
    /// policy stops, or [`RetryError::Exhausted`] wrapping the last error once
    /// `max_attempts` attempts have failed.
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> RetryResult<T, E>
    where
        P: RetryPolicy<E>,
        O: RetryObserver<E>,
        E: fmt::Display + From<AttemptTimeout>,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.execute_with_outcome(operation).await.into_result()
    }

    /// Execute an operation with retry logic and return outcome statistics.
    #[instrument(skip_all, fields(max_attempts = self.config.max_attempts))]
    pub async fn execute_with_outcome<F, Fut, T, E>(&self, mut operation: F) -> RetryOutcome<T, E>
    where
        P: RetryPolicy<E>,
        O: RetryObserver<E>,
        E: fmt::Display + From<AttemptTimeout>,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let started = Instant::now();
        let max_attempts = self.config.max_attempts.max(1);
        let mut total_delay = Duration::ZERO;
        let mut attempt = 1;

        loop {
            debug!(attempt, max_attempts, "executing attempt");

            let result = match self.config.attempt_timeout {
                Some(limit) => match tokio::time::timeout(limit, operation(attempt)).await {
                    Ok(result) => result,
                    Err(_) => Err(E::from(AttemptTimeout { attempt, after: limit })),
                },
                None => operation(attempt).await,
            };

            let error = match result {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(attempt, "operation succeeded after retries");
                    }
                    return RetryOutcome {
                        result: Ok(value),
                        attempts: attempt,
                        total_delay,
                        elapsed: started.elapsed(),
                    };
                }
                Err(error) => error,
            };

            let decision = self.policy.should_retry(&error, attempt);
            if decision == RetryDecision::Stop {
                debug!(attempt, %error, "error is not retryable");
                return RetryOutcome {
                    result: Err(RetryError::NonRetryable { attempts: attempt, source: error }),
                    attempts: attempt,
                    total_delay,
                    elapsed: started.elapsed(),
                };
            }

            if attempt >= max_attempts {
                warn!(attempts = attempt, %error, "all retry attempts exhausted");
                return RetryOutcome {
                    result: Err(RetryError::Exhausted { attempts: attempt, source: error }),
                    attempts: attempt,
                    total_delay,
                    elapsed: started.elapsed(),
                };
            }

            let delay = self.delay_for(attempt, &decision);
            self.observer.on_retry(&AttemptOutcome {
                attempt,
                error: &error,
                delay_before_next: delay,
            });
            drop(error);

            tokio::time::sleep(delay).await;
            total_delay += delay;
            attempt += 1;
        }
    }

    fn delay_for(&self, attempt: u32, decision: &RetryDecision) -> Duration {
        let backoff = self.config.backoff.next_delay(attempt);
        match decision {
            RetryDecision::RetryAfter(hint) => backoff.max((*hint).min(self.config.backoff.max_delay)),
            RetryDecision::Retry | RetryDecision::Stop => backoff,
        }
    }
}

/// Pre-defined retry policies for common scenarios
pub mod policies {
    use super::{ErrorClassification, RetryDecision, RetryPolicy};

    /// Retry exactly the errors classified as retryable
    ///
    /// Errors carrying a `retry_after` hint are retried no sooner than the
    /// hint (capped at `max_delay`).
    #[derive(Debug, Clone, Copy, Default)]
    pub struct Classified;

    impl<E: ErrorClassification> RetryPolicy<E> for Classified {
        fn should_retry(&self, error: &E, _attempt: u32) -> RetryDecision {
            if !error.is_retryable() {
                return RetryDecision::Stop;
            }
            match error.retry_after() {
                Some(hint) => RetryDecision::RetryAfter(hint),
                None => RetryDecision::Retry,
            }
        }
    }

    /// Always retry policy - retries on any error
    #[derive(Debug, Clone, Copy, Default)]
    pub struct AlwaysRetry;

    impl<E> RetryPolicy<E> for AlwaysRetry {
        fn should_retry(&self, _error: &E, _attempt: u32) -> RetryDecision {
            RetryDecision::Retry
        }
    }

    /// Never retry policy - never retries
    #[derive(Debug, Clone, Copy, Default)]
    pub struct NeverRetry;

    impl<E> RetryPolicy<E> for NeverRetry {
        fn should_retry(&self, _error: &E, _attempt: u32) -> RetryDecision {
            RetryDecision::Stop
        }
    }

    /// Predicate-based retry policy
    #[derive(Debug, Clone)]
    pub struct PredicateRetry<F> {
        predicate: F,
    }

    impl<F> PredicateRetry<F> {
        pub fn new(predicate: F) -> Self {
            Self { predicate }
        }
    }

    impl<F, E> RetryPolicy<E> for PredicateRetry<F>
    where
        F: Fn(&E, u32) -> bool,
    {
        fn should_retry(&self, error: &E, attempt: u32) -> RetryDecision {
            if (self.predicate)(error, attempt) {
                RetryDecision::Retry
            } else {
                RetryDecision::Stop
            }
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for the retry executor and policies
    //!
    //! Tests cover attempt counting, classification, observer notification,
    //! per-attempt timeouts, rate-limit hints and configuration validation.
    //! Sleeps run on a paused tokio clock.

    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    use super::policies::{AlwaysRetry, NeverRetry, PredicateRetry};
    use super::*;

    #[derive(Debug, Clone, PartialEq, Error)]
    enum TestError {
        #[error("server fault")]
        Server,
        #[error("bad request")]
        BadRequest,
        #[error("rate limited")]
        RateLimited(Duration),
        #[error("timed out")]
        Timeout,
    }

    impl ErrorClassification for TestError {
        fn category(&self) -> ErrorCategory {
            match self {
                Self::Server => ErrorCategory::ServerFault,
                Self::BadRequest => ErrorCategory::ClientFault,
                Self::RateLimited(_) => ErrorCategory::RateLimited,
                Self::Timeout => ErrorCategory::Transport(TransportFailure::Timeout),
            }
        }

        fn retry_after(&self) -> Option<Duration> {
            match self {
                Self::RateLimited(hint) => Some(*hint),
                _ => None,
            }
        }
    }

    impl From<AttemptTimeout> for TestError {
        fn from(_: AttemptTimeout) -> Self {
            Self::Timeout
        }
    }

    #[derive(Debug, Clone, Default)]
    struct Recorder {
        seen: Arc<Mutex<Vec<(u32, Duration)>>>,
    }

    impl Recorder {
        fn delays(&self) -> Vec<Duration> {
            self.seen.lock().unwrap().iter().map(|(_, delay)| *delay).collect()
        }
    }

    impl RetryObserver<TestError> for Recorder {
        fn on_retry(&self, outcome: &AttemptOutcome<'_, TestError>) {
            self.seen.lock().unwrap().push((outcome.attempt, outcome.delay_before_next));
        }
    }

    fn config(max_attempts: u32) -> RetryConfig {
        RetryConfig::builder()
            .max_attempts(max_attempts)
            .base_delay(Duration::from_millis(100))
            .max_delay(Duration::from_millis(1000))
            .backoff_factor(2.0)
            .no_jitter()
            .build()
            .expect("valid config")
    }

    /// Validates `RetryDecision` equality.
    #[test]
    fn test_retry_decision_equality() {
        assert_eq!(RetryDecision::Retry, RetryDecision::Retry);
        assert_eq!(RetryDecision::Stop, RetryDecision::Stop);
        assert_ne!(RetryDecision::Retry, RetryDecision::Stop);
    }

    /// Validates `RetryConfig::default` values.
    ///
    /// Assertions:
    /// - Three attempts, 1000 ms base, 30000 ms ceiling, factor 2, jitter 0.1.
    /// - No per-attempt timeout.
    #[test]
    fn test_retry_config_default() {
        let config = RetryConfig::default();

        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.backoff.base_delay, Duration::from_millis(1000));
        assert_eq!(config.backoff.max_delay, Duration::from_millis(30_000));
        assert!((config.backoff.factor - 2.0).abs() < f64::EPSILON);
        assert!(config.backoff.jitter_enabled);
        assert!((config.backoff.jitter_factor - 0.1).abs() < f64::EPSILON);
        assert_eq!(config.attempt_timeout, None);
        assert!(config.validate().is_ok());
    }

    /// Validates builder rejects out-of-range values.
    #[test]
    fn test_retry_config_builder_validation_fails() {
        assert!(RetryConfig::builder().max_attempts(0).build().is_err());
        assert!(RetryConfig::builder().attempt_timeout(Duration::ZERO).build().is_err());
        assert!(RetryConfig::builder()
            .base_delay(Duration::from_secs(2))
            .max_delay(Duration::from_secs(1))
            .build()
            .is_err());
    }

    /// Validates an operation that always fails retryably runs exactly
    /// `max_attempts` times.
    ///
    /// Assertions:
    /// - Invocation count equals 4.
    /// - Error is `Exhausted` with `attempts == 4` and the last error.
    #[tokio::test(start_paused = true)]
    async fn test_always_failing_exhausts_attempts() {
        let executor = RetryExecutor::new(config(4));
        let calls = AtomicU32::new(0);

        let result: RetryResult<(), TestError> = executor
            .execute(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(TestError::Server) }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 4);
        match result {
            Err(RetryError::Exhausted { attempts, source }) => {
                assert_eq!(attempts, 4);
                assert_eq!(source, TestError::Server);
            }
            other => panic!("expected Exhausted, got {other:?}"),
        }
    }

    /// Validates fail-once-then-succeed runs exactly twice.
    #[tokio::test(start_paused = true)]
    async fn test_fail_once_then_succeed() {
        let executor = RetryExecutor::new(config(5));
        let calls = AtomicU32::new(0);

        let outcome = executor
            .execute_with_outcome(|attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt == 1 {
                        Err(TestError::Server)
                    } else {
                        Ok("payload")
                    }
                }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(outcome.attempts, 2);
        assert_eq!(outcome.total_delay, Duration::from_millis(100));
        assert_eq!(outcome.result.unwrap(), "payload");
    }

    /// Validates `elapsed` is measured on the same clock as the sleeps, so
    /// paused runtime time is reflected in it.
    #[tokio::test(start_paused = true)]
    async fn test_elapsed_covers_backoff_sleeps() {
        let executor = RetryExecutor::new(config(3));

        let outcome = executor
            .execute_with_outcome(|_| async { Err::<(), _>(TestError::Server) })
            .await;

        assert_eq!(outcome.attempts, 3);
        assert_eq!(outcome.total_delay, Duration::from_millis(300));
        assert!(outcome.elapsed >= outcome.total_delay, "elapsed {:?}", outcome.elapsed);
    }

    /// Validates a non-retryable error stops after one invocation.
    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_invoked_once() {
        let executor = RetryExecutor::new(config(10));
        let calls = AtomicU32::new(0);

        let result: RetryResult<(), TestError> = executor
            .execute(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(TestError::BadRequest) }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let err = result.unwrap_err();
        assert!(matches!(err, RetryError::NonRetryable { attempts: 1, .. }));
        assert_eq!(err.to_string(), "bad request");
        assert_eq!(err.into_last_error(), TestError::BadRequest);
    }

    /// Validates `max_attempts = 1` performs no retries and never notifies.
    #[tokio::test(start_paused = true)]
    async fn test_single_attempt_no_retry() {
        let recorder = Recorder::default();
        let executor = RetryExecutor::new(config(1)).with_observer(recorder.clone());

        let outcome: RetryOutcome<(), TestError> =
            executor.execute_with_outcome(|_| async { Err(TestError::Server) }).await;

        assert_eq!(outcome.attempts, 1);
        assert_eq!(outcome.total_delay, Duration::ZERO);
        assert!(outcome.result.unwrap_err().is_exhausted());
        assert!(recorder.delays().is_empty());
    }

    /// Validates the observer sees each retry, but not the final failure.
    ///
    /// Assertions:
    /// - Notified for attempts 1 and 2 only (3 attempts total).
    /// - Delays are 100 ms then 200 ms.
    #[tokio::test(start_paused = true)]
    async fn test_observer_notified_before_each_sleep() {
        let recorder = Recorder::default();
        let executor = RetryExecutor::new(config(3)).with_observer(recorder.clone());

        let _: RetryResult<(), TestError> =
            executor.execute(|_| async { Err(TestError::Server) }).await;

        assert_eq!(
            *recorder.seen.lock().unwrap(),
            vec![(1, Duration::from_millis(100)), (2, Duration::from_millis(200))]
        );
    }

    /// Validates a hung attempt becomes a retryable timeout.
    #[tokio::test(start_paused = true)]
    async fn test_attempt_timeout_counts_against_attempts() {
        let config = RetryConfig::builder()
            .max_attempts(3)
            .base_delay(Duration::from_millis(10))
            .no_jitter()
            .attempt_timeout(Duration::from_millis(50))
            .build()
            .unwrap();
        let executor = RetryExecutor::new(config);
        let calls = Arc::new(AtomicU32::new(0));

        let result = executor
            .execute(|attempt| {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    if attempt < 3 {
                        tokio::time::sleep(Duration::from_secs(60)).await;
                    }
                    Ok::<_, TestError>(attempt)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    /// Validates a rate-limit hint lengthens the delay up to `max_delay`.
    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_hint_extends_delay() {
        let recorder = Recorder::default();
        let executor = RetryExecutor::new(config(3)).with_observer(recorder.clone());

        let _: RetryResult<(), TestError> = executor
            .execute(|attempt| async move {
                if attempt == 1 {
                    Err(TestError::RateLimited(Duration::from_millis(600)))
                } else {
                    Err(TestError::RateLimited(Duration::from_secs(3600)))
                }
            })
            .await;

        assert_eq!(recorder.delays(), vec![Duration::from_millis(600), Duration::from_millis(1000)]);
    }

    /// Validates the alternative policies.
    #[tokio::test(start_paused = true)]
    async fn test_custom_policies() {
        let always = RetryExecutor::with_policy(config(3), AlwaysRetry);
        let calls = AtomicU32::new(0);
        let _: RetryResult<(), TestError> = always
            .execute(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(TestError::BadRequest) }
            })
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 3, "AlwaysRetry ignores classification");

        let never = RetryExecutor::with_policy(config(3), NeverRetry);
        let calls = AtomicU32::new(0);
        let _: RetryResult<(), TestError> = never
            .execute(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(TestError::Server) }
            })
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let predicate = RetryExecutor::with_policy(
            config(5),
            PredicateRetry::new(|_: &TestError, attempt: u32| attempt < 2),
        );
        let calls = AtomicU32::new(0);
        let result: RetryResult<(), TestError> = predicate
            .execute(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(TestError::Server) }
            })
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(matches!(result, Err(RetryError::NonRetryable { attempts: 2, .. })));
    }

    /// Validates `RetryOutcome::average_delay`.
    #[test]
    fn test_outcome_average_delay() {
        let outcome: RetryOutcome<(), TestError> = RetryOutcome {
            result: Ok(()),
            attempts: 3,
            total_delay: Duration::from_millis(300),
            elapsed: Duration::from_millis(310),
        };
        assert_eq!(outcome.average_delay(), Duration::from_millis(150));
    }

    /// Validates the attempt timeout conversion into `CommonError`.
    #[test]
    fn test_attempt_timeout_conversion() {
        let timeout = AttemptTimeout { attempt: 2, after: Duration::from_millis(50) };
        assert!(timeout.is_retryable());

        let common = CommonError::from(timeout);
        assert!(common.is_retryable());
    }
}
