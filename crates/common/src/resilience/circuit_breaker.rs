//! Circuit breaker for a shared remote dependency
//!
//! The breaker gates whether calls are attempted at all. It does not retry;
//! wrap a [`RetryExecutor`](super::RetryExecutor) in it and the breaker only
//! sees the aggregate outcome of each logical call.
//!
//! ## State machine
//!
//! | From | To | When |
//! |------|----|------|
//! | Closed | Open | `failure_count` reaches `failure_threshold` |
//! | Open | HalfOpen | a call arrives at least `reset_timeout` after the last failure |
//! | HalfOpen | Closed | `half_open_successes_required` consecutive successes |
//! | HalfOpen | Open | any failure |
//!
//! [`CircuitBreaker::reset`] additionally forces Closed as an operator action.
//!
//! ## Concurrency
//!
//! All mutable state sits behind one mutex and every check-and-transition
//! happens inside a single critical section that never spans an `.await`.
//! Each transition bumps a generation counter; a call records its result
//! only if the generation it was admitted under is still current, so a slow
//! call admitted while Closed cannot close or reopen a breaker that has
//! since moved on.
//!
//! While HalfOpen at most `half_open_successes_required` trial calls are in
//! flight at once; calls beyond that are rejected with `CircuitOpen` as if
//! the circuit were still open.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use super::clock::{Clock, SystemClock};
use crate::error::{CommonError, CommonResult, ErrorCategory, ErrorClassification};

/// Errors produced by calls through a circuit breaker
///
/// `CircuitOpen` means the operation was not attempted; `OperationFailed`
/// means it was attempted and failed.
#[derive(Debug, Error)]
pub enum ResilienceError<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    /// Circuit breaker is open, rejecting calls
    #[error("circuit breaker '{service}' is open, retry in {retry_after:?}")]
    CircuitOpen { service: String, retry_after: Duration },

    /// The underlying operation failed
    #[error("Operation failed: {source}")]
    OperationFailed {
        #[source]
        source: E,
    },
}

impl<E> ResilienceError<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    /// Whether the call was short-circuited without being attempted
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, Self::CircuitOpen { .. })
    }

    /// The operation's own error, if the operation ran
    pub fn into_operation_error(self) -> Option<E> {
        match self {
            Self::OperationFailed { source } => Some(source),
            Self::CircuitOpen { .. } => None,
        }
    }
}

impl<E> ErrorClassification for ResilienceError<E>
where
    E: std::error::Error + ErrorClassification + Send + Sync + 'static,
{
    fn category(&self) -> ErrorCategory {
        match self {
            // The dependency is known to be failing; surfaced like a server fault
            Self::CircuitOpen { .. } => ErrorCategory::ServerFault,
            Self::OperationFailed { source } => source.category(),
        }
    }

    fn is_retryable(&self) -> bool {
        match self {
            Self::CircuitOpen { .. } => false,
            Self::OperationFailed { source } => source.is_retryable(),
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::CircuitOpen { retry_after, .. } => Some(*retry_after),
            Self::OperationFailed { source } => source.retry_after(),
        }
    }
}

/// Result type for resilience operations
pub type ResilienceResult<T, E> = Result<T, ResilienceError<E>>;

/// Circuit breaker states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Circuit is closed, allowing requests
    Closed,
    /// Circuit is open, rejecting requests
    Open,
    /// Circuit is half-open, forwarding calls to probe recovery
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "CLOSED"),
            CircuitState::Open => write!(f, "OPEN"),
            CircuitState::HalfOpen => write!(f, "HALF_OPEN"),
        }
    }
}

/// Configuration for circuit breaker behavior
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that open the circuit
    pub failure_threshold: u32,
    /// Time to wait after the last failure before probing
    pub reset_timeout: Duration,
    /// Consecutive probe successes needed to close again
    pub half_open_successes_required: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout: Duration::from_secs(60),
            half_open_successes_required: 3,
        }
    }
}

impl CircuitBreakerConfig {
    /// Create a configuration builder
    pub fn builder() -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfigBuilder::new()
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns [`CommonError::Config`] naming the offending field.
    pub fn validate(&self) -> CommonResult<()> {
        if self.failure_threshold == 0 {
            return Err(CommonError::config_field("failure_threshold", "must be at least 1"));
        }

        if self.half_open_successes_required == 0 {
            return Err(CommonError::config_field(
                "half_open_successes_required",
                "must be at least 1",
            ));
        }

        Ok(())
    }
}

/// Builder for CircuitBreakerConfig
#[derive(Debug, Default)]
pub struct CircuitBreakerConfigBuilder {
    config: CircuitBreakerConfig,
}

impl CircuitBreakerConfigBuilder {
    pub fn new() -> Self {
        Self { config: CircuitBreakerConfig::default() }
    }

    pub fn failure_threshold(mut self, threshold: u32) -> Self {
        self.config.failure_threshold = threshold;
        self
    }

    pub fn reset_timeout(mut self, timeout: Duration) -> Self {
        self.config.reset_timeout = timeout;
        self
    }

    pub fn half_open_successes_required(mut self, successes: u32) -> Self {
        self.config.half_open_successes_required = successes;
        self
    }

    /// Set a custom clock for the circuit breaker (useful for testing)
    pub fn clock<C: Clock>(self, clock: C) -> CircuitBreakerBuilderWithClock<C> {
        CircuitBreakerBuilderWithClock { config: self.config, clock, name: None }
    }

    /// # Errors
    ///
    /// Returns [`CommonError::Config`] if any field is out of range.
    pub fn build(self) -> CommonResult<CircuitBreakerConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Builder with custom clock that builds a CircuitBreaker directly
pub struct CircuitBreakerBuilderWithClock<C: Clock> {
    config: CircuitBreakerConfig,
    clock: C,
    name: Option<String>,
}

impl<C: Clock> CircuitBreakerBuilderWithClock<C> {
    pub fn failure_threshold(mut self, threshold: u32) -> Self {
        self.config.failure_threshold = threshold;
        self
    }

    pub fn reset_timeout(mut self, timeout: Duration) -> Self {
        self.config.reset_timeout = timeout;
        self
    }

    pub fn half_open_successes_required(mut self, successes: u32) -> Self {
        self.config.half_open_successes_required = successes;
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// # Errors
    ///
    /// Returns [`CommonError::Config`] if any field is out of range.
    pub fn build(self) -> CommonResult<CircuitBreaker<C>> {
        let breaker = CircuitBreaker::with_clock(self.config, self.clock)?;
        Ok(match self.name {
            Some(name) => breaker.with_name(name),
            None => breaker,
        })
    }
}

/// Circuit breaker metrics for monitoring
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitBreakerMetrics {
    pub state: CircuitState,
    pub failure_count: u32,
    pub half_open_successes: u32,
    /// Calls admitted since creation
    pub total_calls: u64,
    /// Calls rejected while open
    pub rejected_calls: u64,
    pub last_failure: Option<Instant>,
    pub state_changed_at: Instant,
}

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    failure_count: u32,
    last_failure: Option<Instant>,
    half_open_successes: u32,
    half_open_in_flight: u32,
    generation: u64,
    state_changed_at: Instant,
}

impl BreakerState {
    fn transition(&mut self, to: CircuitState, now: Instant) {
        self.state = to;
        self.generation = self.generation.wrapping_add(1);
        self.half_open_in_flight = 0;
        self.state_changed_at = now;
    }
}

/// Generic circuit breaker implementation
///
/// Cloning yields another handle to the same breaker; every clone shares
/// failure tracking.
pub struct CircuitBreaker<C: Clock = SystemClock> {
    name: Arc<str>,
    config: CircuitBreakerConfig,
    inner: Arc<Mutex<BreakerState>>,
    total_calls: Arc<AtomicU64>,
    rejected_calls: Arc<AtomicU64>,
    clock: Arc<C>,
}

impl<C: Clock> fmt::Debug for CircuitBreaker<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("CircuitBreaker")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("state", &inner.state)
            .field("failure_count", &inner.failure_count)
            .finish()
    }
}

impl<C: Clock> Clone for CircuitBreaker<C> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            config: self.config.clone(),
            inner: Arc::clone(&self.inner),
            total_calls: Arc::clone(&self.total_calls),
            rejected_calls: Arc::clone(&self.rejected_calls),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl CircuitBreaker<SystemClock> {
    /// Create a new circuit breaker with the given configuration using system
    /// clock
    ///
    /// # Errors
    ///
    /// Returns [`CommonError::Config`] if the configuration is invalid.
    pub fn new(config: CircuitBreakerConfig) -> CommonResult<Self> {
        Self::with_clock(config, SystemClock)
    }

    /// Create a circuit breaker using the builder pattern
    pub fn builder() -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfigBuilder::new()
    }
}

impl<C: Clock> CircuitBreaker<C> {
    /// Create a new circuit breaker with a custom clock (useful for testing)
    ///
    /// # Errors
    ///
    /// Returns [`CommonError::Config`] if the configuration is invalid.
    pub fn with_clock(config: CircuitBreakerConfig, clock: C) -> CommonResult<Self> {
        config.validate()?;

        let now = clock.now();
        Ok(Self {
            name: Arc::from("default"),
            config,
            inner: Arc::new(Mutex::new(BreakerState {
                state: CircuitState::Closed,
                failure_count: 0,
                last_failure: None,
                half_open_successes: 0,
                half_open_in_flight: 0,
                generation: 0,
                state_changed_at: now,
            })),
            total_calls: Arc::new(AtomicU64::new(0)),
            rejected_calls: Arc::new(AtomicU64::new(0)),
            clock: Arc::new(clock),
        })
    }

    /// Name the protected dependency (used in logs and `CircuitOpen` errors)
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Arc::from(name.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Execute an operation with circuit breaker protection
    ///
    /// # Errors
    ///
    /// [`ResilienceError::CircuitOpen`] without invoking `operation` when the
    /// circuit is open, or [`ResilienceError::OperationFailed`] carrying the
    /// operation's own error.
    #[instrument(skip_all, fields(breaker = %self.name))]
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> ResilienceResult<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::error::Error + Send + Sync + 'static,
    {
        let admission = match self.try_acquire() {
            Ok(admission) => admission,
            Err(retry_after) => {
                self.rejected_calls.fetch_add(1, Ordering::Relaxed);
                debug!(retry_after_ms = duration_millis(retry_after), "circuit open, rejecting call");
                return Err(ResilienceError::CircuitOpen {
                    service: self.name.to_string(),
                    retry_after,
                });
            }
        };

        self.total_calls.fetch_add(1, Ordering::Relaxed);
        let generation = admission.generation;
        let _trial = admission.trial.then(|| TrialPermit { breaker: self, generation });

        match operation().await {
            Ok(result) => {
                self.on_success(generation);
                Ok(result)
            }
            Err(error) => {
                self.on_failure(generation);
                debug!(%error, "operation failed through circuit breaker");
                Err(ResilienceError::OperationFailed { source: error })
            }
        }
    }

    /// Admit a call, or return how long the caller should wait.
    fn try_acquire(&self) -> Result<Admission, Duration> {
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::Closed => Ok(Admission { generation: inner.generation, trial: false }),
            CircuitState::HalfOpen => {
                if inner.half_open_in_flight >= self.config.half_open_successes_required {
                    return Err(Duration::ZERO);
                }
                inner.half_open_in_flight += 1;
                Ok(Admission { generation: inner.generation, trial: true })
            }
            CircuitState::Open => {
                let now = self.clock.now();
                let since_failure =
                    inner.last_failure.map_or(self.config.reset_timeout, |t| now.saturating_duration_since(t));

                if since_failure >= self.config.reset_timeout {
                    inner.half_open_successes = 0;
                    inner.transition(CircuitState::HalfOpen, now);
                    inner.half_open_in_flight = 1;
                    info!(breaker = %self.name, "circuit half-open, probing");
                    Ok(Admission { generation: inner.generation, trial: true })
                } else {
                    Err(self.config.reset_timeout - since_failure)
                }
            }
        }
    }

    fn on_success(&self, generation: u64) {
        let mut inner = self.inner.lock();
        if inner.generation != generation {
            debug!(breaker = %self.name, "ignoring success from a stale admission");
            return;
        }

        match inner.state {
            CircuitState::Closed => inner.failure_count = 0,
            CircuitState::HalfOpen => {
                inner.half_open_successes += 1;
                if inner.half_open_successes >= self.config.half_open_successes_required {
                    let successes = inner.half_open_successes;
                    inner.failure_count = 0;
                    inner.half_open_successes = 0;
                    inner.last_failure = None;
                    inner.transition(CircuitState::Closed, self.clock.now());
                    info!(breaker = %self.name, successes, "circuit closed");
                }
            }
            CircuitState::Open => {}
        }
    }

    fn on_failure(&self, generation: u64) {
        let mut inner = self.inner.lock();
        if inner.generation != generation {
            debug!(breaker = %self.name, "ignoring failure from a stale admission");
            return;
        }

        let now = self.clock.now();
        match inner.state {
            CircuitState::Closed => {
                inner.failure_count = inner.failure_count.saturating_add(1);
                inner.last_failure = Some(now);
                if inner.failure_count >= self.config.failure_threshold {
                    inner.transition(CircuitState::Open, now);
                    warn!(
                        breaker = %self.name,
                        failures = inner.failure_count,
                        "circuit opened after consecutive failures"
                    );
                }
            }
            CircuitState::HalfOpen => {
                inner.failure_count = inner.failure_count.saturating_add(1);
                inner.last_failure = Some(now);
                inner.half_open_successes = 0;
                inner.transition(CircuitState::Open, now);
                warn!(breaker = %self.name, "probe failed, circuit reopened");
            }
            CircuitState::Open => {}
        }
    }

    /// Get the current state without triggering any transition
    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    /// Get current metrics snapshot
    pub fn metrics(&self) -> CircuitBreakerMetrics {
        let inner = self.inner.lock();
        CircuitBreakerMetrics {
            state: inner.state,
            failure_count: inner.failure_count,
            half_open_successes: inner.half_open_successes,
            total_calls: self.total_calls.load(Ordering::Acquire),
            rejected_calls: self.rejected_calls.load(Ordering::Acquire),
            last_failure: inner.last_failure,
            state_changed_at: inner.state_changed_at,
        }
    }

    /// Reset the circuit breaker to closed state
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.failure_count = 0;
        inner.half_open_successes = 0;
        inner.last_failure = None;
        inner.transition(CircuitState::Closed, self.clock.now());
        info!(breaker = %self.name, "circuit breaker manually reset to closed state");
    }
}

struct Admission {
    generation: u64,
    trial: bool,
}

/// Frees a HalfOpen trial slot when the call finishes or is dropped
struct TrialPermit<'a, C: Clock> {
    breaker: &'a CircuitBreaker<C>,
    generation: u64,
}

impl<C: Clock> Drop for TrialPermit<'_, C> {
    fn drop(&mut self) {
        let mut inner = self.breaker.inner.lock();
        if inner.generation == self.generation {
            inner.half_open_in_flight = inner.half_open_in_flight.saturating_sub(1);
        }
    }
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
