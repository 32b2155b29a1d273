//! Resilience patterns for calls to unreliable remote dependencies
//!
//! Components, leaves first:
//! - **[`Backoff`]**: pure exponential delay calculator with optional jitter
//! - **[`RetryExecutor`]**: runs an async operation until success, a
//!   non-retryable error, or the attempt budget is spent
//! - **[`CircuitBreaker`]**: stops attempting calls after repeated failures
//!   and probes for recovery after a cooldown
//! - **[`ResilientExecutor`]**: breaker wrapping retry wrapping the operation
//! - **[`Bulkhead`]**: caps how many operations run concurrently
//!
//! Everything here is an explicit value owned by the caller. Share a breaker
//! by cloning its handle; there are no global instances.

pub mod backoff;
pub mod bulkhead;
pub mod circuit_breaker;
pub mod clock;
pub mod config;
pub mod executor;
pub mod retry;

pub use backoff::Backoff;
pub use bulkhead::{Bulkhead, BulkheadConfig, BulkheadMetrics};
pub use circuit_breaker::{
    CircuitBreaker, CircuitBreakerBuilderWithClock, CircuitBreakerConfig,
    CircuitBreakerConfigBuilder, CircuitBreakerMetrics, CircuitState, ResilienceError,
    ResilienceResult,
};
pub use clock::{Clock, MockClock, SystemClock};
pub use config::ResilienceConfig;
pub use executor::ResilientExecutor;
pub use retry::{
    policies, AttemptOutcome, AttemptTimeout, NoopObserver, RetryConfig, RetryConfigBuilder,
    RetryDecision, RetryError, RetryExecutor, RetryObserver, RetryOutcome, RetryPolicy,
    RetryResult, TracingObserver,
};
