//! Shared building blocks for the dotclaude crates.
//!
//! # Feature Tiers
//!
//! Enable cargo features to opt into the tiers you need:
//! - `foundation`: error taxonomy, classification trait, serde helpers
//! - `observability`: tracing instrumentation (implied by `runtime`)
//! - `runtime`: async resilience primitives (backoff, retry, circuit
//!   breaker, bulkhead)

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Foundation tier
// -----------------------------------------------------------------
#[cfg(feature = "foundation")]
pub mod error;
#[cfg(feature = "foundation")]
pub mod utils;

// Runtime tier
// --------------------------------------------------------------------
#[cfg(feature = "runtime")]
pub mod resilience;

// Re-export commonly used types and traits for convenience
// ------------------------
#[cfg(feature = "foundation")]
pub use error::{
    CommonError, CommonResult, ErrorCategory, ErrorClassification, ErrorSeverity,
    TransportFailure,
};
#[cfg(feature = "runtime")]
pub use resilience::{
    policies, AttemptOutcome, AttemptTimeout, Backoff, Bulkhead, BulkheadConfig, CircuitBreaker,
    CircuitBreakerConfig, CircuitBreakerConfigBuilder, CircuitBreakerMetrics, CircuitState, Clock,
    MockClock, NoopObserver, ResilienceConfig, ResilienceError, ResilienceResult,
    ResilientExecutor, RetryConfig, RetryConfigBuilder, RetryDecision, RetryError, RetryExecutor,
    RetryObserver, RetryOutcome, RetryPolicy, RetryResult, SystemClock, TracingObserver,
};
#[cfg(feature = "foundation")]
pub use utils::serde::duration_millis;
