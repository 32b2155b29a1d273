//! Circuit breaker wrapped around a retry executor
//!
//! [`ResilientExecutor`] composes the two primitives in the only order that
//! makes sense for a shared dependency: the breaker decides whether a logical
//! call is attempted at all, the retry executor runs its attempts, and the
//! breaker records the aggregate outcome once.

use std::fmt;
use std::future::Future;

use tracing::instrument;

use super::circuit_breaker::{CircuitBreaker, ResilienceError};
use super::clock::{Clock, SystemClock};
use super::config::ResilienceConfig;
use super::retry::{
    policies, AttemptTimeout, NoopObserver, RetryError, RetryExecutor, RetryObserver, RetryPolicy,
};
use crate::error::CommonResult;

/// Breaker-then-retry executor for one remote dependency
#[derive(Debug, Clone)]
pub struct ResilientExecutor<P = policies::Classified, O = NoopObserver, C: Clock = SystemClock> {
    breaker: CircuitBreaker<C>,
    retry: RetryExecutor<P, O>,
}

impl ResilientExecutor {
    /// Build a fresh breaker and retry executor from flat settings
    ///
    /// # Errors
    ///
    /// Returns [`CommonError::Config`](crate::error::CommonError::Config)
    /// if any setting is out of range.
    pub fn from_config(config: &ResilienceConfig, name: impl Into<String>) -> CommonResult<Self> {
        let breaker = CircuitBreaker::new(config.circuit_breaker_config()?)?.with_name(name);
        let retry = RetryExecutor::new(config.retry_config()?);
        Ok(Self::new(breaker, retry))
    }
}

impl<P, O, C: Clock> ResilientExecutor<P, O, C> {
    /// Compose an existing breaker (possibly shared) with a retry executor
    pub fn new(breaker: CircuitBreaker<C>, retry: RetryExecutor<P, O>) -> Self {
        Self { breaker, retry }
    }

    /// Replace the retry observer
    pub fn with_observer<O2>(self, observer: O2) -> ResilientExecutor<P, O2, C> {
        ResilientExecutor { breaker: self.breaker, retry: self.retry.with_observer(observer) }
    }

    pub fn breaker(&self) -> &CircuitBreaker<C> {
        &self.breaker
    }

    pub fn retry(&self) -> &RetryExecutor<P, O> {
        &self.retry
    }

    /// Run `operation` through the breaker and the retry loop
    ///
    /// # Errors
    ///
    /// `CircuitOpen` if the breaker short-circuits, otherwise
    /// `OperationFailed` wrapping the retry executor's terminal error.
    #[instrument(skip_all, fields(breaker = %self.breaker.name()))]
    pub async fn execute<F, Fut, T, E>(
        &self,
        operation: F,
    ) -> Result<T, ResilienceError<RetryError<E>>>
    where
        P: RetryPolicy<E>,
        O: RetryObserver<E>,
        E: std::error::Error + From<AttemptTimeout> + Send + Sync + 'static,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.breaker.execute(|| self.retry.execute(operation)).await
    }
}

impl<P, O, C: Clock> fmt::Display for ResilientExecutor<P, O, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.breaker.name(), self.breaker.state())
    }
}
