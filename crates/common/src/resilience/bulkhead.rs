//! Bulkhead pattern for limiting concurrent operations
//!
//! A bulkhead caps how many operations run at once. Operations beyond the cap
//! wait for a free slot instead of being rejected, so a batch of downloads
//! drains through a fixed-size pool.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{debug, instrument, warn};

use crate::error::{CommonError, CommonResult};

/// Configuration for bulkhead behavior
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkheadConfig {
    /// Maximum number of concurrent operations allowed
    pub max_concurrent: usize,
}

impl Default for BulkheadConfig {
    fn default() -> Self {
        Self { max_concurrent: 4 }
    }
}

impl BulkheadConfig {
    pub fn new(max_concurrent: usize) -> Self {
        Self { max_concurrent }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns [`CommonError::Config`] when `max_concurrent` is zero.
    pub fn validate(&self) -> CommonResult<()> {
        if self.max_concurrent == 0 {
            return Err(CommonError::config_field("max_concurrent", "must be greater than 0"));
        }
        Ok(())
    }
}

/// Metrics for bulkhead monitoring
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkheadMetrics {
    /// Operations that have acquired a slot
    pub total_operations: u64,
    /// Operations currently holding a slot
    pub current_concurrent: usize,
    /// Maximum concurrent operations allowed
    pub max_concurrent: usize,
}

impl BulkheadMetrics {
    /// Check if the bulkhead is at capacity
    pub fn is_at_capacity(&self) -> bool {
        self.current_concurrent >= self.max_concurrent
    }
}

/// Bulkhead for limiting concurrent operations
///
/// # Examples
///
/// ```rust
/// use dotclaude_common::resilience::{Bulkhead, BulkheadConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let bulkhead = Bulkhead::new(BulkheadConfig::new(5))?;
///
/// let result = bulkhead.execute(|| async { Ok::<_, std::io::Error>("Success") }).await?;
/// assert_eq!(result, "Success");
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Bulkhead {
    config: BulkheadConfig,
    semaphore: Arc<Semaphore>,
    total_operations: Arc<AtomicU64>,
}

impl Bulkhead {
    /// Create a new bulkhead with the given configuration
    ///
    /// # Errors
    ///
    /// Returns [`CommonError::Config`] if the configuration is invalid.
    pub fn new(config: BulkheadConfig) -> CommonResult<Self> {
        config.validate()?;

        Ok(Self {
            semaphore: Arc::new(Semaphore::new(config.max_concurrent)),
            total_operations: Arc::new(AtomicU64::new(0)),
            config,
        })
    }

    /// Execute an operation once a slot is free
    ///
    /// The slot is released when the operation's future completes or is
    /// dropped.
    #[instrument(skip_all, fields(max_concurrent = self.config.max_concurrent))]
    pub async fn execute<F, Fut, T>(&self, operation: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let _permit = match self.semaphore.acquire().await {
            Ok(permit) => Some(permit),
            Err(_) => {
                // Only reachable if the semaphore was closed, which this type never does
                warn!("bulkhead semaphore closed, running without a slot");
                None
            }
        };

        self.total_operations.fetch_add(1, Ordering::Relaxed);
        debug!(concurrent = self.current_concurrent(), "bulkhead slot acquired");

        operation().await
    }

    /// Get the current number of concurrent operations
    pub fn current_concurrent(&self) -> usize {
        self.config.max_concurrent.saturating_sub(self.semaphore.available_permits())
    }

    /// Get bulkhead metrics
    pub fn metrics(&self) -> BulkheadMetrics {
        BulkheadMetrics {
            total_operations: self.total_operations.load(Ordering::Acquire),
            current_concurrent: self.current_concurrent(),
            max_concurrent: self.config.max_concurrent,
        }
    }
}

impl fmt::Debug for Bulkhead {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bulkhead")
            .field("max_concurrent", &self.config.max_concurrent)
            .field("current_concurrent", &self.current_concurrent())
            .finish()
    }
}
