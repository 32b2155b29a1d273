//! Common error types and classification shared across dotclaude crates
//!
//! The error handling system is built on three pieces:
//!
//! 1. **`CommonError`**: error variants that show up in more than one crate
//!    (configuration, validation, timeouts, internal invariants).
//!
//! 2. **`ErrorClassification` trait**: the interface retry logic uses to
//!    decide whether a failure is worth another attempt. Every error that
//!    can reach a retry executor implements it at the point where it is
//!    constructed, so classification is a match on an explicit
//!    [`ErrorCategory`] rather than inspection of ad hoc fields.
//!
//! 3. **`ErrorSeverity`**: a unified severity level for logging.
//!
//! ## Retryable categories
//!
//! | Category | Retryable | Typical origin |
//! |----------|-----------|----------------|
//! | `Transport(ConnectionReset / ConnectionRefused / Timeout / DnsFailure)` | yes | socket layer |
//! | `Transport(Other)` | no | malformed request, TLS setup |
//! | `ServerFault` | yes | HTTP 5xx |
//! | `RateLimited` | yes | HTTP 429, provider rate-limit signal |
//! | `ResourceExhausted` | yes | too many open files |
//! | `NotFound`, `ClientFault`, `Permission`, `Validation`, `Config`, `Internal` | no | |
//!
//! An error may also opt in explicitly through
//! [`ErrorClassification::is_recoverable`], which overrides the category.
//!
//! ## Example
//!
//! ```rust
//! use dotclaude_common::error::{ErrorCategory, ErrorClassification, TransportFailure};
//!
//! #[derive(Debug)]
//! struct Flaky;
//!
//! impl ErrorClassification for Flaky {
//!     fn category(&self) -> ErrorCategory {
//!         ErrorCategory::Transport(TransportFailure::ConnectionReset)
//!     }
//! }
//!
//! assert!(Flaky.is_retryable());
//! ```

use std::fmt;
use std::io;
use std::time::Duration;

/// Standard result type using CommonError
pub type CommonResult<T> = Result<T, CommonError>;

/// Common error variants that appear across multiple crates
#[derive(Debug, Clone, PartialEq)]
pub enum CommonError {
    /// Configuration-related errors
    Config { message: String, field: Option<String> },

    /// Invalid argument or constraint violation
    Validation { field: String, message: String, value: Option<String> },

    /// Timeout errors
    Timeout { operation: String, duration: Duration },

    /// Internal errors that shouldn't normally occur
    Internal { message: String, context: Option<String> },
}

impl fmt::Display for CommonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config { message, field } => {
                if let Some(field) = field {
                    write!(f, "Configuration error in field '{}': {}", field, message)
                } else {
                    write!(f, "Configuration error: {}", message)
                }
            }
            Self::Validation { field, message, value } => {
                if let Some(value) = value {
                    write!(
                        f,
                        "Validation error for field '{}' (value: '{}'): {}",
                        field, value, message
                    )
                } else {
                    write!(f, "Validation error for field '{}': {}", field, message)
                }
            }
            Self::Timeout { operation, duration } => {
                write!(f, "Operation '{}' timed out after {:?}", operation, duration)
            }
            Self::Internal { message, context } => {
                if let Some(ctx) = context {
                    write!(f, "Internal error in '{}': {}", ctx, message)
                } else {
                    write!(f, "Internal error: {}", message)
                }
            }
        }
    }
}

impl std::error::Error for CommonError {}

impl CommonError {
    /// Create a simple configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config { message: message.into(), field: None }
    }

    /// Create a configuration error for a specific field
    pub fn config_field<S: Into<String>, F: Into<String>>(field: F, message: S) -> Self {
        Self::Config { message: message.into(), field: Some(field.into()) }
    }

    /// Create a validation error
    pub fn validation<F: Into<String>, M: Into<String>>(field: F, message: M) -> Self {
        Self::Validation { field: field.into(), message: message.into(), value: None }
    }

    /// Create a validation error with the invalid value
    pub fn validation_with_value<F: Into<String>, M: Into<String>, V: Into<String>>(
        field: F,
        message: M,
        value: V,
    ) -> Self {
        Self::Validation { field: field.into(), message: message.into(), value: Some(value.into()) }
    }

    /// Create a timeout error
    pub fn timeout<S: Into<String>>(operation: S, duration: Duration) -> Self {
        Self::Timeout { operation: operation.into(), duration }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal { message: message.into(), context: None }
    }

    /// Create an internal error with context
    pub fn internal_with_context<S: Into<String>, C: Into<String>>(message: S, context: C) -> Self {
        Self::Internal { message: message.into(), context: Some(context.into()) }
    }
}

impl ErrorClassification for CommonError {
    fn category(&self) -> ErrorCategory {
        match self {
            Self::Config { .. } => ErrorCategory::Config,
            Self::Validation { .. } => ErrorCategory::Validation,
            Self::Timeout { .. } => ErrorCategory::Transport(TransportFailure::Timeout),
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }
}

/// Error severity levels for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorSeverity {
    /// Expected condition, informational only
    Info,
    /// Degraded but operational (transient failures, throttling)
    Warning,
    /// Failure requiring attention
    Error,
    /// Integrity at risk
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARNING"),
            Self::Error => write!(f, "ERROR"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Network-level failure kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportFailure {
    /// Peer reset or aborted the connection
    ConnectionReset,
    /// Nothing listening at the remote address
    ConnectionRefused,
    /// Connect, read or attempt deadline elapsed
    Timeout,
    /// Host name could not be resolved
    DnsFailure,
    /// Any other transport problem (TLS setup, malformed request, ...)
    Other,
}

impl TransportFailure {
    /// Only the reset/refused/timeout/DNS set is worth retrying.
    pub fn is_retryable(self) -> bool {
        !matches!(self, Self::Other)
    }
}

impl fmt::Display for TransportFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::ConnectionReset => "connection reset",
            Self::ConnectionRefused => "connection refused",
            Self::Timeout => "timeout",
            Self::DnsFailure => "DNS failure",
            Self::Other => "transport failure",
        };
        f.write_str(label)
    }
}

/// Classification bucket for a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Network transport failed
    Transport(TransportFailure),
    /// Remote service signalled a rate limit
    RateLimited,
    /// Remote service failed (HTTP 5xx)
    ServerFault,
    /// Requested resource does not exist
    NotFound,
    /// Request rejected by the remote service (4xx other than rate limits)
    ClientFault,
    /// Access denied, locally or remotely
    Permission,
    /// Process ran out of a local resource (too many open files)
    ResourceExhausted,
    /// Input failed validation
    Validation,
    /// Invalid configuration
    Config,
    /// Invariant violation
    Internal,
}

impl ErrorCategory {
    /// Whether failures in this category are transient.
    pub fn is_retryable(self) -> bool {
        match self {
            Self::Transport(kind) => kind.is_retryable(),
            Self::RateLimited | Self::ServerFault | Self::ResourceExhausted => true,
            Self::NotFound
            | Self::ClientFault
            | Self::Permission
            | Self::Validation
            | Self::Config
            | Self::Internal => false,
        }
    }

    /// Severity used when the error type does not override it.
    pub fn default_severity(self) -> ErrorSeverity {
        match self {
            Self::NotFound => ErrorSeverity::Info,
            Self::Transport(_) | Self::RateLimited | Self::ResourceExhausted => {
                ErrorSeverity::Warning
            }
            Self::ServerFault
            | Self::ClientFault
            | Self::Permission
            | Self::Validation
            | Self::Config => ErrorSeverity::Error,
            Self::Internal => ErrorSeverity::Critical,
        }
    }

    /// Map an HTTP status code without looking at headers or body.
    ///
    /// Callers that can detect provider-specific rate-limit signals (for
    /// example a 403 carrying exhausted quota headers) should refine the
    /// result themselves.
    pub fn from_http_status(status: u16) -> Self {
        match status {
            429 => Self::RateLimited,
            404 | 410 => Self::NotFound,
            401 | 403 => Self::Permission,
            400..=499 => Self::ClientFault,
            500..=599 => Self::ServerFault,
            _ => Self::Internal,
        }
    }

    /// Map an I/O error by kind, treating "too many open files" as a
    /// transient resource shortage rather than a permission problem.
    pub fn from_io_error(error: &io::Error) -> Self {
        if is_too_many_open_files(error) {
            return Self::ResourceExhausted;
        }

        match error.kind() {
            io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe => Self::Transport(TransportFailure::ConnectionReset),
            io::ErrorKind::ConnectionRefused => {
                Self::Transport(TransportFailure::ConnectionRefused)
            }
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => {
                Self::Transport(TransportFailure::Timeout)
            }
            io::ErrorKind::NotFound => Self::NotFound,
            io::ErrorKind::PermissionDenied => Self::Permission,
            io::ErrorKind::InvalidInput | io::ErrorKind::InvalidData => Self::Validation,
            _ => Self::Internal,
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(kind) => write!(f, "transport ({kind})"),
            Self::RateLimited => f.write_str("rate limited"),
            Self::ServerFault => f.write_str("server fault"),
            Self::NotFound => f.write_str("not found"),
            Self::ClientFault => f.write_str("client fault"),
            Self::Permission => f.write_str("permission denied"),
            Self::ResourceExhausted => f.write_str("resource exhausted"),
            Self::Validation => f.write_str("validation"),
            Self::Config => f.write_str("configuration"),
            Self::Internal => f.write_str("internal"),
        }
    }
}

#[cfg(unix)]
fn is_too_many_open_files(error: &io::Error) -> bool {
    // EMFILE (per process) and ENFILE (system wide)
    matches!(error.raw_os_error(), Some(23 | 24))
}

#[cfg(windows)]
fn is_too_many_open_files(error: &io::Error) -> bool {
    // ERROR_TOO_MANY_OPEN_FILES
    matches!(error.raw_os_error(), Some(4))
}

#[cfg(not(any(unix, windows)))]
fn is_too_many_open_files(_error: &io::Error) -> bool {
    false
}

/// Standard interface for classifying errors by their characteristics
///
/// Only [`category`](Self::category) is required. Retry executors consult
/// [`is_retryable`](Self::is_retryable) and [`retry_after`](Self::retry_after).
pub trait ErrorClassification {
    /// The taxonomy bucket this error belongs to
    fn category(&self) -> ErrorCategory;

    /// Explicit "recoverable" marker set where the error originated.
    ///
    /// Returning `true` makes the error retryable regardless of category.
    fn is_recoverable(&self) -> bool {
        false
    }

    /// Check if this error is retryable
    fn is_retryable(&self) -> bool {
        self.is_recoverable() || self.category().is_retryable()
    }

    /// Get the error severity level
    fn severity(&self) -> ErrorSeverity {
        self.category().default_severity()
    }

    /// Check if this is a critical error requiring immediate attention
    fn is_critical(&self) -> bool {
        self.severity() == ErrorSeverity::Critical
    }

    /// Suggested minimum delay before retrying, if the origin provided one
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

impl ErrorClassification for io::Error {
    fn category(&self) -> ErrorCategory {
        ErrorCategory::from_io_error(self)
    }
}

impl<T: ErrorClassification + ?Sized> ErrorClassification for Box<T> {
    fn category(&self) -> ErrorCategory {
        (**self).category()
    }

    fn is_recoverable(&self) -> bool {
        (**self).is_recoverable()
    }

    fn is_retryable(&self) -> bool {
        (**self).is_retryable()
    }

    fn severity(&self) -> ErrorSeverity {
        (**self).severity()
    }

    fn retry_after(&self) -> Option<Duration> {
        (**self).retry_after()
    }
}
