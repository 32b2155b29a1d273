//! Conversions from external and lower-layer errors into [`InstallError`].

use std::error::Error as StdError;
use std::io;

use dotclaude_common::error::{CommonError, TransportFailure};
use dotclaude_common::resilience::{AttemptTimeout, ResilienceError, RetryError};
use dotclaude_domain::DotclaudeError;

use super::InstallError;

/* -------------------------------------------------------------------------- */
/* reqwest::Error → InstallError */
/* -------------------------------------------------------------------------- */

impl InstallError {
    /// Tag a transport-level reqwest failure for `target`
    pub fn from_reqwest(err: &reqwest::Error, target: &str) -> Self {
        if err.is_builder() {
            return Self::Config(format!("invalid request to {target}: {err}"));
        }
        if err.is_decode() {
            return Self::Decode { url: target.to_string(), message: err.to_string() };
        }

        Self::Transport {
            failure: classify_transport(err),
            target: target.to_string(),
            message: describe_chain(err),
        }
    }
}

/// Map a reqwest failure onto a transport failure kind
///
/// reqwest only exposes coarse flags, so the source chain is searched for an
/// `io::Error` and for resolver messages.
pub(crate) fn classify_transport(err: &reqwest::Error) -> TransportFailure {
    if err.is_timeout() {
        return TransportFailure::Timeout;
    }

    let mut current: Option<&(dyn StdError + 'static)> = err.source();
    while let Some(cause) = current {
        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            match io_err.kind() {
                io::ErrorKind::ConnectionReset
                | io::ErrorKind::ConnectionAborted
                | io::ErrorKind::BrokenPipe
                | io::ErrorKind::UnexpectedEof => return TransportFailure::ConnectionReset,
                io::ErrorKind::ConnectionRefused => return TransportFailure::ConnectionRefused,
                io::ErrorKind::TimedOut => return TransportFailure::Timeout,
                _ => {}
            }
        }

        let message = cause.to_string().to_ascii_lowercase();
        if message.contains("dns error")
            || message.contains("failed to lookup address")
            || message.contains("name or service not known")
            || message.contains("no such host")
        {
            return TransportFailure::DnsFailure;
        }
        if message.contains("connection reset") || message.contains("connection closed") {
            return TransportFailure::ConnectionReset;
        }

        current = cause.source();
    }

    if err.is_body() {
        TransportFailure::ConnectionReset
    } else if err.is_connect() {
        TransportFailure::ConnectionRefused
    } else {
        TransportFailure::Other
    }
}

fn describe_chain(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut current = err.source();
    while let Some(cause) = current {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        current = cause.source();
    }
    message
}

/* -------------------------------------------------------------------------- */
/* resilience errors → InstallError */
/* -------------------------------------------------------------------------- */

impl From<AttemptTimeout> for InstallError {
    fn from(timeout: AttemptTimeout) -> Self {
        Self::Transport {
            failure: TransportFailure::Timeout,
            target: format!("attempt {}", timeout.attempt),
            message: timeout.to_string(),
        }
    }
}

impl From<RetryError<InstallError>> for InstallError {
    fn from(err: RetryError<InstallError>) -> Self {
        match err {
            RetryError::Exhausted { attempts, source } => {
                Self::Exhausted { attempts, source: Box::new(source) }
            }
            RetryError::NonRetryable { source, .. } => source,
        }
    }
}

impl From<ResilienceError<RetryError<InstallError>>> for InstallError {
    fn from(err: ResilienceError<RetryError<InstallError>>) -> Self {
        match err {
            ResilienceError::CircuitOpen { service, retry_after } => {
                Self::CircuitOpen { service, retry_after }
            }
            ResilienceError::OperationFailed { source } => source.into(),
        }
    }
}

/* -------------------------------------------------------------------------- */
/* domain / common errors → InstallError */
/* -------------------------------------------------------------------------- */

impl From<DotclaudeError> for InstallError {
    fn from(err: DotclaudeError) -> Self {
        match err {
            DotclaudeError::Config(message) => Self::Config(message),
            DotclaudeError::InvalidInput(message) => Self::Validation(message),
            DotclaudeError::NotFound(what) => Self::NotFound { url: what },
            DotclaudeError::Internal(message) => Self::Config(format!("internal: {message}")),
        }
    }
}

impl From<CommonError> for InstallError {
    fn from(err: CommonError) -> Self {
        match err {
            CommonError::Validation { .. } => Self::Validation(err.to_string()),
            _ => Self::Config(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use dotclaude_common::error::ErrorClassification;

    use super::*;

    /// Validates the breaker/retry wrapper is flattened into the installer
    /// taxonomy.
    ///
    /// Assertions:
    /// - `CircuitOpen` keeps the service name and wait.
    /// - `Exhausted` keeps the attempt count and boxes the last failure.
    /// - `NonRetryable` unwraps to the original failure.
    #[test]
    fn test_flattens_resilience_errors() {
        let open: ResilienceError<RetryError<InstallError>> = ResilienceError::CircuitOpen {
            service: "github".into(),
            retry_after: Duration::from_secs(30),
        };
        assert!(matches!(
            InstallError::from(open),
            InstallError::CircuitOpen { ref service, retry_after } if service == "github" && retry_after == Duration::from_secs(30)
        ));

        let exhausted = ResilienceError::OperationFailed {
            source: RetryError::Exhausted {
                attempts: 4,
                source: InstallError::ServerFault { status: 503, url: "u".into(), retry_after: None },
            },
        };
        match InstallError::from(exhausted) {
            InstallError::Exhausted { attempts, source } => {
                assert_eq!(attempts, 4);
                assert!(matches!(*source, InstallError::ServerFault { status: 503, .. }));
            }
            other => panic!("expected Exhausted, got {other:?}"),
        }

        let terminal = ResilienceError::OperationFailed {
            source: RetryError::NonRetryable {
                attempts: 1,
                source: InstallError::NotFound { url: "u".into() },
            },
        };
        assert!(matches!(InstallError::from(terminal), InstallError::NotFound { .. }));
    }

    /// Validates a timed-out attempt becomes a retryable transport timeout.
    #[test]
    fn test_attempt_timeout_is_transport_timeout() {
        let err = InstallError::from(AttemptTimeout { attempt: 2, after: Duration::from_secs(30) });
        assert!(matches!(err, InstallError::Transport { failure: TransportFailure::Timeout, .. }));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_domain_errors() {
        let err = InstallError::from(DotclaudeError::InvalidInput("bad repo".into()));
        assert!(matches!(err, InstallError::Validation(_)));
    }
}
