//! Installer error taxonomy
//!
//! Every failure is tagged where it happens (HTTP layer, filesystem layer,
//! configuration) and classified through [`ErrorClassification`], which is
//! what the retry policy consults.

mod conversions;

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use dotclaude_common::error::{ErrorCategory, ErrorClassification, TransportFailure};
use thiserror::Error;

/// Failure of an install step
#[derive(Debug, Error)]
pub enum InstallError {
    #[error("{failure} talking to {target}: {message}")]
    Transport { failure: TransportFailure, target: String, message: String },

    #[error("GitHub rate limit exceeded ({url})")]
    RateLimited { url: String, retry_after: Option<Duration> },

    #[error("GitHub returned HTTP {status} for {url}")]
    ServerFault { status: u16, url: String, retry_after: Option<Duration> },

    #[error("not found: {url}")]
    NotFound { url: String },

    #[error("request rejected with HTTP {status} for {url}: {message}")]
    ClientFault { status: u16, url: String, message: String },

    #[error("access denied (HTTP {status}) for {url}")]
    Permission { status: u16, url: String },

    #[error("cannot write {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unexpected response from {url}: {message}")]
    Decode { url: String, message: String },

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("configuration error: {0}")]
    Config(String),

    /// Every attempt failed; `source` is the last failure
    #[error("gave up after {attempts} attempts: {source}")]
    Exhausted {
        attempts: u32,
        #[source]
        source: Box<InstallError>,
    },

    /// Short-circuited by the circuit breaker; nothing was attempted
    #[error("GitHub is temporarily unavailable ('{service}' circuit open, retry in {}s)", retry_after.as_secs())]
    CircuitOpen { service: String, retry_after: Duration },
}

/// Result alias for installer operations
pub type InstallResult<T> = Result<T, InstallError>;

impl InstallError {
    pub fn filesystem(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Filesystem { path: path.into(), source }
    }

    /// The innermost failure, looking through `Exhausted`
    pub fn root_cause(&self) -> &Self {
        match self {
            Self::Exhausted { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Human-readable advice for the person running the installer
    pub fn guidance(&self) -> &'static str {
        match self.root_cause() {
            Self::RateLimited { .. } => {
                "GitHub rate limit reached. Wait a few minutes, or set GITHUB_TOKEN to raise the limit."
            }
            Self::NotFound { .. } => {
                "Nothing found at that location. Check the repository, branch and path (--repo, --branch, --path)."
            }
            Self::Permission { .. } => {
                "Access denied. Private repositories need a GITHUB_TOKEN with read access."
            }
            Self::CircuitOpen { .. } => {
                "GitHub is currently unavailable after repeated failures. Try again in a minute."
            }
            Self::ServerFault { .. } => "GitHub is having trouble right now. Try again later.",
            Self::Transport { .. } => "Could not reach GitHub. Check your network connection and proxy settings.",
            Self::Filesystem { source, .. } => {
                if ErrorCategory::from_io_error(source) == ErrorCategory::ResourceExhausted {
                    "Too many open files. Lower --parallelism and try again."
                } else {
                    "Check that the target directory exists and is writable."
                }
            }
            Self::Config(_) | Self::Validation(_) => "Fix the reported setting and run again.",
            Self::ClientFault { .. } | Self::Decode { .. } | Self::Exhausted { .. } => {
                "Unexpected response from GitHub. Run with -v for details."
            }
        }
    }
}

impl ErrorClassification for InstallError {
    fn category(&self) -> ErrorCategory {
        match self {
            Self::Transport { failure, .. } => ErrorCategory::Transport(*failure),
            Self::RateLimited { .. } => ErrorCategory::RateLimited,
            Self::ServerFault { .. } | Self::CircuitOpen { .. } => ErrorCategory::ServerFault,
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::ClientFault { .. } | Self::Decode { .. } => ErrorCategory::ClientFault,
            Self::Permission { .. } => ErrorCategory::Permission,
            Self::Filesystem { source, .. } => ErrorCategory::from_io_error(source),
            Self::Validation(_) => ErrorCategory::Validation,
            Self::Config(_) => ErrorCategory::Config,
            Self::Exhausted { source, .. } => source.category(),
        }
    }

    fn is_retryable(&self) -> bool {
        match self {
            Self::Exhausted { .. } | Self::CircuitOpen { .. } => false,
            other => other.category().is_retryable(),
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after, .. } | Self::ServerFault { retry_after, .. } => {
                *retry_after
            }
            Self::CircuitOpen { retry_after, .. } => Some(*retry_after),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Validates the retryable split between transient and terminal
    /// failures.
    ///
    /// Assertions:
    /// - Rate limits, server faults and reset connections are retryable.
    /// - Not found, permission and TLS-style transport failures are not.
    /// - Synthesized `Exhausted` and `CircuitOpen` are never retried.
    #[test]
    fn test_retryable_split() {
        let retryable = [
            InstallError::RateLimited { url: "u".into(), retry_after: None },
            InstallError::ServerFault { status: 502, url: "u".into(), retry_after: None },
            InstallError::Transport {
                failure: TransportFailure::ConnectionReset,
                target: "u".into(),
                message: "reset".into(),
            },
        ];
        for err in &retryable {
            assert!(err.is_retryable(), "{err}");
        }

        let terminal = [
            InstallError::NotFound { url: "u".into() },
            InstallError::Permission { status: 401, url: "u".into() },
            InstallError::Transport {
                failure: TransportFailure::Other,
                target: "u".into(),
                message: "invalid certificate".into(),
            },
            InstallError::Exhausted {
                attempts: 5,
                source: Box::new(InstallError::ServerFault {
                    status: 503,
                    url: "u".into(),
                    retry_after: None,
                }),
            },
            InstallError::CircuitOpen { service: "github".into(), retry_after: Duration::from_secs(60) },
        ];
        for err in &terminal {
            assert!(!err.is_retryable(), "{err}");
        }
    }

    /// Validates guidance looks through `Exhausted` to the last failure.
    #[test]
    fn test_guidance_uses_root_cause() {
        let err = InstallError::Exhausted {
            attempts: 3,
            source: Box::new(InstallError::RateLimited { url: "u".into(), retry_after: None }),
        };
        assert!(err.guidance().contains("GITHUB_TOKEN"));
        assert_eq!(err.category(), ErrorCategory::RateLimited);
    }

    /// Validates too-many-open-files is retryable and gets its own advice.
    #[cfg(unix)]
    #[test]
    fn test_too_many_open_files() {
        let err = InstallError::filesystem("/tmp/x", io::Error::from_raw_os_error(24));
        assert!(err.is_retryable());
        assert!(err.guidance().contains("--parallelism"));

        let denied = InstallError::filesystem("/tmp/x", io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(!denied.is_retryable());
    }
}
