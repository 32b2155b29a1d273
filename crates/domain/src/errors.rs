//! Error types used throughout the domain

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for dotclaude domain operations
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum DotclaudeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for dotclaude domain operations
pub type Result<T> = std::result::Result<T, DotclaudeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_tagged() {
        let err = DotclaudeError::InvalidInput("bad repo".into());
        let json = serde_json::to_string(&err).unwrap();
        assert_eq!(json, r#"{"type":"InvalidInput","message":"bad repo"}"#);
        assert_eq!(err.to_string(), "Invalid input: bad repo");
    }
}
