//! Repository coordinates of a bundle

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_BRANCH, DEFAULT_SOURCE_PATH};
use crate::errors::{DotclaudeError, Result};

/// Where a bundle lives on GitHub
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoSource {
    pub owner: String,
    pub repo: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    /// Directory inside the repository holding the bundle
    #[serde(default = "default_path")]
    pub path: String,
}

fn default_branch() -> String {
    DEFAULT_BRANCH.to_string()
}

fn default_path() -> String {
    DEFAULT_SOURCE_PATH.to_string()
}

impl RepoSource {
    /// Create a source on the default branch and bundle path
    ///
    /// # Errors
    ///
    /// [`DotclaudeError::InvalidInput`] if owner or repo are not valid
    /// GitHub names.
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Result<Self> {
        let source = Self {
            owner: owner.into(),
            repo: repo.into(),
            branch: default_branch(),
            path: default_path(),
        };
        source.validate()?;
        Ok(source)
    }

    /// Parse `owner/repo`, `owner/repo@branch`, or a `https://github.com/...`
    /// URL (a trailing `.git` is ignored)
    ///
    /// # Errors
    ///
    /// [`DotclaudeError::InvalidInput`] when the text is not a repository
    /// reference.
    pub fn parse(reference: &str) -> Result<Self> {
        let reference = reference.trim();
        let (coordinates, branch) = match reference.rsplit_once('@') {
            Some((coordinates, branch)) if !branch.is_empty() => (coordinates, Some(branch)),
            _ => (reference, None),
        };

        let coordinates = coordinates
            .strip_prefix("https://github.com/")
            .or_else(|| coordinates.strip_prefix("http://github.com/"))
            .or_else(|| coordinates.strip_prefix("github.com/"))
            .unwrap_or(coordinates)
            .trim_end_matches('/');
        let coordinates = coordinates.strip_suffix(".git").unwrap_or(coordinates);

        let mut parts = coordinates.split('/');
        let (Some(owner), Some(repo), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(DotclaudeError::InvalidInput(format!(
                "expected 'owner/repo', got '{reference}'"
            )));
        };

        let mut source = Self::new(owner, repo)?;
        if let Some(branch) = branch {
            source.branch = branch.to_string();
        }
        Ok(source)
    }

    #[must_use]
    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = branch.into();
        self
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Bundle directory without leading or trailing slashes
    pub fn normalized_path(&self) -> &str {
        self.path.trim_matches('/')
    }

    /// Check owner, repo, branch and path
    ///
    /// # Errors
    ///
    /// [`DotclaudeError::InvalidInput`] naming the first invalid field.
    pub fn validate(&self) -> Result<()> {
        validate_name("owner", &self.owner)?;
        validate_name("repo", &self.repo)?;

        if self.branch.trim().is_empty() || self.branch.contains("..") {
            return Err(DotclaudeError::InvalidInput(format!(
                "invalid branch '{}'",
                self.branch
            )));
        }
        if self.path.split('/').any(|segment| segment == "..") {
            return Err(DotclaudeError::InvalidInput(format!(
                "bundle path '{}' must not contain '..'",
                self.path
            )));
        }
        Ok(())
    }
}

fn validate_name(field: &str, value: &str) -> Result<()> {
    let valid = !value.is_empty()
        && value != "."
        && value != ".."
        && value.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));

    if valid {
        Ok(())
    } else {
        Err(DotclaudeError::InvalidInput(format!("invalid {field} '{value}'")))
    }
}

impl FromStr for RepoSource {
    type Err = DotclaudeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for RepoSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}@{}:{}", self.owner, self.repo, self.branch, self.normalized_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_forms() {
        let plain = RepoSource::parse("acme/agents").unwrap();
        assert_eq!((plain.owner.as_str(), plain.repo.as_str()), ("acme", "agents"));
        assert_eq!(plain.branch, "main");
        assert_eq!(plain.path, ".claude");

        let pinned = RepoSource::parse("acme/agents@v2").unwrap();
        assert_eq!(pinned.branch, "v2");

        let url = RepoSource::parse("https://github.com/acme/agents.git").unwrap();
        assert_eq!(url.repo, "agents");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(RepoSource::parse("acme").is_err());
        assert!(RepoSource::parse("acme/agents/extra").is_err());
        assert!(RepoSource::parse("ac me/agents").is_err());
        assert!(RepoSource::parse("../agents").is_err());
    }

    #[test]
    fn test_validate_path_traversal() {
        let source = RepoSource::new("acme", "agents").unwrap().with_path("../etc");
        assert!(source.validate().is_err());
    }

    #[test]
    fn test_display() {
        let source = RepoSource::new("acme", "agents").unwrap().with_path("/.claude/");
        assert_eq!(source.to_string(), "acme/agents@main:.claude");
    }
}
