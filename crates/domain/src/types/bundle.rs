//! Bundle-relative paths and fetched file contents

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{DotclaudeError, Result};

/// A path inside the bundle, relative to its root
///
/// Always `/`-separated, never empty, never absolute and never containing a
/// `..` segment, so joining it onto a target directory cannot escape it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BundlePath(String);

impl BundlePath {
    /// Normalize and validate a relative path
    ///
    /// Backslashes are treated as separators; empty and `.` segments are
    /// dropped.
    ///
    /// # Errors
    ///
    /// [`DotclaudeError::InvalidInput`] for empty, absolute, drive-prefixed
    /// or traversing paths.
    pub fn new(raw: &str) -> Result<Self> {
        let unified = raw.replace('\\', "/");

        if unified.starts_with('/') || has_drive_prefix(&unified) {
            return Err(DotclaudeError::InvalidInput(format!("absolute path '{raw}'")));
        }

        let mut segments = Vec::new();
        for segment in unified.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    return Err(DotclaudeError::InvalidInput(format!(
                        "path '{raw}' escapes the bundle root"
                    )));
                }
                other => segments.push(other),
            }
        }

        if segments.is_empty() {
            return Err(DotclaudeError::InvalidInput(format!("empty path '{raw}'")));
        }

        Ok(Self(segments.join("/")))
    }

    /// Bundle path of a repository path under `root`
    ///
    /// Returns `None` if `repo_path` is not strictly inside `root`.
    pub fn from_repo_path(root: &str, repo_path: &str) -> Option<Self> {
        let root = root.trim_matches('/');
        let relative = if root.is_empty() {
            repo_path
        } else {
            repo_path.strip_prefix(root)?.strip_prefix('/')?
        };
        Self::new(relative).ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }

    /// Resolve against a target directory
    pub fn to_path_under(&self, target: &Path) -> PathBuf {
        self.segments().fold(target.to_path_buf(), |path, segment| path.join(segment))
    }
}

fn has_drive_prefix(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

impl TryFrom<String> for BundlePath {
    type Error = DotclaudeError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(&value)
    }
}

impl From<BundlePath> for String {
    fn from(path: BundlePath) -> Self {
        path.0
    }
}

impl AsRef<str> for BundlePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BundlePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A downloaded bundle file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedFile {
    pub path: BundlePath,
    pub contents: Vec<u8>,
}

impl FetchedFile {
    pub fn new(path: BundlePath, contents: impl Into<Vec<u8>>) -> Self {
        Self { path, contents: contents.into() }
    }

    pub fn len(&self) -> usize {
        self.contents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalizes_separators_and_dots() {
        let path = BundlePath::new("agents\\./reviewer.md").unwrap();
        assert_eq!(path.as_str(), "agents/reviewer.md");

        let path = BundlePath::new("commands//deploy.md/").unwrap();
        assert_eq!(path.as_str(), "commands/deploy.md");
    }

    #[test]
    fn test_rejects_unsafe_paths() {
        for raw in ["", ".", "/etc/passwd", "\\\\server\\share", "C:/Windows", "a/../../b", ".."] {
            assert!(BundlePath::new(raw).is_err(), "{raw:?} should be rejected");
        }
    }

    #[test]
    fn test_from_repo_path() {
        let path = BundlePath::from_repo_path(".claude", ".claude/agents/reviewer.md").unwrap();
        assert_eq!(path.as_str(), "agents/reviewer.md");

        assert!(BundlePath::from_repo_path(".claude", ".claudex/file").is_none());
        assert!(BundlePath::from_repo_path(".claude", "other/file").is_none());
        assert!(BundlePath::from_repo_path(".claude", ".claude").is_none());

        let path = BundlePath::from_repo_path("", "settings.json").unwrap();
        assert_eq!(path.as_str(), "settings.json");
    }

    #[test]
    fn test_to_path_under() {
        let path = BundlePath::new("agents/reviewer.md").unwrap();
        let resolved = path.to_path_under(Path::new("/tmp/target"));
        assert_eq!(resolved, Path::new("/tmp/target").join("agents").join("reviewer.md"));
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: BundlePath = serde_json::from_str("\"hooks/pre.sh\"").unwrap();
        assert_eq!(ok.as_str(), "hooks/pre.sh");
        assert!(serde_json::from_str::<BundlePath>("\"../escape\"").is_err());
    }
}
