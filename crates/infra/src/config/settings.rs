//! Installer settings

use std::path::PathBuf;

use dotclaude_common::resilience::ResilienceConfig;
use dotclaude_domain::constants::{
    DEFAULT_API_BASE_URL, DEFAULT_PARALLELISM, DEFAULT_RAW_BASE_URL, DEFAULT_SOURCE_PATH,
    MAX_PARALLELISM,
};
use dotclaude_domain::RepoSource;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

use crate::errors::{InstallError, InstallResult};
use crate::github::GitHubClientConfig;
use crate::install::WriteOptions;

/// Everything needed to run one install
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallerConfig {
    /// `owner/repo`, optionally `owner/repo@branch`
    pub repo: Option<String>,
    /// Overrides a branch given in `repo`
    pub branch: Option<String>,
    /// Bundle directory inside the repository
    pub source_path: String,
    /// Directory the bundle contents are written into
    pub target: PathBuf,
    pub parallelism: usize,
    pub overwrite: bool,
    pub dry_run: bool,
    pub api_base_url: String,
    pub raw_base_url: String,
    /// Never written back out
    #[serde(skip_serializing)]
    pub token: Option<String>,
    /// Fields left out of a `[resilience]` table keep the GitHub preset
    #[serde(deserialize_with = "github_resilience")]
    pub resilience: ResilienceConfig,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self {
            repo: None,
            branch: None,
            source_path: DEFAULT_SOURCE_PATH.to_string(),
            target: PathBuf::from(DEFAULT_SOURCE_PATH),
            parallelism: DEFAULT_PARALLELISM,
            overwrite: false,
            dry_run: false,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            raw_base_url: DEFAULT_RAW_BASE_URL.to_string(),
            token: None,
            resilience: ResilienceConfig::github(),
        }
    }
}

impl InstallerConfig {
    /// Resolve the repository coordinates
    ///
    /// # Errors
    ///
    /// [`InstallError::Config`] when no repository is set,
    /// [`InstallError::Validation`] when it does not parse.
    pub fn repo_source(&self) -> InstallResult<RepoSource> {
        let repo = self
            .repo
            .as_deref()
            .filter(|repo| !repo.trim().is_empty())
            .ok_or_else(|| InstallError::Config("no repository given (use --repo owner/repo)".into()))?;

        let mut source = RepoSource::parse(repo)?.with_path(self.source_path.clone());
        if let Some(branch) = self.branch.as_deref().filter(|branch| !branch.trim().is_empty()) {
            source = source.with_branch(branch.trim());
        }
        source.validate()?;
        Ok(source)
    }

    /// Check every setting
    ///
    /// # Errors
    ///
    /// The first invalid setting.
    pub fn validate(&self) -> InstallResult<()> {
        if !(1..=MAX_PARALLELISM).contains(&self.parallelism) {
            return Err(InstallError::Config(format!(
                "parallelism must be between 1 and {MAX_PARALLELISM}, got {}",
                self.parallelism
            )));
        }
        self.resilience.validate()?;
        self.repo_source()?;
        Ok(())
    }

    pub fn github_client_config(&self) -> GitHubClientConfig {
        GitHubClientConfig {
            api_base_url: self.api_base_url.clone(),
            raw_base_url: self.raw_base_url.clone(),
            token: self.token.clone(),
            request_timeout: self.resilience.timeout,
        }
    }

    pub fn write_options(&self) -> WriteOptions {
        WriteOptions { overwrite: self.overwrite, dry_run: self.dry_run }
    }
}

/// Overlay a partial `[resilience]` table onto [`ResilienceConfig::github`]
fn github_resilience<'de, D>(deserializer: D) -> Result<ResilienceConfig, D::Error>
where
    D: Deserializer<'de>,
{
    let table = serde_json::Map::<String, serde_json::Value>::deserialize(deserializer)?;
    let mut merged = match serde_json::to_value(ResilienceConfig::github()) {
        Ok(serde_json::Value::Object(preset)) => preset,
        Ok(_) => serde_json::Map::new(),
        Err(err) => return Err(D::Error::custom(err)),
    };
    merged.extend(table);
    serde_json::from_value(serde_json::Value::Object(merged)).map_err(D::Error::custom)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = InstallerConfig::default();
        assert_eq!(config.source_path, ".claude");
        assert_eq!(config.parallelism, 4);
        assert_eq!(config.resilience.max_attempts, 5);
        assert!(matches!(config.validate(), Err(InstallError::Config(_))));
    }

    /// Validates the branch setting wins over one embedded in `repo`.
    #[test]
    fn test_repo_source_branch_override() {
        let config = InstallerConfig {
            repo: Some("acme/dotfiles@dev".into()),
            ..InstallerConfig::default()
        };
        assert_eq!(config.repo_source().unwrap().branch, "dev");

        let config = InstallerConfig { branch: Some("release".into()), ..config };
        let source = config.repo_source().unwrap();
        assert_eq!(source.branch, "release");
        assert_eq!(source.path, ".claude");
    }

    #[test]
    fn test_parallelism_bounds() {
        let base = InstallerConfig { repo: Some("acme/dotfiles".into()), ..InstallerConfig::default() };
        assert!(base.validate().is_ok());
        assert!(InstallerConfig { parallelism: 0, ..base.clone() }.validate().is_err());
        assert!(InstallerConfig { parallelism: MAX_PARALLELISM + 1, ..base }.validate().is_err());
    }

    #[test]
    fn test_token_not_serialized() {
        let config = InstallerConfig { token: Some("ghp_secret".into()), ..InstallerConfig::default() };
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("ghp_secret"));
        assert_eq!(config.github_client_config().request_timeout, Duration::from_secs(30));
    }
}
