//! Fetch-then-write installation of a bundle

pub mod writer;

use dotclaude_common::resilience::{RetryObserver, TracingObserver};
use dotclaude_domain::{FileFailure, InstallReport, RepoSource};
use tracing::{info, instrument, warn};

pub use writer::{BundleWriter, WriteOptions, WriteOutcome};

use crate::config::InstallerConfig;
use crate::errors::{InstallError, InstallResult};
use crate::github::{BundleFetcher, GitHubClient};

/// Report of an install plus the errors behind each failed file
#[derive(Debug)]
pub struct InstallOutcome {
    pub report: InstallReport,
    pub errors: Vec<InstallError>,
}

impl InstallOutcome {
    pub fn is_success(&self) -> bool {
        self.report.is_success()
    }

    /// Distinct advice lines for the failures, in first-seen order
    pub fn guidance(&self) -> Vec<&'static str> {
        let mut lines: Vec<&'static str> = Vec::new();
        for error in &self.errors {
            let line = error.guidance();
            if !lines.contains(&line) {
                lines.push(line);
            }
        }
        lines
    }
}

/// Fetches a bundle and writes it to disk
pub struct Installer<O = TracingObserver> {
    fetcher: BundleFetcher<O>,
    writer: BundleWriter,
}

impl Installer<TracingObserver> {
    /// Wire the GitHub client, fetcher and writer from settings
    ///
    /// # Errors
    ///
    /// [`InstallError::Config`] for invalid settings.
    pub fn from_config(config: &InstallerConfig) -> InstallResult<Self> {
        let client = GitHubClient::new(config.github_client_config())?;
        let fetcher = BundleFetcher::from_config(client, &config.resilience, config.parallelism)?;
        let writer = BundleWriter::new(&config.target, config.write_options());
        Ok(Self::new(fetcher, writer))
    }
}

impl<O> Installer<O> {
    pub fn new(fetcher: BundleFetcher<O>, writer: BundleWriter) -> Self {
        Self { fetcher, writer }
    }

    pub fn fetcher(&self) -> &BundleFetcher<O> {
        &self.fetcher
    }

    pub fn writer(&self) -> &BundleWriter {
        &self.writer
    }
}

impl<O: RetryObserver<InstallError>> Installer<O> {
    /// Install the bundle at `source`
    ///
    /// Per-file failures land in the outcome; the call itself only fails
    /// when the bundle cannot be listed.
    ///
    /// # Errors
    ///
    /// The listing failure, already flattened (`Exhausted`, `CircuitOpen`,
    /// `NotFound`, ...).
    #[instrument(skip(self), fields(repo = %source, target = %self.writer.target().display()))]
    pub async fn install(&self, source: &RepoSource) -> InstallResult<InstallOutcome> {
        let fetched = self.fetcher.fetch_bundle(source).await?;

        let mut report = InstallReport::new(self.writer.options().dry_run);
        let mut errors = Vec::new();

        for failure in fetched.failures {
            report.failed.push(FileFailure::new(failure.path, failure.error.to_string()));
            errors.push(failure.error);
        }

        for file in &fetched.files {
            match self.writer.write_file(file).await {
                Ok(WriteOutcome::Written) => report.written.push(file.path.clone()),
                Ok(WriteOutcome::Skipped) => report.skipped.push(file.path.clone()),
                Err(error) => {
                    warn!(path = %file.path, error = %error, "failed to write file");
                    report.failed.push(FileFailure::new(file.path.as_str(), error.to_string()));
                    errors.push(error);
                }
            }
        }

        info!(summary = %report.summary(), "install finished");
        Ok(InstallOutcome { report, errors })
    }
}
