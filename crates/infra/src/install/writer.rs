//! Writes fetched files under the install target
//!
//! Paths are already bundle-relative and traversal-free ([`BundlePath`]);
//! the writer additionally refuses to follow symlinks out of the target.
//! Writes that fail with "too many open files" are retried.
//!
//! [`BundlePath`]: dotclaude_domain::BundlePath

use std::path::{Path, PathBuf};
use std::time::Duration;

use dotclaude_common::resilience::{Backoff, RetryConfig, RetryExecutor};
use dotclaude_domain::FetchedFile;
use tokio::fs;
use tracing::{debug, info, instrument};

use crate::errors::{InstallError, InstallResult};

/// How existing files and dry runs are handled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Replace files that already exist
    pub overwrite: bool,
    /// Report what would be written without touching the filesystem
    pub dry_run: bool,
}

/// What happened to one file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Written, or would be written in a dry run
    Written,
    /// Left alone because it already exists
    Skipped,
}

/// Writes bundle files below a target directory
#[derive(Debug, Clone)]
pub struct BundleWriter {
    target: PathBuf,
    options: WriteOptions,
    retry: RetryExecutor,
}

impl BundleWriter {
    pub fn new(target: impl Into<PathBuf>, options: WriteOptions) -> Self {
        Self { target: target.into(), options, retry: RetryExecutor::new(default_retry_config()) }
    }

    /// Replace the retry settings used for filesystem writes
    #[must_use]
    pub fn with_retry(mut self, config: RetryConfig) -> Self {
        self.retry = RetryExecutor::new(config);
        self
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    pub fn options(&self) -> WriteOptions {
        self.options
    }

    /// Write one file
    ///
    /// # Errors
    ///
    /// [`InstallError::Filesystem`] when the write fails,
    /// [`InstallError::Validation`] when the destination resolves outside
    /// the target.
    #[instrument(skip(self, file), fields(path = %file.path))]
    pub async fn write_file(&self, file: &FetchedFile) -> InstallResult<WriteOutcome> {
        let dest = file.path.to_path_under(&self.target);

        if !self.options.overwrite && exists(&dest).await? {
            debug!(dest = %dest.display(), "file exists, skipping");
            return Ok(WriteOutcome::Skipped);
        }

        if self.options.dry_run {
            info!(dest = %dest.display(), bytes = file.len(), "dry run, not writing");
            return Ok(WriteOutcome::Written);
        }

        let (target, dest_ref, contents) =
            (self.target.as_path(), dest.as_path(), file.contents.as_slice());
        self.retry
            .execute(move |_attempt| write_once(target, dest_ref, contents))
            .await
            .map_err(InstallError::from)?;

        debug!(dest = %dest.display(), bytes = file.len(), "wrote file");
        Ok(WriteOutcome::Written)
    }
}

fn default_retry_config() -> RetryConfig {
    RetryConfig {
        max_attempts: 3,
        backoff: Backoff::exponential(Duration::from_millis(50), Duration::from_secs(1), 2.0),
        attempt_timeout: None,
    }
}

async fn exists(path: &Path) -> InstallResult<bool> {
    fs::try_exists(path).await.map_err(|err| InstallError::filesystem(path, err))
}

async fn write_once(target: &Path, dest: &Path, contents: &[u8]) -> InstallResult<()> {
    let parent = dest.parent().unwrap_or(target);
    fs::create_dir_all(parent).await.map_err(|err| InstallError::filesystem(parent, err))?;
    ensure_contained(target, parent).await?;

    if let Ok(metadata) = fs::symlink_metadata(dest).await {
        if metadata.file_type().is_symlink() {
            return Err(InstallError::Validation(format!(
                "refusing to write through symlink {}",
                dest.display()
            )));
        }
    }

    fs::write(dest, contents).await.map_err(|err| InstallError::filesystem(dest, err))
}

async fn ensure_contained(target: &Path, dir: &Path) -> InstallResult<()> {
    let root = fs::canonicalize(target).await.map_err(|err| InstallError::filesystem(target, err))?;
    let resolved = fs::canonicalize(dir).await.map_err(|err| InstallError::filesystem(dir, err))?;

    if resolved.starts_with(&root) {
        Ok(())
    } else {
        Err(InstallError::Validation(format!(
            "{} resolves outside the target {}",
            dir.display(),
            target.display()
        )))
    }
}
