//! Bundle fetcher
//!
//! Walks the remote bundle directory breadth-first, then downloads every file
//! with bounded parallelism. Every request goes through one shared
//! [`ResilientExecutor`], so all of them feed the same circuit breaker.

use std::collections::VecDeque;

use dotclaude_common::resilience::{
    policies, Bulkhead, BulkheadConfig, NoopObserver, ResilienceConfig, ResilientExecutor,
    RetryObserver, TracingObserver,
};
use dotclaude_domain::constants::MAX_TREE_DEPTH;
use dotclaude_domain::{BundlePath, EntryKind, FetchedFile, RemoteEntry, RepoSource};
use futures::future::join_all;
use tracing::{debug, info, instrument, warn};

use super::client::GitHubClient;
use crate::errors::{InstallError, InstallResult};

/// Name of the breaker guarding GitHub
pub const GITHUB_BREAKER: &str = "github";

/// A file that could not be downloaded
#[derive(Debug)]
pub struct FetchFailure {
    pub path: String,
    pub error: InstallError,
}

/// Downloaded files plus per-file failures
#[derive(Debug, Default)]
pub struct FetchReport {
    pub files: Vec<FetchedFile>,
    pub failures: Vec<FetchFailure>,
}

impl FetchReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn total_bytes(&self) -> usize {
        self.files.iter().map(FetchedFile::len).sum()
    }
}

/// Fetches a whole bundle from one repository source
pub struct BundleFetcher<O = TracingObserver> {
    client: GitHubClient,
    executor: ResilientExecutor<policies::Classified, O>,
    bulkhead: Bulkhead,
}

impl BundleFetcher<TracingObserver> {
    /// Build the executor and bulkhead from flat settings
    ///
    /// # Errors
    ///
    /// [`InstallError::Config`] if the resilience settings or the
    /// parallelism are out of range.
    pub fn from_config(
        client: GitHubClient,
        resilience: &ResilienceConfig,
        parallelism: usize,
    ) -> InstallResult<Self> {
        let executor = ResilientExecutor::from_config(resilience, GITHUB_BREAKER)?
            .with_observer(TracingObserver::new(GITHUB_BREAKER));
        let bulkhead = Bulkhead::new(BulkheadConfig::new(parallelism))?;
        Ok(Self::new(client, executor, bulkhead))
    }
}

impl<O> BundleFetcher<O> {
    pub fn new(
        client: GitHubClient,
        executor: ResilientExecutor<policies::Classified, O>,
        bulkhead: Bulkhead,
    ) -> Self {
        Self { client, executor, bulkhead }
    }

    /// Swap the retry observer, keeping the breaker
    pub fn with_observer<O2>(self, observer: O2) -> BundleFetcher<O2> {
        BundleFetcher {
            client: self.client,
            executor: self.executor.with_observer(observer),
            bulkhead: self.bulkhead,
        }
    }

    pub fn executor(&self) -> &ResilientExecutor<policies::Classified, O> {
        &self.executor
    }
}

impl BundleFetcher<NoopObserver> {
    /// Fetcher without retry logging
    ///
    /// # Errors
    ///
    /// See [`BundleFetcher::from_config`].
    pub fn quiet(
        client: GitHubClient,
        resilience: &ResilienceConfig,
        parallelism: usize,
    ) -> InstallResult<Self> {
        Ok(BundleFetcher::from_config(client, resilience, parallelism)?.with_observer(NoopObserver))
    }
}

impl<O: RetryObserver<InstallError>> BundleFetcher<O> {
    /// List and download the bundle
    ///
    /// # Errors
    ///
    /// Listing failures abort the fetch; download failures are collected in
    /// the report.
    #[instrument(skip(self), fields(repo = %source))]
    pub async fn fetch_bundle(&self, source: &RepoSource) -> InstallResult<FetchReport> {
        let entries = self.list_tree(source).await?;
        let report = self.fetch_files(source, &entries).await;

        info!(
            fetched = report.files.len(),
            failed = report.failures.len(),
            bytes = report.total_bytes(),
            "bundle fetch finished"
        );
        Ok(report)
    }

    /// Every file entry under the bundle root
    ///
    /// Symlinks and submodules are skipped.
    ///
    /// # Errors
    ///
    /// The first listing failure, or [`InstallError::Validation`] if the
    /// tree is deeper than [`MAX_TREE_DEPTH`].
    pub async fn list_tree(&self, source: &RepoSource) -> InstallResult<Vec<RemoteEntry>> {
        let mut pending = VecDeque::from([(source.normalized_path().to_string(), 0usize)]);
        let mut files = Vec::new();

        while let Some((dir, depth)) = pending.pop_front() {
            if depth > MAX_TREE_DEPTH {
                return Err(InstallError::Validation(format!(
                    "bundle nests deeper than {MAX_TREE_DEPTH} directories at '{dir}'"
                )));
            }

            for entry in self.list_directory(source, &dir).await? {
                match entry.kind {
                    EntryKind::File => files.push(entry),
                    EntryKind::Dir => pending.push_back((entry.path, depth + 1)),
                    EntryKind::Symlink | EntryKind::Submodule => {
                        debug!(path = %entry.path, kind = ?entry.kind, "skipping non-file entry");
                    }
                }
            }
        }

        Ok(files)
    }

    /// Download `entries` concurrently, bounded by the bulkhead
    pub async fn fetch_files(&self, source: &RepoSource, entries: &[RemoteEntry]) -> FetchReport {
        let root = source.normalized_path();
        let downloads = entries
            .iter()
            .filter(|entry| entry.is_file())
            .map(|entry| self.fetch_entry(source, root, entry));

        let mut report = FetchReport::default();
        for result in join_all(downloads).await {
            match result {
                Ok(file) => report.files.push(file),
                Err(failure) => report.failures.push(failure),
            }
        }
        report
    }

    async fn list_directory(&self, source: &RepoSource, dir: &str) -> InstallResult<Vec<RemoteEntry>> {
        let client = &self.client;
        self.executor
            .execute(move |_attempt| client.list_directory(source, dir))
            .await
            .map_err(InstallError::from)
    }

    async fn fetch_entry(
        &self,
        source: &RepoSource,
        root: &str,
        entry: &RemoteEntry,
    ) -> Result<FetchedFile, FetchFailure> {
        let Some(path) = BundlePath::from_repo_path(root, &entry.path) else {
            return Err(FetchFailure {
                path: entry.path.clone(),
                error: InstallError::Validation(format!(
                    "'{}' is outside the bundle root '{root}'",
                    entry.path
                )),
            });
        };

        let client = &self.client;
        let repo_path = entry.path.as_str();
        let result = self
            .bulkhead
            .execute(|| self.executor.execute(move |_attempt| client.fetch_file(source, repo_path)))
            .await;

        match result {
            Ok(contents) => Ok(FetchedFile::new(path, contents)),
            Err(err) => {
                let error = InstallError::from(err);
                warn!(path = %path, error = %error, "failed to fetch file");
                Err(FetchFailure { path: path.to_string(), error })
            }
        }
    }
}
