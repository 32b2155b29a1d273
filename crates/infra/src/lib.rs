//! # dotclaude Infrastructure
//!
//! I/O side of the installer.
//!
//! This crate contains:
//! - HTTP client wrapper (reqwest)
//! - GitHub contents/raw client and the bundle fetcher
//! - Filesystem writer and the install orchestration
//! - Layered configuration loading
//!
//! ## Architecture
//! - Depends on `dotclaude-common` (resilience, error classification) and
//!   `dotclaude-domain`
//! - Contains all "impure" code (network, filesystem, environment)

pub mod config;
pub mod errors;
pub mod github;
pub mod http;
pub mod install;

// Re-export commonly used items
pub use config::InstallerConfig;
pub use errors::{InstallError, InstallResult};
pub use github::{BundleFetcher, FetchReport, GitHubClient, GitHubClientConfig};
pub use http::HttpClient;
pub use install::{BundleWriter, InstallOutcome, Installer, WriteOptions};
