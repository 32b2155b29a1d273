//! GitHub access: the REST contents API for listings, raw content for file
//! bodies, and the fetcher that drives both through the resilience layer.

pub mod client;
pub mod fetcher;

pub use client::{GitHubClient, GitHubClientConfig};
pub use fetcher::{BundleFetcher, FetchFailure, FetchReport};
