//! HTTP plumbing shared by the GitHub client

pub mod client;

pub use client::{HttpClient, HttpClientBuilder};
