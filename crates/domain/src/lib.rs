//! # dotclaude Domain
//!
//! Domain types for installing a `.claude` bundle from GitHub.
//!
//! This crate contains:
//! - Repository coordinates and bundle paths
//! - Remote listing entries and fetched files
//! - Install reports
//! - Domain error types and Result definitions
//!
//! ## Architecture
//! - No dependencies on other dotclaude crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use errors::*;
pub use types::*;
