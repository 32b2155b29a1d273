//! Domain constants
//!
//! Defaults shared by the configuration loader, the CLI and the GitHub
//! client.

/// Branch fetched when none is configured
pub const DEFAULT_BRANCH: &str = "main";

/// Directory inside the repository that holds the bundle
pub const DEFAULT_SOURCE_PATH: &str = ".claude";

/// GitHub REST API base URL
pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";

/// GitHub raw content base URL
pub const DEFAULT_RAW_BASE_URL: &str = "https://raw.githubusercontent.com";

/// Concurrent file downloads when none is configured
pub const DEFAULT_PARALLELISM: usize = 4;

/// Upper bound accepted for the download parallelism
pub const MAX_PARALLELISM: usize = 32;

/// Recursion limit when walking remote directories
pub const MAX_TREE_DEPTH: usize = 16;

/// User agent sent with every request (GitHub rejects requests without one)
pub const USER_AGENT: &str = concat!("dotclaude-installer/", env!("CARGO_PKG_VERSION"));
