//! Configuration loading and management
//!
//! Settings are layered: built-in defaults, then a config file, then
//! environment variables. Command-line flags are applied last by the binary.

pub mod loader;
pub mod settings;

// Re-export commonly used items
pub use loader::{apply_env, apply_overrides, load, load_from_file, probe_config_paths};
pub use settings::InstallerConfig;
