//! Configuration loader
//!
//! ## Loading Strategy
//! 1. Start from [`InstallerConfig::default`]
//! 2. Overlay a config file: the explicit path if given, else the first
//!    file found by [`probe_config_paths`]
//! 3. Overlay environment variables
//!
//! ## Environment Variables
//! - `DOTCLAUDE_REPO`: `owner/repo[@branch]`
//! - `DOTCLAUDE_BRANCH`: branch to fetch
//! - `DOTCLAUDE_SOURCE_PATH`: bundle directory inside the repository
//! - `DOTCLAUDE_TARGET`: install directory
//! - `DOTCLAUDE_PARALLELISM`: concurrent downloads
//! - `DOTCLAUDE_MAX_ATTEMPTS`: attempts per request
//! - `DOTCLAUDE_TIMEOUT_MS`: per-attempt timeout in milliseconds
//! - `DOTCLAUDE_OVERWRITE`: replace existing files (true/false)
//! - `DOTCLAUDE_DRY_RUN`: write nothing (true/false)
//! - `GITHUB_TOKEN`: token sent to GitHub
//!
//! ## File Locations
//! `./dotclaude.toml`, `./dotclaude.json`, `./.dotclaude.toml`, in that order.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use super::settings::InstallerConfig;
use crate::errors::{InstallError, InstallResult};

/// File names probed in the working directory
pub const CONFIG_FILE_NAMES: [&str; 3] = ["dotclaude.toml", "dotclaude.json", ".dotclaude.toml"];

/// Load configuration from defaults, file and environment
///
/// # Errors
/// Returns `InstallError::Config` if:
/// - An explicit file does not exist
/// - A file cannot be read or parsed
/// - An environment variable has an invalid value
pub fn load(explicit: Option<&Path>) -> InstallResult<InstallerConfig> {
    let file = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => std::env::current_dir().ok().and_then(|cwd| probe_config_paths(&cwd)),
    };

    let mut config = match file {
        Some(path) => load_from_file(&path)?,
        None => {
            tracing::debug!("No config file found, using defaults");
            InstallerConfig::default()
        }
    };

    apply_env(&mut config)?;
    Ok(config)
}

/// Load configuration from a file
///
/// Format is detected by extension (`.toml` or `.json`); missing fields
/// take their defaults.
///
/// # Errors
/// Returns `InstallError::Config` if the file is missing, unreadable or
/// malformed.
pub fn load_from_file(path: &Path) -> InstallResult<InstallerConfig> {
    if !path.exists() {
        return Err(InstallError::Config(format!("Config file not found: {}", path.display())));
    }

    tracing::info!(path = %path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(path)
        .map_err(|e| InstallError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, path)
}

fn parse_config(contents: &str, path: &Path) -> InstallResult<InstallerConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| InstallError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| InstallError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(InstallError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// First existing config file in `dir`
pub fn probe_config_paths(dir: &Path) -> Option<PathBuf> {
    CONFIG_FILE_NAMES.iter().map(|name| dir.join(name)).find(|path| path.is_file())
}

/// Overlay process environment variables
///
/// # Errors
/// Returns `InstallError::Config` for unparseable values.
pub fn apply_env(config: &mut InstallerConfig) -> InstallResult<()> {
    apply_overrides(config, |key| std::env::var(key).ok())
}

/// Overlay variables resolved through `lookup`
///
/// Unset and blank variables leave the setting unchanged.
///
/// # Errors
/// Returns `InstallError::Config` for unparseable values.
pub fn apply_overrides<F>(config: &mut InstallerConfig, lookup: F) -> InstallResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).map(|value| value.trim().to_string()).filter(|v| !v.is_empty());

    if let Some(repo) = get("DOTCLAUDE_REPO") {
        config.repo = Some(repo);
    }
    if let Some(branch) = get("DOTCLAUDE_BRANCH") {
        config.branch = Some(branch);
    }
    if let Some(path) = get("DOTCLAUDE_SOURCE_PATH") {
        config.source_path = path;
    }
    if let Some(target) = get("DOTCLAUDE_TARGET") {
        config.target = PathBuf::from(target);
    }
    if let Some(value) = get("DOTCLAUDE_PARALLELISM") {
        config.parallelism = parse_var("DOTCLAUDE_PARALLELISM", &value)?;
    }
    if let Some(value) = get("DOTCLAUDE_MAX_ATTEMPTS") {
        config.resilience.max_attempts = parse_var("DOTCLAUDE_MAX_ATTEMPTS", &value)?;
    }
    if let Some(value) = get("DOTCLAUDE_TIMEOUT_MS") {
        config.resilience.timeout =
            Duration::from_millis(parse_var("DOTCLAUDE_TIMEOUT_MS", &value)?);
    }
    if let Some(value) = get("DOTCLAUDE_OVERWRITE") {
        config.overwrite = parse_bool(&value);
    }
    if let Some(value) = get("DOTCLAUDE_DRY_RUN") {
        config.dry_run = parse_bool(&value);
    }
    if let Some(token) = get("GITHUB_TOKEN") {
        config.token = Some(token);
    }

    Ok(())
}

fn parse_var<T>(key: &str, value: &str) -> InstallResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.parse::<T>().map_err(|e| InstallError::Config(format!("Invalid {key} '{value}': {e}")))
}

/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn parse_bool(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
