//! Command-line surface
//!
//! Flags override the file and environment layers loaded by
//! [`dotclaude_infra::config::load`].

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser};
use dotclaude_infra::InstallerConfig;

#[derive(Debug, Parser)]
#[command(
    name = "dotclaude-install",
    about = "Install a .claude configuration bundle from a GitHub repository",
    version
)]
pub struct Cli {
    /// Repository holding the bundle: owner/repo, owner/repo@branch or a GitHub URL
    #[arg(long, short = 'r', value_name = "OWNER/REPO")]
    pub repo: Option<String>,

    /// Branch, tag or commit to fetch
    #[arg(long, short = 'b')]
    pub branch: Option<String>,

    /// Bundle directory inside the repository [default: .claude]
    #[arg(long)]
    pub path: Option<String>,

    /// Directory to install into [default: .claude]
    #[arg(long, short = 't')]
    pub target: Option<PathBuf>,

    /// GitHub token for private repositories and higher rate limits
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Concurrent downloads
    #[arg(long, short = 'p')]
    pub parallelism: Option<usize>,

    /// Attempts per request before giving up
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Per-attempt timeout in milliseconds
    #[arg(long, value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Overwrite files that already exist
    #[arg(long, short = 'f')]
    pub force: bool,

    /// Show what would be written without writing
    #[arg(long)]
    pub dry_run: bool,

    /// Config file (default: probe ./dotclaude.toml, ./dotclaude.json, ./.dotclaude.toml)
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Print the install report as JSON
    #[arg(long)]
    pub json: bool,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Overlay flags that were given onto `config`
    pub fn apply(&self, config: &mut InstallerConfig) {
        if let Some(repo) = &self.repo {
            config.repo = Some(repo.clone());
        }
        if let Some(branch) = &self.branch {
            config.branch = Some(branch.clone());
        }
        if let Some(path) = &self.path {
            config.source_path = path.clone();
        }
        if let Some(target) = &self.target {
            config.target = target.clone();
        }
        if let Some(token) = &self.token {
            config.token = Some(token.clone());
        }
        if let Some(parallelism) = self.parallelism {
            config.parallelism = parallelism;
        }
        if let Some(attempts) = self.max_attempts {
            config.resilience.max_attempts = attempts;
        }
        if let Some(ms) = self.timeout_ms {
            config.resilience.timeout = Duration::from_millis(ms);
        }
        if self.force {
            config.overwrite = true;
        }
        if self.dry_run {
            config.dry_run = true;
        }
    }

    /// Default log filter when `RUST_LOG` is unset
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}
