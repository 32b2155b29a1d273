//! `dotclaude-install`: fetch a `.claude` bundle from GitHub into a local
//! directory.
//!
//! This is a CLI tool, so `println!` and `eprintln!` are used for
//! user-facing output; diagnostics go through `tracing` on stderr.

#![allow(clippy::print_stdout, clippy::print_stderr)]

mod cli;

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use dotclaude_infra::{config, InstallError, InstallOutcome, Installer};
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is normal
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.log_filter());

    match run(&cli).await {
        Ok(outcome) => report(&outcome, cli.json),
        Err(err) => {
            eprintln!("error: {err:#}");
            if let Some(install) = err.downcast_ref::<InstallError>() {
                eprintln!("hint: {}", install.guidance());
            }
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: &Cli) -> anyhow::Result<InstallOutcome> {
    let mut config = config::load(cli.config.as_deref()).context("loading configuration")?;
    cli.apply(&mut config);
    config.validate()?;

    let source = config.repo_source()?;
    let installer = Installer::from_config(&config)?;

    tracing::info!(%source, target = %config.target.display(), "installing bundle");
    let outcome = installer.install(&source).await.with_context(|| format!("installing {source}"))?;
    Ok(outcome)
}

fn report(outcome: &InstallOutcome, json: bool) -> ExitCode {
    let report = &outcome.report;

    if json {
        match serde_json::to_string_pretty(report) {
            Ok(rendered) => println!("{rendered}"),
            Err(err) => eprintln!("error: cannot render report: {err}"),
        }
    } else {
        let verb = if report.dry_run { "would write" } else { "wrote" };
        for path in &report.written {
            println!("  {verb:<11} {path}");
        }
        for path in &report.skipped {
            println!("  {:<11} {path} (exists, use --force to replace)", "skipped");
        }
        for failure in &report.failed {
            println!("  {:<11} {} ({})", "failed", failure.path, failure.reason);
        }
        println!("{}", report.summary());
    }

    if outcome.is_success() {
        return ExitCode::SUCCESS;
    }

    for line in outcome.guidance() {
        eprintln!("hint: {line}");
    }
    ExitCode::FAILURE
}
