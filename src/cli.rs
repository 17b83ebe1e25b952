// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `sitewright`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "sitewright",
    version,
    about = "Build a static website from a graph of asset tasks, or serve it with live reload.",
    long_about = None
)]
pub struct CliArgs {
    /// Task or pipeline to run (e.g. `build`, `build:styles`, `clean`,
    /// `serve`).
    ///
    /// Default: `[config].default`, which is `build` unless configured.
    #[arg(value_name = "TASK")]
    pub task: Option<String>,

    /// Path to the config file (TOML).
    ///
    /// Default: `Sitewright.toml` in the current directory, or built-in
    /// defaults when that file does not exist.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `SITEWRIGHT_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Print the execution plan without running anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Print every task with its dependencies and exit.
    #[arg(long)]
    pub list: bool,

    /// Mark dependents of a failed task as failed instead of running them,
    /// and exit non-zero.
    #[arg(long)]
    pub fail_fast: bool,

    /// Also watch `_drafts/` while serving.
    #[arg(long)]
    pub drafts: bool,

    /// Port for the dev server (overrides `[serve].port`).
    #[arg(long, value_name = "PORT")]
    pub port: Option<u16>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
