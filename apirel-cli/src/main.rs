//! apirel CLI - release checker for library APIs
//!
//! Compares the exported API of a library at HEAD with its last release
//! and reports which semantic version the next release may carry.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod config;
mod git;
mod output;

use commands::check::CheckOptions;
use config::ApirelConfig;
use output::{OutputConfig, OutputFormat};

/// Check that a library release follows semantic versioning.
#[derive(Parser)]
#[command(name = "apirel")]
#[command(author, version)]
#[command(about = "Check that a library release follows semantic versioning")]
#[command(after_help = "Examples:
  apirel check                     Suggest the next version
  apirel check --version=v1.4.0    Validate a proposed version
  apirel diff old.json new.json    Compare two snapshot files")]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output format (overrides config default)
    #[arg(long, global = true, value_enum)]
    format: Option<OutputFormat>,

    /// Print JSON on a single line
    #[arg(long, global = true)]
    compact: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare HEAD with the base release and report the version verdict
    Check {
        /// Base version to compare against; "none" for a first release.
        /// Defaults to the latest release tag reachable from HEAD
        #[arg(long)]
        base: Option<String>,

        /// Proposed version for the new release
        #[arg(long = "version")]
        release: Option<String>,

        /// Snapshot document path relative to the repository root
        #[arg(long)]
        snapshot: Option<String>,

        /// Prefix of release tags, for modules in repository subdirectories
        #[arg(long)]
        tag_prefix: Option<String>,
    },

    /// Compare two snapshot files
    Diff {
        /// Snapshot of the base release
        old: PathBuf,

        /// Snapshot of the new release
        new: PathBuf,

        /// Version of the base release
        #[arg(long)]
        base: Option<String>,

        /// Proposed version for the new release
        #[arg(long = "version", requires = "base")]
        release: Option<String>,
    },

    /// List the exported symbols of a snapshot file
    Extract {
        /// Snapshot file
        snapshot: PathBuf,
    },
}

fn setup_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<bool> {
    let cwd = Path::new(".");
    let config = ApirelConfig::load(cwd);

    // CLI flag > config default > Text
    let format = cli.format.unwrap_or_else(|| {
        config
            .default_format()
            .and_then(|f| f.parse().ok())
            .unwrap_or_default()
    });
    if let Some(use_color) = config.use_color() {
        colored::control::set_override(use_color);
    }
    let mut output = OutputConfig::auto_detect_with_color_override(format, config.use_color());
    if cli.compact {
        output = output.compact();
    }

    match cli.command {
        Commands::Check {
            base,
            release,
            snapshot,
            tag_prefix,
        } => {
            let options = CheckOptions {
                base,
                version: release,
                snapshot_path: snapshot.unwrap_or_else(|| config.snapshot_path().to_string()),
                tag_prefix: tag_prefix.unwrap_or_else(|| config.tag_prefix().to_string()),
            };
            commands::check::run(cwd, &options, output).await
        }
        Commands::Diff {
            old,
            new,
            base,
            release,
        } => {
            commands::diff::run(
                &old,
                &new,
                base.as_deref(),
                release.as_deref(),
                config.tag_prefix(),
                output,
            )
            .await
        }
        Commands::Extract { snapshot } => commands::extract::run(&snapshot, output).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.quiet);

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("{} {:#}", "apirel:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}
