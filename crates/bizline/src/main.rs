//! bizline - business messaging CLI
//!
//! Main entry point for the bizline CLI.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod commands;

use commands::account;

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// bizline - business messaging CLI
#[derive(Parser)]
#[command(name = "bizline")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Configuration directory (default: ~/.config/bizline)
    #[arg(long, global = true, env = "BIZLINE_CONFIG_DIR")]
    pub config_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Linked account management
    Account(account::AccountArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = bizline_config::load_config(None, cli.config_dir.as_deref())?;
    let _log_guard = init_tracing(cli.verbose, &loaded.config_dir.join("logs"));

    for source in loaded.sources.iter().filter(|s| s.loaded) {
        tracing::debug!(layer = ?source.layer, path = %source.path.display(), "Loaded config");
    }
    for warning in &loaded.warnings {
        tracing::warn!("{}", warning);
    }

    let ctx = commands::Context {
        config: loaded.config,
        config_dir: loaded.config_dir,
        json_output: cli.json,
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::Account(args) => account::run(args, &ctx).await,
    }
}

/// Console logging on stderr plus a daily-rotated JSON log in `log_dir`.
///
/// The returned guard flushes the file writer when dropped.
fn init_tracing(verbose: bool, log_dir: &Path) -> WorkerGuard {
    let console_filter = if verbose {
        "bizline=debug,bizline_setup=debug,bizline_credentials=debug,bizline_config=debug,tower_http=debug,info"
    } else {
        "bizline=info,bizline_setup=info,bizline_credentials=warn,warn"
    };

    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(log_dir, "bizline.log"));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(EnvFilter::new(console_filter)),
        )
        .with(
            fmt::layer().json().with_writer(file_writer).with_filter(EnvFilter::new(
                "bizline=trace,bizline_setup=trace,bizline_credentials=trace,bizline_config=trace,info",
            )),
        )
        .init();

    guard
}
