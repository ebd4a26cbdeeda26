//! cartpulse CLI - storefront behavior telemetry agent.

use cartpulse::cli;
use clap::{Parser, Subcommand};
use std::env;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Get the version string.
///
/// - Release builds (on a git tag): "0.1.2"
/// - Development builds: "0.1.2-dev (abc1234)"
/// - Dirty working directory: "0.1.2-dev (abc1234-dirty)"
fn version() -> &'static str {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    const GIT_HASH: &str = env!("CARTPULSE_GIT_HASH");
    const IS_RELEASE: &str = env!("CARTPULSE_IS_RELEASE");

    static VERSION_STRING: std::sync::OnceLock<String> = std::sync::OnceLock::new();

    VERSION_STRING.get_or_init(|| {
        if IS_RELEASE == "true" {
            VERSION.to_string()
        } else {
            format!("{VERSION}-dev ({GIT_HASH})")
        }
    })
}

#[derive(Parser)]
#[command(name = "cartpulse")]
#[command(author, version = version(), about = "Storefront behavior telemetry agent", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the agent. Reads host signals as JSON lines on stdin.
    Run,

    /// Show the persisted session record.
    Inspect {
        /// Print a per-page summary instead of raw JSON.
        #[arg(short, long)]
        summary: bool,
    },

    /// Send the persisted record to the collector once.
    Flush,

    /// Delete the persisted session record.
    Reset,

    /// Print the page key and category for a URL or path.
    PageKey {
        /// URL or path (e.g. "/products/shoe-1?variant=2").
        href: String,
    },
}

/// Logs go to stderr; stdout carries prompt lines.
fn init_logging() {
    let debug_enabled = env::var("CARTPULSE_DEBUG_LOG")
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false);
    let filter = if debug_enabled {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    let result = match cli.command {
        Commands::Run => cli::run::run(),
        Commands::Inspect { summary } => cli::inspect::run(summary),
        Commands::Flush => cli::flush::run(),
        Commands::Reset => cli::reset::run(),
        Commands::PageKey { href } => {
            cli::page_key::run(&href);
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("cartpulse: error: {e}");
            ExitCode::FAILURE
        }
    }
}
