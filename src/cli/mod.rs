//! Command-line interface for trellis.
//!
//! The CLI is a thin host pipeline around the template stage: it reads a
//! source tree into a [`FileSet`](crate::files::FileSet), runs the stage over
//! it and writes the result to a destination directory.
//!
//! # Commands
//!
//! - `build` - Render a source directory into a destination directory
//!
//! # Global Options
//!
//! - `--verbose` - Enable debug output
//! - `--quiet` - Suppress all output except errors
//!
//! # Examples
//!
//! ```bash
//! trellis build site public
//! trellis build site public --layouts layouts --partials partials
//! trellis --verbose build site public --metadata title="My Site"
//! ```
//!
//! The log level can also be set through `RUST_LOG`, which takes precedence
//! over `--verbose` and `--quiet`.

mod build;


pub use build::BuildCommand;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Runtime configuration derived from the global flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliConfig {
    /// Level used when `RUST_LOG` is not set.
    pub log_level: String,

    /// Whether user-facing status output is suppressed.
    pub quiet: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            quiet: false,
        }
    }
}

impl CliConfig {
    /// The tracing filter for this configuration. `RUST_LOG` wins when set.
    pub fn env_filter(&self) -> EnvFilter {
        if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            EnvFilter::new(&self.log_level)
        }
    }

    /// Install the global tracing subscriber, writing to stderr.
    ///
    /// Does nothing if a subscriber is already installed.
    pub fn init_logging(&self) {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(self.env_filter())
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }
}

/// Render page templates with layouts, partials and helpers.
#[derive(Parser)]
#[command(
    name = "trellis",
    about = "Render page templates with layouts, partials and helpers",
    version,
    long_about = "trellis reads a source directory, renders every template file through its layout \
                  with shared partials and helpers, and writes the result to a destination directory."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output (debug logging of every file decision).
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Render SOURCE into DEST
    Build(BuildCommand),
}

impl Cli {
    /// Execute the parsed command.
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        config.init_logging();

        match self.command {
            Commands::Build(cmd) => cmd.execute(&config).await,
        }
    }

    /// Translate the global flags into a [`CliConfig`].
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "warn"
        };

        CliConfig {
            log_level: log_level.to_string(),
            quiet: self.quiet,
        }
    }
}
