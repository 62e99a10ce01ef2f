//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use archiver_core::config::DEFAULT_CONFIG_PATH;

/// Incrementally mirror favorited and subscribed comics to disk.
///
/// Every behavior knob lives in the YAML configuration file. On first run a
/// commented template is written to the config path and the program exits.
#[derive(Parser, Debug)]
#[command(name = "comic-archiver")]
#[command(author, version, about)]
pub struct Args {
    /// Path to the YAML configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}
