//! Command-line argument definitions for the Narragraph CLI.
//!
//! This module defines the [`Args`] structure parsed from the command line
//! using [`clap`]. Arguments control input/output paths, configuration file
//! selection, extraction tier and logging verbosity.

use clap::Parser;

/// Command-line arguments for the Narragraph tool
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Transcript file: a JSON array of segments, or plain text
    #[arg(help = "Path to the input transcript")]
    pub input: String,

    /// Path to the output JSON file, `-` for standard output
    #[arg(short, long, default_value = "out.json")]
    pub output: String,

    /// Path to configuration file (TOML)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Never call the external model, even when configured
    #[arg(long)]
    pub rules_only: bool,
}
