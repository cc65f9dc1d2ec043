use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "adp-agent")]
#[command(about = "Inspect capability manifests and dry-run instruction dispatch against them.")]
pub(crate) struct Cli {
    /// Override config directory.
    #[arg(long, global = true)]
    pub(crate) conf: Option<PathBuf>,

    /// Debug logging (ignored when RUST_LOG is set).
    #[arg(long, short, global = true)]
    pub(crate) verbose: bool,

    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Parse and validate a manifest file; print it normalized.
    Validate {
        /// Path to the manifest JSON.
        manifest: PathBuf,
    },
    /// Match, extract, validate and build the message for one instruction. No network.
    Plan {
        /// Path to the manifest JSON.
        #[arg(long)]
        manifest: PathBuf,

        /// Free-text instruction.
        #[arg(long)]
        text: String,

        /// Caller-supplied parameter, `Name=value` (repeatable).
        #[arg(long = "param", value_name = "NAME=VALUE")]
        params: Vec<String>,

        /// Override the matcher acceptance floor.
        #[arg(long)]
        min_confidence: Option<f64>,
    },
    /// Print the manifest JSON Schema.
    Schema,
}
