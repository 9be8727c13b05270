use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "livets")]
#[command(author, version, about = "Live FLV to MPEG-TS transmuxer")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Transmux FLV files into TS segments, one stream per file
    Transmux {
        /// FLV files to transmux
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output directory (overrides config)
        #[arg(short, long)]
        out_dir: Option<PathBuf>,

        /// Minimum segment length in milliseconds (overrides config)
        #[arg(short, long)]
        interval_ms: Option<u32>,
    },

    /// Demux a TS segment and display its programs and PES packets
    Inspect {
        /// Segment to inspect
        #[arg(required = true)]
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
