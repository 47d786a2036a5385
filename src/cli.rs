use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate subtitle artifacts for a single video
    Generate {
        /// Task identifier the video belongs to
        #[arg(short, long, default_value_t = 1)]
        task: i64,

        /// Input video file
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Enqueue subtitle generation for several videos and drain the queue
    Run {
        /// Input video files (comma-separated)
        #[arg(short, long)]
        inputs: String,

        /// Scheduling priority for the whole batch
        #[arg(short, long, default_value = "normal")]
        priority: String,
    },

    /// Burn subtitles into a video, producing a dated export file
    Export {
        /// Task identifier the video belongs to
        #[arg(short, long, default_value_t = 1)]
        task: i64,

        /// Input video file
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Write a default configuration file
    InitConfig {
        /// Destination path
        #[arg(default_value = "config.toml")]
        path: PathBuf,
    },
}
