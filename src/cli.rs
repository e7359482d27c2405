use audiomirror::engine::LossyPolicy;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "audiomirror")]
#[command(about = "Mirror a music library into another audio format", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Read settings from this file instead of the default config location
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Trees and overrides shared by `run` and `plan`
#[derive(Args, Debug, Clone)]
pub struct BatchArgs {
    /// Source music library
    pub source: PathBuf,

    /// Output library (mirrors the source layout)
    pub destination: PathBuf,

    /// Target format (see `audiomirror formats`)
    #[arg(short, long)]
    pub format: Option<String>,

    /// Bitrate in kbps for transcoded files
    #[arg(short, long)]
    pub bitrate: Option<u32>,

    /// Number of concurrent workers (defaults to the CPU count)
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Skip files whose directory path contains this text (repeatable)
    #[arg(long = "blacklist", value_name = "TEXT")]
    pub blacklist: Vec<String>,

    /// What to do with already-lossy sources
    #[arg(long, value_enum)]
    pub lossy: Option<LossyPolicy>,

    /// ffmpeg binary to run
    #[arg(long, value_name = "PATH")]
    pub ffmpeg: Option<PathBuf>,

    /// Kill a transcode that runs longer than this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Transcode and copy the library into the destination tree
    Run {
        #[command(flatten)]
        batch: BatchArgs,

        /// Print the final summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the jobs and ffmpeg commands a run would execute, without running them
    Plan {
        #[command(flatten)]
        batch: BatchArgs,
    },

    /// List the supported output formats
    Formats,

    /// Check that ffmpeg is installed and list how many encoders it has
    CheckFfmpeg {
        /// ffmpeg binary to check
        #[arg(long, value_name = "PATH")]
        ffmpeg: Option<PathBuf>,
    },

    /// Show config status and location, or create default config if missing
    InitConfig,
}

pub fn parse() -> Cli {
    Cli::parse()
}
