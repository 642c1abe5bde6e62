use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "yt-transcripts",
    about = "Collect transcripts for every video in a YouTube playlist",
    version,
    long_about = "Walks YouTube playlists through the Data API, picks a caption track for every video (English first, otherwise the first one offered) and reports which transcripts are available, unavailable or failed."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file (defaults to ./config.yaml, then the user config dir)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch transcripts for every video of one or more playlists
    Run {
        /// Playlist URLs or ids (defaults to app.playlists from the config)
        #[arg(value_name = "PLAYLIST")]
        playlists: Vec<String>,

        /// Process at most this many videos per playlist
        #[arg(short, long, value_name = "COUNT")]
        limit: Option<usize>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Output file path (prints to console if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Print the video ids of a playlist, one per line
    List {
        /// Playlist URL or id
        #[arg(value_name = "PLAYLIST")]
        playlist: String,
    },

    /// Resolve the transcript of a single video
    Transcript {
        /// Video URL or id
        #[arg(value_name = "VIDEO")]
        video: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show or initialise the configuration
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,

        /// Write the default configuration to the config path
        #[arg(long, conflicts_with = "show")]
        init: bool,
    },
}

#[derive(ValueEnum, Clone, Debug)]
pub enum OutputFormat {
    /// Human readable text
    Text,
    /// JSON
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}
