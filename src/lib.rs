//! yt-transcripts - walk YouTube playlists and collect a transcript for every video
//!
//! The library is split the same way the work flows: the [`playlist`] module
//! enumerates the videos of a playlist, the [`captions`] module resolves one
//! transcript per video, [`storage`] hands finished text to a document sink and
//! [`pipeline`] ties the three together into a per-playlist report.

pub mod captions;
pub mod cli;
pub mod config;
pub mod output;
pub mod pipeline;
pub mod playlist;
pub mod storage;
pub mod utils;

#[cfg(test)]
mod testing;

pub use captions::{CaptionSource, ResolvedTranscript, TranscriptResolver, TranscriptStatus};
pub use cli::{Cli, Commands, OutputFormat};
pub use config::Config;
pub use pipeline::{PlaylistFailure, PlaylistProcessor, PlaylistReport, RunReport, VideoReport};
pub use playlist::{ListingError, PlaylistEnumerator, PlaylistSource};
pub use storage::{PlaceholderDocsSink, TranscriptSink};

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;

/// Error types for user supplied input
#[derive(thiserror::Error, Debug)]
pub enum FetcherError {
    #[error("Invalid playlist reference: {0}")]
    InvalidPlaylist(String),

    #[error("Invalid video reference: {0}")]
    InvalidVideo(String),

    #[error("YouTube API key is not configured (set youtube.api_key or YOUTUBE_API_KEY)")]
    MissingApiKey,

    #[error("No playlists given and none configured under app.playlists")]
    NoPlaylists,
}
