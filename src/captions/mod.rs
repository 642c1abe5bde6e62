use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod youtube;

use crate::config::YoutubeConfig;

/// Everything that can go wrong while looking up or fetching captions
#[derive(thiserror::Error, Debug)]
pub enum CaptionError {
    #[error("Transcripts are disabled for video {0}")]
    TranscriptsDisabled(String),

    #[error("No transcript found for video {0}")]
    NoTranscriptFound(String),

    #[error("Video {video_id} is unavailable: {reason}")]
    VideoUnavailable { video_id: String, reason: String },

    #[error("YouTube is rate limiting requests (captcha page returned)")]
    RateLimited,

    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },

    #[error("Caption request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Could not decode caption data: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Unexpected caption data: {0}")]
    Malformed(String),
}

impl CaptionError {
    /// Status a failed lookup is reported with
    pub fn status(&self) -> TranscriptStatus {
        match self {
            CaptionError::TranscriptsDisabled(_) | CaptionError::NoTranscriptFound(_) => {
                TranscriptStatus::Unavailable
            }
            CaptionError::VideoUnavailable { .. }
            | CaptionError::RateLimited
            | CaptionError::Http { .. }
            | CaptionError::Transport(_)
            | CaptionError::Decode(_)
            | CaptionError::Malformed(_) => TranscriptStatus::Error,
        }
    }

    /// Whether this is a known property of the video rather than a fault
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            CaptionError::TranscriptsDisabled(_)
                | CaptionError::NoTranscriptFound(_)
                | CaptionError::VideoUnavailable { .. }
        )
    }
}

/// Outcome class of a transcript lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptStatus {
    Available,
    Unavailable,
    Error,
}

impl TranscriptStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TranscriptStatus::Available => "available",
            TranscriptStatus::Unavailable => "unavailable",
            TranscriptStatus::Error => "error",
        }
    }
}

impl fmt::Display for TranscriptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One caption track offered for a video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionTrack {
    /// Video the track belongs to
    pub video_id: String,

    /// Language code such as `en` or `pt-BR`
    pub language_code: String,

    /// Display name of the language
    pub language_name: String,

    /// Auto-generated (speech recognition) track
    pub is_generated: bool,

    /// Where the timed text is fetched from
    pub base_url: String,
}

/// Timed text segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionSegment {
    /// Start time in seconds
    pub start: f64,

    /// Duration in seconds
    pub duration: f64,

    /// Segment text
    pub text: String,
}

/// Where caption tracks and their segments come from
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CaptionSource: Send + Sync {
    /// List the tracks of a video in the server's natural order
    async fn list_tracks(&self, video_id: &str) -> Result<Vec<CaptionTrack>, CaptionError>;

    /// Fetch the segments of one track, in chronological order
    async fn fetch_segments(
        &self,
        track: &CaptionTrack,
    ) -> Result<Vec<CaptionSegment>, CaptionError>;
}

/// Normalized result of resolving one video's transcript.
///
/// `status` is `Available` exactly when `text` is non-empty and `language` is
/// set; the constructors are the only way to build one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedTranscript {
    text: String,
    language: Option<String>,
    status: TranscriptStatus,
}

impl ResolvedTranscript {
    /// An available transcript, or `unavailable` if `text` is empty
    pub fn available(text: String, language: String) -> Self {
        if text.is_empty() {
            return Self::unavailable();
        }
        Self {
            text,
            language: Some(language),
            status: TranscriptStatus::Available,
        }
    }

    pub fn unavailable() -> Self {
        Self::empty(TranscriptStatus::Unavailable)
    }

    pub fn error() -> Self {
        Self::empty(TranscriptStatus::Error)
    }

    fn empty(status: TranscriptStatus) -> Self {
        Self {
            text: String::new(),
            language: None,
            status,
        }
    }

    fn from_error(err: &CaptionError) -> Self {
        match err.status() {
            TranscriptStatus::Unavailable => Self::unavailable(),
            TranscriptStatus::Available | TranscriptStatus::Error => Self::error(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    pub fn status(&self) -> TranscriptStatus {
        self.status
    }

    pub fn is_available(&self) -> bool {
        self.status == TranscriptStatus::Available
    }

    pub fn into_text(self) -> String {
        self.text
    }
}

/// Picks a caption track per video and turns it into plain text
pub struct TranscriptResolver<C> {
    source: C,
    preferred_language: String,
}

impl<C: CaptionSource> TranscriptResolver<C> {
    pub fn new(source: C, config: &YoutubeConfig) -> Self {
        Self {
            source,
            preferred_language: config.preferred_language.clone(),
        }
    }

    /// Resolve the transcript of one video. Never fails: every problem is
    /// folded into the returned status.
    pub async fn resolve(&self, video_id: &str) -> ResolvedTranscript {
        match self.try_resolve(video_id).await {
            Ok(resolved) => resolved,
            Err(e) => {
                if e.is_expected() {
                    tracing::warn!("Transcript for video {} not retrievable: {}", video_id, e);
                } else {
                    tracing::error!(
                        "Unexpected error fetching transcript for video {}: {}",
                        video_id,
                        e
                    );
                }
                ResolvedTranscript::from_error(&e)
            }
        }
    }

    async fn try_resolve(&self, video_id: &str) -> Result<ResolvedTranscript, CaptionError> {
        let tracks = self.source.list_tracks(video_id).await?;

        let Some(track) = select_track(&tracks, &self.preferred_language) else {
            tracing::warn!("No transcript found for video {}", video_id);
            return Ok(ResolvedTranscript::unavailable());
        };

        let segments = self.source.fetch_segments(track).await?;
        let text = join_segments(&segments);

        if text.is_empty() {
            tracing::warn!(
                "Transcript for video {} in language {} has no text",
                video_id,
                track.language_code
            );
            return Ok(ResolvedTranscript::unavailable());
        }

        tracing::info!(
            "Successfully fetched transcript for video {} in language {}",
            video_id,
            track.language_code
        );
        Ok(ResolvedTranscript::available(text, track.language_code.clone()))
    }
}

/// Preferred language if offered, else the first track
pub fn select_track<'a>(tracks: &'a [CaptionTrack], preferred: &str) -> Option<&'a CaptionTrack> {
    tracks
        .iter()
        .find(|track| track.language_code == preferred)
        .or_else(|| tracks.first())
}

/// Join segment texts with single spaces
pub fn join_segments(segments: &[CaptionSegment]) -> String {
    segments
        .iter()
        .map(|segment| segment.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}
