use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::captions::{CaptionSource, ResolvedTranscript, TranscriptResolver, TranscriptStatus};
use crate::config::Config;
use crate::playlist::{ListingError, PlaylistEnumerator, PlaylistSource};
use crate::storage::TranscriptSink;
use crate::utils;

/// What happened to one video of a playlist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoReport {
    pub video_id: String,
    pub status: TranscriptStatus,
    pub language: Option<String>,

    /// Length of the transcript in characters
    pub characters: usize,

    /// Where the transcript was stored, if it was
    pub document: Option<String>,
}

/// Result of processing one playlist
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistReport {
    pub run_id: Uuid,
    pub playlist_id: String,

    /// Videos the playlist listed, before any cap was applied
    pub total_videos: usize,

    pub videos: Vec<VideoReport>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// A playlist whose listing failed, so none of its videos were processed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistFailure {
    pub playlist_id: String,
    pub error: String,
}

/// Outcome of a multi-playlist run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunReport {
    pub playlists: Vec<PlaylistReport>,
    pub failures: Vec<PlaylistFailure>,
}

impl RunReport {
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

impl PlaylistReport {
    pub fn count(&self, status: TranscriptStatus) -> usize {
        self.videos.iter().filter(|video| video.status == status).count()
    }

    pub fn stored(&self) -> usize {
        self.videos.iter().filter(|video| video.document.is_some()).count()
    }
}

/// Enumerates a playlist, resolves every transcript and hands the text to a sink
pub struct PlaylistProcessor<S, C, K> {
    enumerator: PlaylistEnumerator<S>,
    resolver: TranscriptResolver<C>,
    sink: K,
    max_videos: Option<usize>,
    show_progress: bool,
}

impl<S, C, K> PlaylistProcessor<S, C, K>
where
    S: PlaylistSource,
    C: CaptionSource,
    K: TranscriptSink,
{
    pub fn new(listing: S, captions: C, sink: K, config: &Config) -> Self {
        Self {
            enumerator: PlaylistEnumerator::new(listing, &config.youtube),
            resolver: TranscriptResolver::new(captions, &config.youtube),
            sink,
            max_videos: config.app.max_videos_per_playlist,
            show_progress: false,
        }
    }

    /// Override the configured per-playlist video cap
    pub fn with_max_videos(mut self, max_videos: Option<usize>) -> Self {
        self.max_videos = max_videos;
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn enumerator(&self) -> &PlaylistEnumerator<S> {
        &self.enumerator
    }

    /// Process one playlist. Only a failed listing is an error; per-video
    /// problems end up in the report.
    pub async fn process_playlist(
        &self,
        playlist_id: &str,
    ) -> Result<PlaylistReport, ListingError> {
        let started_at = Utc::now();
        let run_id = Uuid::new_v4();
        tracing::info!("Processing playlist {} (run {})", playlist_id, run_id);

        let video_ids = self.enumerator.list_members(playlist_id).await?;
        let total_videos = video_ids.len();
        tracing::info!("Found {} videos in playlist", total_videos);

        let selected = match self.max_videos {
            Some(cap) if cap < total_videos => {
                tracing::info!(
                    "Limiting playlist {} to the first {} videos",
                    playlist_id,
                    cap
                );
                &video_ids[..cap]
            }
            _ => &video_ids[..],
        };

        let progress = self.progress_bar(selected.len() as u64);
        let mut videos = Vec::with_capacity(selected.len());

        for (index, video_id) in selected.iter().enumerate() {
            tracing::info!("Processing video {}/{}: {}", index + 1, selected.len(), video_id);
            progress.set_message(video_id.clone());

            let resolved = self.resolver.resolve(video_id).await;
            videos.push(self.record(video_id, resolved).await);

            progress.inc(1);
        }

        progress.finish_and_clear();
        tracing::info!("Playlist {} processing completed", playlist_id);

        Ok(PlaylistReport {
            run_id,
            playlist_id: playlist_id.to_string(),
            total_videos,
            videos,
            started_at,
            finished_at: Utc::now(),
        })
    }

    /// Process playlists one after another. A failed listing is recorded and
    /// the run moves on to the next playlist.
    pub async fn process_playlists(&self, playlist_ids: &[String]) -> RunReport {
        let mut run = RunReport::default();

        for (index, playlist_id) in playlist_ids.iter().enumerate() {
            tracing::info!(
                "Processing playlist {}/{}: {}",
                index + 1,
                playlist_ids.len(),
                playlist_id
            );
            match self.process_playlist(playlist_id).await {
                Ok(report) => run.playlists.push(report),
                Err(e) => {
                    tracing::error!("Failed to list playlist {}: {}", playlist_id, e);
                    run.failures.push(PlaylistFailure {
                        playlist_id: playlist_id.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        run
    }

    async fn record(&self, video_id: &str, resolved: ResolvedTranscript) -> VideoReport {
        let status = resolved.status();
        let language = resolved.language().map(str::to_string);
        let characters = resolved.text().chars().count();

        let document = if resolved.is_available() {
            tracing::info!(
                "Transcript available: {} characters, language: {}",
                characters,
                language.as_deref().unwrap_or("unknown")
            );
            tracing::debug!(
                "Transcript preview for {}: {}",
                video_id,
                utils::preview(resolved.text(), 80)
            );
            match self.sink.store(video_id, resolved.text()).await {
                Ok(location) => {
                    tracing::info!("Transcript stored: {}", location);
                    Some(location)
                }
                Err(e) => {
                    tracing::error!("Failed to store transcript for video {}: {}", video_id, e);
                    None
                }
            }
        } else {
            tracing::warn!("Transcript not available for {}: {}", video_id, status);
            None
        };

        VideoReport {
            video_id: video_id.to_string(),
            status,
            language,
            characters,
            document,
        }
    }

    fn progress_bar(&self, len: u64) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let progress = ProgressBar::new(len);
        progress.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        progress
    }
}
