use async_trait::async_trait;

use crate::config::AppConfig;

#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("Refusing to store an empty transcript for video {0}")]
    EmptyTranscript(String),
}

/// Destination for finished transcripts
#[async_trait]
pub trait TranscriptSink: Send + Sync {
    /// Store the text of one video and return where it ended up
    async fn store(&self, video_id: &str, text: &str) -> Result<String, StorageError>;
}

/// Stand-in for a document store. Nothing is written anywhere; the returned
/// location is derived from the video id alone.
pub struct PlaceholderDocsSink {
    docs_base_url: String,
}

impl PlaceholderDocsSink {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            docs_base_url: config.docs_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn location_for(&self, video_id: &str) -> String {
        format!(
            "{}/placeholder_{}",
            self.docs_base_url,
            urlencoding::encode(video_id)
        )
    }
}

#[async_trait]
impl TranscriptSink for PlaceholderDocsSink {
    async fn store(&self, video_id: &str, text: &str) -> Result<String, StorageError> {
        if text.is_empty() {
            return Err(StorageError::EmptyTranscript(video_id.to_string()));
        }

        tracing::info!(
            "Storing transcript for video {} ({} characters)",
            video_id,
            text.chars().count()
        );

        let location = self.location_for(video_id);
        tracing::info!("Placeholder document location created: {}", location);
        Ok(location)
    }
}
