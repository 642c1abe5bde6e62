use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub mod youtube;

use crate::config::YoutubeConfig;

/// Errors that abort a playlist enumeration
#[derive(thiserror::Error, Debug)]
pub enum ListingError {
    #[error("Playlist id must not be empty")]
    EmptyCollectionId,

    #[error("Playlist request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("YouTube API returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Could not decode playlist page: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Server repeated page cursor {cursor:?} after {pages} pages")]
    RepeatedCursor { cursor: String, pages: usize },

    #[error("Playlist still had more pages after the limit of {0}")]
    PageLimit(usize),
}

/// One page of a playlist listing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistPage {
    /// Video ids in server order
    pub video_ids: Vec<String>,

    /// Cursor for the following page, absent on the last one
    pub next_cursor: Option<String>,
}

/// A paginated listing service for playlist members
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PlaylistSource: Send + Sync {
    /// Fetch one page of at most `page_size` items, starting at `cursor`
    async fn fetch_page(
        &self,
        playlist_id: &str,
        page_size: u32,
        cursor: Option<String>,
    ) -> Result<PlaylistPage, ListingError>;
}

/// Follows page cursors until a playlist is exhausted
pub struct PlaylistEnumerator<S> {
    source: S,
    page_size: u32,
    max_pages: usize,
}

impl<S: PlaylistSource> PlaylistEnumerator<S> {
    pub fn new(source: S, config: &YoutubeConfig) -> Self {
        Self {
            source,
            page_size: config.page_size,
            max_pages: config.max_pages,
        }
    }

    /// Collect every video id of a playlist in server order.
    ///
    /// Any page failure aborts the whole listing and nothing collected so far
    /// is returned. A cursor the server already issued, or running past
    /// `max_pages`, is treated as a failure as well.
    pub async fn list_members(&self, playlist_id: &str) -> Result<Vec<String>, ListingError> {
        if playlist_id.trim().is_empty() {
            return Err(ListingError::EmptyCollectionId);
        }

        let mut video_ids = Vec::new();
        let mut cursor: Option<String> = None;
        let mut seen_cursors = HashSet::new();
        let mut pages = 0usize;

        loop {
            if pages >= self.max_pages {
                tracing::error!("Playlist {} exceeded {} pages", playlist_id, self.max_pages);
                return Err(ListingError::PageLimit(self.max_pages));
            }

            let page = match self
                .source
                .fetch_page(playlist_id, self.page_size, cursor.take())
                .await
            {
                Ok(page) => page,
                Err(e) => {
                    tracing::error!("Error fetching playlist {}: {}", playlist_id, e);
                    return Err(e);
                }
            };
            pages += 1;
            video_ids.extend(page.video_ids);

            match page.next_cursor.filter(|c| !c.is_empty()) {
                None => break,
                Some(next) => {
                    if !seen_cursors.insert(next.clone()) {
                        tracing::error!("Playlist {} repeated cursor {:?}", playlist_id, next);
                        return Err(ListingError::RepeatedCursor { cursor: next, pages });
                    }
                    tracing::info!(
                        "Fetched {} videos so far from playlist {}",
                        video_ids.len(),
                        playlist_id
                    );
                    cursor = Some(next);
                }
            }
        }

        tracing::info!(
            "Successfully fetched {} total videos from playlist {} ({} pages)",
            video_ids.len(),
            playlist_id,
            pages
        );
        Ok(video_ids)
    }
}
