use async_trait::async_trait;
use reqwest::header::ACCEPT_LANGUAGE;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use super::{CaptionError, CaptionSegment, CaptionSource, CaptionTrack};
use crate::config::YoutubeConfig;

const PLAYER_RESPONSE_MARKER: &str = "ytInitialPlayerResponse = ";
const CAPTCHA_MARKER: &str = "class=\"g-recaptcha\"";

/// Caption source backed by the public watch page and the timedtext endpoint
pub struct YoutubeCaptions {
    client: Client,
    watch_base_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayerResponse {
    playability_status: Option<PlayabilityStatus>,
    captions: Option<Captions>,
}

#[derive(Debug, Deserialize)]
struct PlayabilityStatus {
    status: String,
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Captions {
    player_captions_tracklist_renderer: Option<TracklistRenderer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TracklistRenderer {
    #[serde(default)]
    caption_tracks: Vec<RawTrack>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTrack {
    base_url: String,
    language_code: String,
    name: Option<TrackName>,
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrackName {
    simple_text: Option<String>,
    #[serde(default)]
    runs: Vec<TextRun>,
}

#[derive(Debug, Deserialize)]
struct TextRun {
    text: String,
}

impl TrackName {
    fn display(&self) -> Option<String> {
        self.simple_text.clone().or_else(|| {
            let joined: String = self.runs.iter().map(|run| run.text.as_str()).collect();
            (!joined.is_empty()).then_some(joined)
        })
    }
}

/// timedtext `fmt=json3` document
#[derive(Debug, Deserialize)]
struct Json3Document {
    #[serde(default)]
    events: Vec<Json3Event>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Json3Event {
    #[serde(default)]
    t_start_ms: u64,
    #[serde(default)]
    d_duration_ms: u64,
    segs: Option<Vec<Json3Seg>>,
}

#[derive(Debug, Deserialize)]
struct Json3Seg {
    #[serde(default)]
    utf8: String,
}

impl YoutubeCaptions {
    pub fn new(config: &YoutubeConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    pub fn with_client(client: Client, config: &YoutubeConfig) -> Self {
        Self {
            client,
            watch_base_url: config.watch_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Timed text URL for a track, forced to the json3 format
    fn timedtext_url(&self, track: &CaptionTrack) -> Result<Url, CaptionError> {
        let mut url = match Url::parse(&track.base_url) {
            Ok(url) => url,
            Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(&self.watch_base_url)
                .and_then(|base| base.join(&track.base_url))
                .map_err(|e| {
                    CaptionError::Malformed(format!("caption URL {}: {}", track.base_url, e))
                })?,
            Err(e) => {
                return Err(CaptionError::Malformed(format!(
                    "caption URL {}: {}",
                    track.base_url, e
                )))
            }
        };

        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| key != "fmt")
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();
        url.query_pairs_mut()
            .clear()
            .extend_pairs(pairs)
            .append_pair("fmt", "json3");

        Ok(url)
    }
}

#[async_trait]
impl CaptionSource for YoutubeCaptions {
    async fn list_tracks(&self, video_id: &str) -> Result<Vec<CaptionTrack>, CaptionError> {
        let url = format!("{}/watch", self.watch_base_url);
        tracing::debug!("Loading watch page for video {}", video_id);

        let response = self
            .client
            .get(&url)
            .query(&[("v", video_id)])
            .header(ACCEPT_LANGUAGE, "en-US")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CaptionError::Http {
                status: status.as_u16(),
                url,
            });
        }

        let html = response.text().await?;
        parse_caption_tracks(video_id, &html)
    }

    async fn fetch_segments(
        &self,
        track: &CaptionTrack,
    ) -> Result<Vec<CaptionSegment>, CaptionError> {
        let url = self.timedtext_url(track)?;
        tracing::debug!(
            "Fetching {} captions for video {}",
            track.language_code,
            track.video_id
        );

        let response = self
            .client
            .get(url.clone())
            .header(ACCEPT_LANGUAGE, "en-US")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CaptionError::Http {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Err(CaptionError::NoTranscriptFound(track.video_id.clone()));
        }

        parse_json3(&body)
    }
}

/// Find the player response JSON embedded in a watch page
fn extract_player_response(html: &str) -> Option<Result<Value, serde_json::Error>> {
    let start = html.find(PLAYER_RESPONSE_MARKER)? + PLAYER_RESPONSE_MARKER.len();
    serde_json::Deserializer::from_str(&html[start..])
        .into_iter::<Value>()
        .next()
}

/// Read the caption tracks out of a watch page.
///
/// Manually created tracks come first, then auto-generated ones, each group
/// in the order the page lists them.
pub fn parse_caption_tracks(
    video_id: &str,
    html: &str,
) -> Result<Vec<CaptionTrack>, CaptionError> {
    let player = match extract_player_response(html) {
        Some(parsed) => parsed?,
        None if html.contains(CAPTCHA_MARKER) => return Err(CaptionError::RateLimited),
        None => {
            return Err(CaptionError::Malformed(format!(
                "watch page for {} has no player response",
                video_id
            )))
        }
    };

    let response: PlayerResponse = serde_json::from_value(player)?;

    if let Some(playability) = response.playability_status {
        if playability.status != "OK" {
            return Err(CaptionError::VideoUnavailable {
                video_id: video_id.to_string(),
                reason: playability.reason.unwrap_or(playability.status),
            });
        }
    }

    let raw_tracks = response
        .captions
        .and_then(|captions| captions.player_captions_tracklist_renderer)
        .map(|renderer| renderer.caption_tracks)
        .unwrap_or_default();

    if raw_tracks.is_empty() {
        return Err(CaptionError::TranscriptsDisabled(video_id.to_string()));
    }

    let (generated, manual): (Vec<CaptionTrack>, Vec<CaptionTrack>) = raw_tracks
        .into_iter()
        .map(|raw| CaptionTrack {
            video_id: video_id.to_string(),
            language_name: raw
                .name
                .as_ref()
                .and_then(TrackName::display)
                .unwrap_or_else(|| raw.language_code.clone()),
            is_generated: raw.kind.as_deref() == Some("asr"),
            language_code: raw.language_code,
            base_url: raw.base_url,
        })
        .partition(|track| track.is_generated);

    Ok(manual.into_iter().chain(generated).collect())
}

/// Decode a json3 timedtext body into segments, skipping events without text
pub fn parse_json3(body: &str) -> Result<Vec<CaptionSegment>, CaptionError> {
    let document: Json3Document = serde_json::from_str(body)?;

    Ok(document
        .events
        .into_iter()
        .filter_map(|event| {
            let text: String = event
                .segs?
                .iter()
                .map(|seg| seg.utf8.as_str())
                .collect();
            let text = text.trim();
            if text.is_empty() {
                return None;
            }
            Some(CaptionSegment {
                start: event.t_start_ms as f64 / 1000.0,
                duration: event.d_duration_ms as f64 / 1000.0,
                text: text.to_string(),
            })
        })
        .collect())
}
