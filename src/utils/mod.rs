use url::{form_urlencoded, Url};

use crate::FetcherError;

fn is_id_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

fn looks_like_id(value: &str) -> bool {
    !value.is_empty() && value.chars().all(is_id_char)
}

fn list_param(query: &str) -> Option<String> {
    form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == "list")
        .map(|(_, value)| value.into_owned())
}

/// Accept a playlist URL (anything carrying a `list` parameter, with or
/// without a scheme) or a bare playlist id
pub fn extract_playlist_id(input: &str) -> Result<String, FetcherError> {
    let input = input.trim();
    let invalid = || FetcherError::InvalidPlaylist(input.to_string());

    let candidate = match Url::parse(input) {
        Ok(parsed) => parsed.query().and_then(list_param),
        Err(_) => match input.split_once('?') {
            Some((_, rest)) => rest.split('#').next().and_then(list_param),
            None if looks_like_id(input) => Some(input.to_string()),
            None => None,
        },
    };

    candidate.filter(|id| looks_like_id(id)).ok_or_else(invalid)
}

/// Accept a watch/short/embed URL or a bare video id
pub fn extract_video_id(input: &str) -> Result<String, FetcherError> {
    let input = input.trim();
    let invalid = || FetcherError::InvalidVideo(input.to_string());

    let Ok(parsed) = Url::parse(input) else {
        return if looks_like_id(input) {
            Ok(input.to_string())
        } else {
            Err(invalid())
        };
    };

    let host = parsed.host_str().unwrap_or_default().trim_start_matches("www.");
    let candidate = if host == "youtu.be" {
        parsed
            .path_segments()
            .and_then(|mut segments| segments.next())
            .map(str::to_string)
    } else if let Some((_, id)) = parsed.query_pairs().find(|(key, _)| key == "v") {
        Some(id.into_owned())
    } else {
        let segments: Vec<&str> = parsed
            .path_segments()
            .map(|s| s.collect())
            .unwrap_or_default();
        match segments.as_slice() {
            ["embed" | "shorts" | "v" | "live", id, ..] => Some(id.to_string()),
            _ => None,
        }
    };

    candidate.filter(|id| looks_like_id(id)).ok_or_else(invalid)
}

/// Format duration in human-readable format
pub fn format_duration(seconds: f64) -> String {
    let total_seconds = seconds.max(0.0) as u64;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

/// First `max_chars` characters of `text`, with an ellipsis when cut
pub fn preview(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}…", head)
    } else {
        head
    }
}
