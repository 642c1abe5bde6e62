use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::{ListingError, PlaylistPage, PlaylistSource};
use crate::config::YoutubeConfig;

/// playlistItems.list client for the YouTube Data API v3
pub struct YoutubeDataApi {
    client: Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItemListResponse {
    #[serde(default)]
    items: Vec<PlaylistItem>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItem {
    content_details: ContentDetails,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContentDetails {
    video_id: String,
}

/// Google API error envelope
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

impl YoutubeDataApi {
    pub fn new(config: &YoutubeConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    pub fn with_client(client: Client, config: &YoutubeConfig) -> Self {
        Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        }
    }
}

#[async_trait]
impl PlaylistSource for YoutubeDataApi {
    async fn fetch_page(
        &self,
        playlist_id: &str,
        page_size: u32,
        cursor: Option<String>,
    ) -> Result<PlaylistPage, ListingError> {
        let url = format!("{}/playlistItems", self.base_url);

        let mut query = vec![
            ("part", "contentDetails".to_string()),
            ("playlistId", playlist_id.to_string()),
            ("maxResults", page_size.to_string()),
            ("key", self.api_key.clone()),
        ];
        if let Some(token) = cursor {
            query.push(("pageToken", token));
        }

        tracing::debug!(
            "Requesting playlist page for {} (max {})",
            playlist_id,
            page_size
        );

        let response = self.client.get(&url).query(&query).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ListingError::Api {
                status: status.as_u16(),
                message: api_error_message(&body),
            });
        }

        parse_playlist_page(&body)
    }
}

/// Decode a playlistItems.list response body
pub fn parse_playlist_page(body: &str) -> Result<PlaylistPage, ListingError> {
    let response: PlaylistItemListResponse = serde_json::from_str(body)?;

    Ok(PlaylistPage {
        video_ids: response
            .items
            .into_iter()
            .map(|item| item.content_details.video_id)
            .collect(),
        next_cursor: response.next_page_token,
    })
}

/// Pull the human readable message out of a Google error body
fn api_error_message(body: &str) -> String {
    match serde_json::from_str::<ApiErrorResponse>(body) {
        Ok(parsed) => parsed.error.message,
        Err(_) if body.trim().is_empty() => "empty response body".to_string(),
        Err(_) => body.chars().take(200).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playlist::PlaylistEnumerator;
    use crate::testing::{param, TestServer};

    #[test]
    fn test_parse_page_with_token() {
        let body = r#"{
            "kind": "youtube#playlistItemListResponse",
            "nextPageToken": "EAAaBlBUOkNESQ",
            "items": [
                {"kind": "youtube#playlistItem", "contentDetails": {"videoId": "dQw4w9WgXcQ", "videoPublishedAt": "2009-10-25T06:57:33Z"}},
                {"kind": "youtube#playlistItem", "contentDetails": {"videoId": "9bZkp7q19f0"}}
            ],
            "pageInfo": {"totalResults": 120, "resultsPerPage": 2}
        }"#;

        let page = parse_playlist_page(body).unwrap();
        assert_eq!(page.video_ids, vec!["dQw4w9WgXcQ", "9bZkp7q19f0"]);
        assert_eq!(page.next_cursor.as_deref(), Some("EAAaBlBUOkNESQ"));
    }

    #[test]
    fn test_parse_last_page() {
        let body = r#"{"items": [{"contentDetails": {"videoId": "abc"}}]}"#;
        let page = parse_playlist_page(body).unwrap();
        assert_eq!(page.video_ids, vec!["abc"]);
        assert!(page.next_cursor.is_none());
    }

    #[test]
    fn test_parse_page_without_items() {
        let page = parse_playlist_page("{}").unwrap();
        assert!(page.video_ids.is_empty());
    }

    #[test]
    fn test_item_without_video_id_is_a_decode_error() {
        let body = r#"{"items": [{"contentDetails": {}}]}"#;
        assert!(matches!(parse_playlist_page(body), Err(ListingError::Decode(_))));
    }

    #[test]
    fn test_api_error_message() {
        let body = r#"{"error": {"code": 404, "message": "The playlist identified with the request's playlistId parameter cannot be found."}}"#;
        assert!(api_error_message(body).starts_with("The playlist identified"));
        assert_eq!(api_error_message(""), "empty response body");
        assert_eq!(api_error_message("Bad Gateway"), "Bad Gateway");
    }

    #[tokio::test]
    async fn test_pages_are_requested_with_cursor_size_and_key() {
        let server = TestServer::start(|url| match param(url, "pageToken").as_deref() {
            None => (
                200,
                r#"{"items": [{"contentDetails": {"videoId": "v1"}}], "nextPageToken": "CAEQAA"}"#
                    .to_string(),
            ),
            Some("CAEQAA") => (
                200,
                r#"{"items": [{"contentDetails": {"videoId": "v2"}}]}"#.to_string(),
            ),
            Some(_) => (400, "unexpected cursor".to_string()),
        })
        .await;

        let mut config = server.config();
        config.youtube.page_size = 25;
        let api = YoutubeDataApi::with_client(Client::new(), &config.youtube);
        let ids = PlaylistEnumerator::new(api, &config.youtube)
            .list_members("PLabc")
            .await
            .unwrap();
        assert_eq!(ids, vec!["v1", "v2"]);

        let requests = server.requests();
        assert_eq!(requests.len(), 2);
        for request in &requests {
            assert_eq!(request.path(), "/youtube/v3/playlistItems");
            assert_eq!(param(request, "part").as_deref(), Some("contentDetails"));
            assert_eq!(param(request, "playlistId").as_deref(), Some("PLabc"));
            assert_eq!(param(request, "maxResults").as_deref(), Some("25"));
            assert_eq!(param(request, "key").as_deref(), Some("test-key"));
        }
        assert_eq!(param(&requests[0], "pageToken"), None);
        assert_eq!(param(&requests[1], "pageToken").as_deref(), Some("CAEQAA"));
    }

    #[tokio::test]
    async fn test_error_status_carries_google_message() {
        let server = TestServer::start(|_| {
            (
                403,
                r#"{"error": {"code": 403, "message": "The request cannot be completed because you have exceeded your quota."}}"#
                    .to_string(),
            )
        })
        .await;

        let api = YoutubeDataApi::with_client(Client::new(), &server.config().youtube);
        let err = api.fetch_page("PLabc", 50, None).await.unwrap_err();

        match err {
            ListingError::Api { status, message } => {
                assert_eq!(status, 403);
                assert!(message.starts_with("The request cannot be completed"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_error_status_without_body() {
        let server = TestServer::start(|_| (500, String::new())).await;

        let api = YoutubeDataApi::with_client(Client::new(), &server.config().youtube);
        let err = api.fetch_page("PLabc", 50, None).await.unwrap_err();

        assert!(matches!(
            err,
            ListingError::Api { status: 500, ref message } if message == "empty response body"
        ));
    }

    #[tokio::test]
    async fn test_undecodable_page_is_a_decode_error() {
        let server = TestServer::start(|_| (200, "<html>".to_string())).await;

        let api = YoutubeDataApi::with_client(Client::new(), &server.config().youtube);
        let err = api.fetch_page("PLabc", 50, None).await.unwrap_err();
        assert!(matches!(err, ListingError::Decode(_)));
    }
}
