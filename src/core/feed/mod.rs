pub mod fetcher;
pub mod parser;
pub mod types;

use fetcher::{fetch_feed, FetchError};
use parser::{parse_playlist_items, parse_youtube_atom, scrape_blog_items, FeedParseError};
use types::ContentCard;

use super::config::FeedConfig;

/// The blog host rejects requests that do not look like a browser.
pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
pub const BLOG_ITEM_LIMIT: usize = 6;
pub const PLAYLIST_MAX_RESULTS: u32 = 10;

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Parse(#[from] FeedParseError),
    #[error("youtube api key is not configured")]
    MissingApiKey,
    #[error("invalid upstream url: {0}")]
    Url(#[from] url::ParseError),
}

#[derive(Debug, Clone)]
pub struct FeedService {
    client: reqwest::Client,
    config: FeedConfig,
}

impl FeedService {
    pub fn new(client: reqwest::Client, config: FeedConfig) -> Self {
        Self { client, config }
    }

    pub fn name(&self) -> &'static str {
        "feed"
    }

    pub fn status(&self) -> &'static str {
        "ready"
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    pub async fn fetch_blog_posts(&self) -> Result<Vec<ContentCard>, FeedError> {
        let fetched = fetch_feed(
            &self.client,
            &self.config.blog_rss_url,
            Some(BROWSER_USER_AGENT),
        )
        .await?;
        Ok(scrape_blog_items(
            &fetched.text(),
            &self.config.blog_base_url,
            BLOG_ITEM_LIMIT,
        ))
    }

    pub async fn fetch_channel_videos(&self) -> Result<Vec<ContentCard>, FeedError> {
        let url = url::Url::parse_with_params(
            &self.config.youtube_feed_url,
            &[("channel_id", self.config.youtube_channel_id.as_str())],
        )?;
        let fetched = fetch_feed(&self.client, url.as_str(), None).await?;
        Ok(parse_youtube_atom(&fetched.text())?)
    }

    pub async fn fetch_playlist_videos(
        &self,
        playlist_id: &str,
    ) -> Result<Vec<ContentCard>, FeedError> {
        let api_key = self
            .config
            .youtube_api_key
            .as_deref()
            .ok_or(FeedError::MissingApiKey)?;
        let max_results = PLAYLIST_MAX_RESULTS.to_string();
        let endpoint = format!(
            "{}/playlistItems",
            self.config.youtube_api_url.trim_end_matches('/')
        );
        let url = url::Url::parse_with_params(
            &endpoint,
            &[
                ("part", "snippet"),
                ("maxResults", max_results.as_str()),
                ("playlistId", playlist_id),
                ("key", api_key),
            ],
        )?;
        let fetched = fetch_feed(&self.client, url.as_str(), None).await?;
        Ok(parse_playlist_items(&fetched.body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Query;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::get;
    use axum::Router;
    use std::collections::HashMap;

    async fn blog_handler(headers: HeaderMap) -> (StatusCode, String) {
        let agent = headers
            .get(reqwest::header::USER_AGENT)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        if agent != BROWSER_USER_AGENT {
            return (StatusCode::FORBIDDEN, String::new());
        }
        (
            StatusCode::OK,
            include_str!("../../../fixtures/blog.rss.xml").to_string(),
        )
    }

    async fn channel_handler(Query(params): Query<HashMap<String, String>>) -> (StatusCode, String) {
        if params.get("channel_id").map(String::as_str) != Some("UCgrace") {
            return (StatusCode::NOT_FOUND, String::new());
        }
        (
            StatusCode::OK,
            include_str!("../../../fixtures/youtube-channel.atom.xml").to_string(),
        )
    }

    async fn playlist_handler(Query(params): Query<HashMap<String, String>>) -> (StatusCode, String) {
        let expected = [
            ("part", "snippet"),
            ("maxResults", "10"),
            ("playlistId", "PLsermons"),
            ("key", "test-key"),
        ];
        let matches = expected
            .iter()
            .all(|(key, value)| params.get(*key).map(String::as_str) == Some(*value));
        if !matches {
            return (StatusCode::BAD_REQUEST, String::new());
        }
        (
            StatusCode::OK,
            include_str!("../../../fixtures/youtube-playlist.json").to_string(),
        )
    }

    async fn spawn_upstream() -> (String, tokio::task::JoinHandle<()>) {
        let app = Router::new()
            .route("/rss", get(blog_handler))
            .route("/feeds/videos.xml", get(channel_handler))
            .route("/youtube/v3/playlistItems", get(playlist_handler));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("listener should bind");
        let address = listener.local_addr().expect("local addr should exist");
        let join_handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("server should run");
        });
        (format!("http://{address}"), join_handle)
    }

    fn service_for(base: &str, api_key: Option<&str>) -> FeedService {
        FeedService::new(
            reqwest::Client::new(),
            FeedConfig {
                blog_rss_url: format!("{base}/rss"),
                blog_base_url: "https://blog.naver.com".to_string(),
                youtube_channel_id: "UCgrace".to_string(),
                youtube_api_key: api_key.map(ToString::to_string),
                youtube_feed_url: format!("{base}/feeds/videos.xml"),
                youtube_api_url: format!("{base}/youtube/v3"),
                revalidate_secs: 60,
            },
        )
    }

    #[tokio::test]
    async fn fetches_all_three_sources() {
        let (base, server_task) = spawn_upstream().await;
        let service = service_for(&base, Some("test-key"));

        let posts = service.fetch_blog_posts().await.expect("blog should load");
        assert_eq!(posts.len(), 5);

        let videos = service
            .fetch_channel_videos()
            .await
            .expect("channel feed should load");
        assert_eq!(videos.len(), 2);

        let sermons = service
            .fetch_playlist_videos("PLsermons")
            .await
            .expect("playlist should load");
        assert_eq!(sermons.len(), 2);
        assert_eq!(sermons[0].id, "abc123");

        server_task.abort();
    }

    #[tokio::test]
    async fn playlist_mode_requires_api_key() {
        let service = service_for("http://127.0.0.1:9", None);
        let result = service.fetch_playlist_videos("PLsermons").await;
        assert!(matches!(result, Err(FeedError::MissingApiKey)));
    }

    #[tokio::test]
    async fn upstream_status_errors_surface_as_fetch_errors() {
        let (base, server_task) = spawn_upstream().await;
        let mut service = service_for(&base, Some("test-key"));
        service.config.youtube_channel_id = "UCother".to_string();

        let result = service.fetch_channel_videos().await;
        assert!(matches!(
            result,
            Err(FeedError::Fetch(FetchError::HttpStatus(404)))
        ));

        server_task.abort();
    }
}
