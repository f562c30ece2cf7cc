pub mod core;

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::core::config::{AppConfig, ConfigError};
use crate::core::counselor::{CounselError, CounselReply, CounselRequest};
use crate::core::feed::types::{ContentCard, ContentKind};
use crate::core::merge::DEFAULT_LISTING_LIMIT;
use crate::core::proxy::{ProxyError, ProxyRequest};
use crate::core::storage::models::NewContent;
use crate::core::storage::{ContentRepository, StorageError};
use crate::core::AppServices;

const TEXT_PLAIN_UTF8: &str = "text/plain; charset=utf-8";
const MAX_LISTING_LIMIT: i64 = 200;

#[derive(Clone)]
pub struct SharedState {
    services: Arc<AppServices>,
}

impl SharedState {
    pub fn new(services: AppServices) -> Self {
        Self {
            services: Arc::new(services),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct YoutubeQuery {
    #[serde(rename = "playlistId")]
    playlist_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ListContentsQuery {
    #[serde(rename = "type")]
    kind: String,
    #[serde(rename = "playlistId")]
    playlist_id: Option<String>,
    limit: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateContentRequest {
    #[serde(rename = "type")]
    kind: ContentKind,
    title: String,
    #[serde(default)]
    link_url: String,
    thumbnail: Option<String>,
    description: Option<String>,
    published_at: String,
}

#[derive(Debug, Clone, Serialize)]
struct BlogPostDto {
    id: String,
    title: String,
    link: String,
    #[serde(rename = "pubDate")]
    pub_date: String,
    description: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct ContentCardDto {
    id: String,
    #[serde(rename = "type")]
    kind: ContentKind,
    title: String,
    link: String,
    published_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    thumbnail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, thiserror::Error)]
enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<ProxyError> for ApiError {
    fn from(error: ProxyError) -> Self {
        match error {
            ProxyError::MissingUrl | ProxyError::InvalidUrl(_) => {
                ApiError::BadRequest(error.to_string())
            }
            ProxyError::HostNotAllowed(_) => ApiError::Forbidden(error.to_string()),
            ProxyError::Upstream(_) | ProxyError::Request(_) => {
                tracing::error!(%error, "text proxy failed");
                ApiError::Internal(error.to_string())
            }
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(error: StorageError) -> Self {
        tracing::error!(%error, "content store failed");
        ApiError::Internal("content store is unavailable".to_string())
    }
}

impl From<CounselError> for ApiError {
    fn from(error: CounselError) -> Self {
        ApiError::BadRequest(error.to_string())
    }
}

/// Logs the detailed cause and answers with a generic message.
fn upstream_failure<E: std::fmt::Display>(message: &'static str) -> impl FnOnce(E) -> ApiError {
    move |error| {
        tracing::error!(%error, "{message}");
        ApiError::Internal(message.to_string())
    }
}

fn card_to_dto(card: ContentCard) -> ContentCardDto {
    ContentCardDto {
        id: card.id,
        kind: card.kind,
        title: card.title,
        link: card.link,
        published_at: card.published_at,
        thumbnail: card.thumbnail,
        description: card.description,
    }
}

fn card_to_blog_post(card: ContentCard) -> BlogPostDto {
    BlogPostDto {
        id: card.id,
        title: card.title,
        link: card.link,
        pub_date: card.published_at,
        description: card.description.unwrap_or_default(),
    }
}

fn revalidate_header(state: &SharedState) -> [(header::HeaderName, String); 1] {
    let seconds = state.services.feed.config().revalidate_secs;
    [(
        header::CACHE_CONTROL,
        format!("public, s-maxage={seconds}, stale-while-revalidate"),
    )]
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

async fn naver_rss(State(state): State<SharedState>) -> Result<Response, ApiError> {
    let posts = state
        .services
        .feed
        .fetch_blog_posts()
        .await
        .map_err(upstream_failure("Failed to fetch blog feed"))?;
    let body: Vec<BlogPostDto> = posts.into_iter().map(card_to_blog_post).collect();
    Ok((revalidate_header(&state), Json(body)).into_response())
}

async fn youtube(
    State(state): State<SharedState>,
    Query(query): Query<YoutubeQuery>,
) -> Result<Response, ApiError> {
    let cards = match non_blank(query.playlist_id.as_deref()) {
        Some(playlist_id) => state
            .services
            .feed
            .fetch_playlist_videos(playlist_id)
            .await
            .map_err(upstream_failure("Failed to fetch playlist videos"))?,
        None => state
            .services
            .feed
            .fetch_channel_videos()
            .await
            .map_err(upstream_failure("Failed to fetch channel videos"))?,
    };
    let body: Vec<ContentCardDto> = cards.into_iter().map(card_to_dto).collect();
    Ok((revalidate_header(&state), Json(body)).into_response())
}

async fn qt_content(
    State(state): State<SharedState>,
    Json(request): Json<ProxyRequest>,
) -> Result<Response, ApiError> {
    let upstream = state.services.proxy.open(&request).await?;
    let body = Body::from_stream(upstream.bytes_stream());
    Ok(([(header::CONTENT_TYPE, TEXT_PLAIN_UTF8)], body).into_response())
}

async fn list_contents(
    State(state): State<SharedState>,
    Query(query): Query<ListContentsQuery>,
) -> Result<Response, ApiError> {
    let kind = query
        .kind
        .parse::<ContentKind>()
        .map_err(|error| ApiError::BadRequest(error.to_string()))?;
    let limit = query
        .limit
        .unwrap_or(DEFAULT_LISTING_LIMIT)
        .clamp(1, MAX_LISTING_LIMIT);
    let cards = state
        .services
        .listing
        .load(kind, non_blank(query.playlist_id.as_deref()), limit)
        .await
        .map_err(upstream_failure("Failed to load contents"))?;
    let body: Vec<ContentCardDto> = cards.into_iter().map(card_to_dto).collect();
    Ok((revalidate_header(&state), Json(body)).into_response())
}

async fn create_content(
    State(state): State<SharedState>,
    Json(request): Json<CreateContentRequest>,
) -> Result<(StatusCode, Json<ContentCardDto>), ApiError> {
    if request.title.trim().is_empty() {
        return Err(ApiError::BadRequest("title is required".to_string()));
    }
    let content = NewContent {
        kind: request.kind,
        title: request.title.trim().to_string(),
        link_url: request.link_url,
        thumbnail: request.thumbnail,
        description: request.description,
        published_at: request.published_at,
    };
    let record = state.services.repository.insert_content(&content).await?;
    Ok((StatusCode::CREATED, Json(card_to_dto(record.into_card()))))
}

async fn get_content(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<Json<ContentCardDto>, ApiError> {
    let record = state
        .services
        .repository
        .get_content(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("content {id} not found")))?;
    Ok(Json(card_to_dto(record.into_card())))
}

async fn delete_content(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let affected = state.services.repository.delete_content(id).await?;
    if affected == 0 {
        return Err(ApiError::NotFound(format!("content {id} not found")));
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn counsel(
    State(state): State<SharedState>,
    Json(request): Json<CounselRequest>,
) -> Result<Json<CounselReply>, ApiError> {
    let reply = state
        .services
        .counselor
        .respond(request.message.as_deref().unwrap_or_default())?;
    Ok(Json(reply))
}

async fn app_health(State(state): State<SharedState>) -> Json<BTreeMap<String, String>> {
    Json(state.services.health_report().await)
}

pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/api/health", get(app_health))
        .route("/api/naver-rss", get(naver_rss))
        .route("/api/youtube", get(youtube))
        .route("/api/qt-content", post(qt_content))
        .route("/api/contents", get(list_contents).post(create_content))
        .route("/api/contents/{id}", get(get_content).delete(delete_content))
        .route("/api/counsel", post(counsel))
        .with_state(state)
}

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_env("RUST_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

pub async fn run() -> Result<(), StartupError> {
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();

    let config = AppConfig::from_env()?;
    let address = config.socket_addr()?;
    let repository = ContentRepository::connect(&config.database_url).await?;
    let services = AppServices::new(&config, repository)?;
    let app = build_router(SharedState::new(services));

    let listener = tokio::net::TcpListener::bind(address).await?;
    tracing::info!(%address, "church-feeds listening");
    axum::serve(listener, app).await?;
    Ok(())
}
