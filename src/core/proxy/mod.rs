//! Relays plain-text files from object storage to the browser.
//!
//! Storage download URLs cannot be fetched cross-origin from the site, so
//! the server fetches them and streams the bytes back untouched.

use std::time::Duration;

use reqwest::redirect;
use serde::Deserialize;
use url::Url;

use super::config::ProxyConfig;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProxyRequest {
    pub url: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("url is required")]
    MissingUrl,
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("host is not allowed: {0}")]
    HostNotAllowed(String),
    #[error("upstream returned status {0}")]
    Upstream(u16),
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
}

#[derive(Debug, Clone)]
pub struct ProxyService {
    client: reqwest::Client,
    config: ProxyConfig,
}

const MAX_REDIRECTS: usize = 5;

impl ProxyService {
    /// Builds a client of its own: every redirect hop is held to the same
    /// allow-list as the first request.
    pub fn new(config: ProxyConfig, timeout_secs: u64) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .redirect(allow_listed_redirects(config.clone()))
            .build()?;
        Ok(Self { client, config })
    }

    pub fn name(&self) -> &'static str {
        "proxy"
    }

    pub fn status(&self) -> &'static str {
        "ready"
    }

    /// Checks the target and opens the upstream response. The caller owns
    /// streaming the body.
    pub async fn open(&self, request: &ProxyRequest) -> Result<reqwest::Response, ProxyError> {
        let target = validate_target(request.url.as_deref(), &self.config)?;
        let response = self.client.get(target).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProxyError::Upstream(status.as_u16()));
        }
        Ok(response)
    }
}

/// Follows a redirect only when its target passes `validate_target`. A
/// refused hop stops the chain, so the caller sees the 3xx itself.
fn allow_listed_redirects(config: ProxyConfig) -> redirect::Policy {
    redirect::Policy::custom(move |attempt| {
        if attempt.previous().len() >= MAX_REDIRECTS {
            return attempt.stop();
        }
        match validate_target(Some(attempt.url().as_str()), &config) {
            Ok(_) => attempt.follow(),
            Err(error) => {
                tracing::warn!(url = %attempt.url(), %error, "refused proxy redirect");
                attempt.stop()
            }
        }
    })
}

pub fn validate_target(raw: Option<&str>, config: &ProxyConfig) -> Result<Url, ProxyError> {
    let raw = raw
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(ProxyError::MissingUrl)?;
    let url = Url::parse(raw).map_err(|error| ProxyError::InvalidUrl(error.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ProxyError::InvalidUrl(format!(
            "unsupported scheme {}",
            url.scheme()
        )));
    }
    let host = url
        .host_str()
        .map(str::to_lowercase)
        .ok_or_else(|| ProxyError::InvalidUrl("url has no host".to_string()))?;

    if config.allows_any_host() || config.allowed_hosts.iter().any(|allowed| *allowed == host) {
        return Ok(url);
    }
    Err(ProxyError::HostNotAllowed(host))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::response::Redirect;
    use axum::routing::get;
    use axum::Router;

    const DEVOTIONAL: &str = "오늘의 묵상\r\nPsalm 23:1 - The Lord is my shepherd.\n";

    fn storage_only() -> ProxyConfig {
        ProxyConfig {
            allowed_hosts: vec!["firebasestorage.googleapis.com".to_string()],
        }
    }

    #[test]
    fn missing_or_blank_url_is_rejected() {
        assert!(matches!(
            validate_target(None, &storage_only()),
            Err(ProxyError::MissingUrl)
        ));
        assert!(matches!(
            validate_target(Some("   "), &storage_only()),
            Err(ProxyError::MissingUrl)
        ));
    }

    #[test]
    fn only_allowed_hosts_pass() {
        let allowed = validate_target(
            Some("https://FirebaseStorage.googleapis.com/v0/b/app/o/qt.txt?alt=media"),
            &storage_only(),
        )
        .expect("storage host is allowed");
        assert_eq!(allowed.path(), "/v0/b/app/o/qt.txt");

        assert!(matches!(
            validate_target(Some("http://169.254.169.254/latest/meta-data"), &storage_only()),
            Err(ProxyError::HostNotAllowed(host)) if host == "169.254.169.254"
        ));
        assert!(matches!(
            validate_target(Some("file:///etc/passwd"), &storage_only()),
            Err(ProxyError::InvalidUrl(_))
        ));
    }

    #[test]
    fn wildcard_allows_any_host() {
        let config = ProxyConfig {
            allowed_hosts: vec!["*".to_string()],
        };
        assert!(validate_target(Some("http://example.org/a.txt"), &config).is_ok());
    }

    async fn spawn_storage() -> (String, tokio::task::JoinHandle<()>) {
        let app = Router::new()
            .route("/qt.txt", get(|| async { DEVOTIONAL }))
            .route(
                "/broken.txt",
                get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
            )
            .route("/private.txt", get(|| async { "INTERNAL-ONLY" }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("listener should bind");
        let address = listener.local_addr().expect("local addr should exist");
        let port = address.port();
        let app = app
            .route(
                "/moved.txt",
                get(|| async { Redirect::temporary("/qt.txt") }),
            )
            .route(
                "/elsewhere.txt",
                get(move || async move {
                    Redirect::temporary(&format!("http://localhost:{port}/private.txt"))
                }),
            );
        let join_handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("server should run");
        });
        (format!("http://{address}"), join_handle)
    }

    fn local_only_service() -> ProxyService {
        ProxyService::new(
            ProxyConfig {
                allowed_hosts: vec!["127.0.0.1".to_string()],
            },
            5,
        )
        .expect("client should build")
    }

    #[tokio::test]
    async fn redirects_are_held_to_the_allow_list() {
        let (base, server_task) = spawn_storage().await;
        let service = local_only_service();

        let same_host = service
            .open(&ProxyRequest {
                url: Some(format!("{base}/moved.txt")),
            })
            .await
            .expect("same-host redirect is followed");
        let body = same_host.bytes().await.expect("body should read");
        assert_eq!(body.as_ref(), DEVOTIONAL.as_bytes());

        let other_host = service
            .open(&ProxyRequest {
                url: Some(format!("{base}/elsewhere.txt")),
            })
            .await;
        assert!(matches!(other_host, Err(ProxyError::Upstream(307))));

        server_task.abort();
    }

    #[tokio::test]
    async fn relays_body_bytes_and_surfaces_upstream_failures() {
        let (base, server_task) = spawn_storage().await;
        let service = local_only_service();

        let response = service
            .open(&ProxyRequest {
                url: Some(format!("{base}/qt.txt")),
            })
            .await
            .expect("upstream should answer");
        let body = response.bytes().await.expect("body should read");
        assert_eq!(body.as_ref(), DEVOTIONAL.as_bytes());

        let broken = service
            .open(&ProxyRequest {
                url: Some(format!("{base}/broken.txt")),
            })
            .await;
        assert!(matches!(broken, Err(ProxyError::Upstream(500))));

        server_task.abort();
    }
}
