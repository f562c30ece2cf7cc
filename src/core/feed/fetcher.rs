use reqwest::header::USER_AGENT;

#[derive(Debug, Clone)]
pub struct FetchedFeed {
    pub body: Vec<u8>,
}

impl FetchedFeed {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("unexpected status code: {0}")]
    HttpStatus(u16),
}

/// Single GET with no retry. Any non-2xx status is an error.
pub async fn fetch_feed(
    client: &reqwest::Client,
    url: &str,
    user_agent: Option<&str>,
) -> Result<FetchedFeed, FetchError> {
    let mut request = client.get(url);
    if let Some(value) = user_agent {
        request = request.header(USER_AGENT, value);
    }

    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::HttpStatus(status.as_u16()));
    }

    let body = response.bytes().await?.to_vec();

    Ok(FetchedFeed { body })
}
