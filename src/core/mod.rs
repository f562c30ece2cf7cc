pub mod config;
pub mod counselor;
pub mod feed;
pub mod merge;
pub mod proxy;
pub mod storage;

use std::collections::BTreeMap;
use std::time::Duration;

use config::AppConfig;
use counselor::CounselorService;
use feed::FeedService;
use merge::ListingService;
use proxy::ProxyService;
use storage::ContentRepository;

/// Feed services share one HTTP client and every service shares one
/// repository handle, built here and handed down. The proxy keeps its own
/// client for its redirect policy.
#[derive(Debug, Clone)]
pub struct AppServices {
    pub feed: FeedService,
    pub proxy: ProxyService,
    pub listing: ListingService,
    pub counselor: CounselorService,
    pub repository: ContentRepository,
}

impl AppServices {
    pub fn new(config: &AppConfig, repository: ContentRepository) -> Result<Self, reqwest::Error> {
        let client = build_http_client(config.fetch_timeout_secs)?;
        let feed = FeedService::new(client.clone(), config.feed.clone());
        Ok(Self {
            proxy: ProxyService::new(config.proxy.clone(), config.fetch_timeout_secs)?,
            listing: ListingService::new(feed.clone(), repository.clone()),
            counselor: CounselorService,
            feed,
            repository,
        })
    }

    pub async fn health_report(&self) -> BTreeMap<String, String> {
        let mut report = BTreeMap::new();
        report.insert(self.feed.name().to_string(), self.feed.status().to_string());
        report.insert(self.proxy.name().to_string(), self.proxy.status().to_string());
        report.insert(
            self.listing.name().to_string(),
            self.listing.status().to_string(),
        );
        report.insert(
            self.counselor.name().to_string(),
            self.counselor.status().to_string(),
        );
        let storage_status = match self.repository.ping().await {
            Ok(()) => "ready".to_string(),
            Err(error) => format!("error: {error}"),
        };
        report.insert(self.repository.name().to_string(), storage_status);
        report
    }
}

pub fn build_http_client(timeout_secs: u64) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
}
