//! Environment-driven settings.
//!
//! Values come from `CHURCH_*` variables. `run()` loads `.env.local` first,
//! so a local file can supply them during development.

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
pub const DEFAULT_DATABASE_URL: &str = "sqlite://church.db?mode=rwc";
pub const DEFAULT_BLOG_BASE_URL: &str = "https://blog.naver.com";
pub const DEFAULT_YOUTUBE_FEED_URL: &str = "https://www.youtube.com/feeds/videos.xml";
pub const DEFAULT_YOUTUBE_API_URL: &str = "https://www.googleapis.com/youtube/v3";
pub const DEFAULT_PROXY_ALLOWED_HOSTS: &str = "firebasestorage.googleapis.com,storage.googleapis.com";
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 20;
const DEFAULT_REVALIDATE_SECS: u64 = 3600;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),
    #[error("setting {key} is not a valid number: {value}")]
    InvalidNumber { key: &'static str, value: String },
    #[error("invalid bind address: {0}")]
    InvalidBindAddr(String),
    #[error("fetch timeout must be greater than zero")]
    ZeroTimeout,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedConfig {
    pub blog_rss_url: String,
    pub blog_base_url: String,
    pub youtube_channel_id: String,
    pub youtube_api_key: Option<String>,
    pub youtube_feed_url: String,
    pub youtube_api_url: String,
    pub revalidate_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProxyConfig {
    /// Lowercase host names. A single `*` entry allows every host.
    pub allowed_hosts: Vec<String>,
}

impl ProxyConfig {
    pub fn allows_any_host(&self) -> bool {
        self.allowed_hosts.iter().any(|host| host == "*")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: String,
    pub database_url: String,
    pub fetch_timeout_secs: u64,
    pub feed: FeedConfig,
    pub proxy: ProxyConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process
    /// environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let read_or = |key: &str, default: &str| read(key).unwrap_or_else(|| default.to_string());
        let read_number = |key: &'static str, default: u64| match read(key) {
            Some(value) => value
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidNumber { key, value }),
            None => Ok(default),
        };

        let config = AppConfig {
            bind_addr: read_or("CHURCH_BIND_ADDR", DEFAULT_BIND_ADDR),
            database_url: read_or("CHURCH_DATABASE_URL", DEFAULT_DATABASE_URL),
            fetch_timeout_secs: read_number("CHURCH_FETCH_TIMEOUT_SECS", DEFAULT_FETCH_TIMEOUT_SECS)?,
            feed: FeedConfig {
                blog_rss_url: read("CHURCH_BLOG_RSS_URL").unwrap_or_default(),
                blog_base_url: read_or("CHURCH_BLOG_BASE_URL", DEFAULT_BLOG_BASE_URL),
                youtube_channel_id: read("CHURCH_YOUTUBE_CHANNEL_ID").unwrap_or_default(),
                youtube_api_key: read("CHURCH_YOUTUBE_API_KEY"),
                youtube_feed_url: read_or("CHURCH_YOUTUBE_FEED_URL", DEFAULT_YOUTUBE_FEED_URL),
                youtube_api_url: read_or("CHURCH_YOUTUBE_API_URL", DEFAULT_YOUTUBE_API_URL),
                revalidate_secs: read_number("CHURCH_REVALIDATE_SECS", DEFAULT_REVALIDATE_SECS)?,
            },
            proxy: ProxyConfig {
                allowed_hosts: parse_host_list(&read_or(
                    "CHURCH_PROXY_ALLOWED_HOSTS",
                    DEFAULT_PROXY_ALLOWED_HOSTS,
                )),
            },
        };
        validate_config(&config)?;
        Ok(config)
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind_addr
            .parse()
            .map_err(|_| ConfigError::InvalidBindAddr(self.bind_addr.clone()))
    }
}

pub fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.feed.blog_rss_url.trim().is_empty() {
        return Err(ConfigError::Missing("CHURCH_BLOG_RSS_URL"));
    }
    if config.feed.youtube_channel_id.trim().is_empty() {
        return Err(ConfigError::Missing("CHURCH_YOUTUBE_CHANNEL_ID"));
    }
    if config.fetch_timeout_secs == 0 {
        return Err(ConfigError::ZeroTimeout);
    }
    config.socket_addr()?;
    Ok(())
}

fn parse_host_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|host| host.trim().to_lowercase())
        .filter(|host| !host.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn applies_defaults_for_optional_settings() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("CHURCH_BLOG_RSS_URL", "https://rss.blog.naver.com/gracechurch.xml"),
            ("CHURCH_YOUTUBE_CHANNEL_ID", "UCgracechurch"),
        ]))
        .expect("config should load");

        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR);
        assert_eq!(config.fetch_timeout_secs, 20);
        assert_eq!(config.feed.blog_base_url, "https://blog.naver.com");
        assert_eq!(config.feed.youtube_api_key, None);
        assert_eq!(
            config.proxy.allowed_hosts,
            vec!["firebasestorage.googleapis.com", "storage.googleapis.com"]
        );
        assert!(!config.proxy.allows_any_host());
    }

    #[test]
    fn missing_required_settings_are_reported() {
        let error = AppConfig::from_lookup(lookup_from(&[("CHURCH_YOUTUBE_CHANNEL_ID", "UC1")]))
            .expect_err("blog url is required");
        assert_eq!(error, ConfigError::Missing("CHURCH_BLOG_RSS_URL"));
    }

    #[test]
    fn rejects_bad_numbers_and_addresses() {
        let base = [
            ("CHURCH_BLOG_RSS_URL", "https://rss.example/blog.xml"),
            ("CHURCH_YOUTUBE_CHANNEL_ID", "UC1"),
        ];

        let mut pairs = base.to_vec();
        pairs.push(("CHURCH_FETCH_TIMEOUT_SECS", "soon"));
        assert!(matches!(
            AppConfig::from_lookup(lookup_from(&pairs)),
            Err(ConfigError::InvalidNumber { key: "CHURCH_FETCH_TIMEOUT_SECS", .. })
        ));

        let mut pairs = base.to_vec();
        pairs.push(("CHURCH_FETCH_TIMEOUT_SECS", "0"));
        assert_eq!(
            AppConfig::from_lookup(lookup_from(&pairs)),
            Err(ConfigError::ZeroTimeout)
        );

        let mut pairs = base.to_vec();
        pairs.push(("CHURCH_BIND_ADDR", "localhost"));
        assert!(matches!(
            AppConfig::from_lookup(lookup_from(&pairs)),
            Err(ConfigError::InvalidBindAddr(_))
        ));
    }

    #[test]
    fn host_list_is_normalized_and_wildcard_detected() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("CHURCH_BLOG_RSS_URL", "https://rss.example/blog.xml"),
            ("CHURCH_YOUTUBE_CHANNEL_ID", "UC1"),
            ("CHURCH_PROXY_ALLOWED_HOSTS", " Storage.Example.com , ,*"),
        ]))
        .expect("config should load");
        assert_eq!(config.proxy.allowed_hosts, vec!["storage.example.com", "*"]);
        assert!(config.proxy.allows_any_host());
    }
}
