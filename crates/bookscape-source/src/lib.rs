//! HTTP client for the Google Books volumes endpoint.

use anyhow::Context;
use bookscape_core::VolumesPage;
use thiserror::Error;
use tracing::{info, info_span, warn, Instrument};

pub const CRATE_NAME: &str = "bookscape-source";

pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com";

#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub base_url: String,
    pub user_agent: Option<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE.to_string(),
            user_agent: Some("bookscape/0.1".to_string()),
        }
    }
}

impl SourceConfig {
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("BOOKSCAPE_BOOKS_API_BASE")
                .unwrap_or_else(|_| DEFAULT_API_BASE.to_string()),
            user_agent: Some(
                std::env::var("BOOKSCAPE_USER_AGENT").unwrap_or_else(|_| "bookscape/0.1".to_string()),
            ),
        }
    }
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("http status {status} for {url}")]
    HttpStatus { status: u16, url: String },
    #[error("response body is not valid JSON: {0}")]
    Decode(#[source] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct VolumesClient {
    client: reqwest::Client,
    base_url: String,
}

impl VolumesClient {
    pub fn new(config: SourceConfig) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder().gzip(true).brotli(true);
        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }
        let client = builder.build().context("building reqwest client")?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_env() -> anyhow::Result<Self> {
        Self::new(SourceConfig::from_env())
    }

    /// One keyword search: a single GET, no retries, keyword interpolated
    /// into the query string as-is. Transport and status failures surface to
    /// the caller; a body without usable items decodes as an empty page.
    pub async fn search(&self, search_key: &str) -> Result<VolumesPage, SourceError> {
        let url = format!("{}/books/v1/volumes?q={}", self.base_url, search_key);
        let span = info_span!("volumes_search", search_key);
        async {
            let resp = self.client.get(&url).send().await?;
            let status = resp.status();
            let final_url = resp.url().to_string();
            if !status.is_success() {
                return Err(SourceError::HttpStatus {
                    status: status.as_u16(),
                    url: final_url,
                });
            }

            let body = resp.bytes().await?;
            let page: VolumesPage = serde_json::from_slice(&body).map_err(SourceError::Decode)?;
            let items = page.items_or_empty().len();
            if items == 0 {
                warn!("search returned no items");
            } else {
                info!(items, "decoded search response");
            }
            Ok(page)
        }
        .instrument(span)
        .await
    }
}
