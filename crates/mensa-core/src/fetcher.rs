//! Menu provider client
//!
//! One call per [`MenuFetcher::fetch`]; retry policy belongs to whoever
//! drives the conversation, not to the fetcher.

use std::time::Duration;

use crate::error::FetchError;
use crate::menu::MenuQuery;

/// Day-view endpoint of the Studierendenwerk Berlin menu
pub const DEFAULT_PROVIDER_URL: &str = "https://www.stw.berlin/xhr/speiseplan-wochentag.html";

/// Default bound for a single provider call
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Source of raw menu documents
#[async_trait::async_trait]
pub trait MenuFetcher: Send + Sync + std::fmt::Debug {
    /// Fetch the raw document for one canteen and day
    async fn fetch(&self, query: &MenuQuery) -> Result<String, FetchError>;
}

/// Fetcher backed by the provider's HTTP endpoint
#[derive(Debug, Clone)]
pub struct HttpMenuFetcher {
    base_url: String,
    http_client: reqwest::Client,
}

impl HttpMenuFetcher {
    /// Create a fetcher for `base_url` with a per-request timeout
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::connection_failed(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into(),
            http_client,
        })
    }

    /// Fetcher for the public provider endpoint with default timeout
    pub fn with_defaults() -> Result<Self, FetchError> {
        Self::new(DEFAULT_PROVIDER_URL, DEFAULT_FETCH_TIMEOUT)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn classify(&self, query: &MenuQuery, error: reqwest::Error) -> FetchError {
        let date = query.date_param();
        if error.is_timeout() {
            FetchError::timeout(format!(
                "Request timed out for canteen {} on {}",
                query.canteen, date
            ))
        } else if let Some(status) = error.status() {
            FetchError::http(
                status.as_u16(),
                format!("HTTP error {} for canteen {} on {}", status.as_u16(), query.canteen, date),
            )
        } else if error.is_connect() {
            FetchError::connection_failed(format!(
                "Connection failed for canteen {} on {}",
                query.canteen, date
            ))
        } else {
            FetchError::connection_failed(format!(
                "Request failed for canteen {} on {}: {}",
                query.canteen, date, error
            ))
        }
    }
}

#[async_trait::async_trait]
impl MenuFetcher for HttpMenuFetcher {
    async fn fetch(&self, query: &MenuQuery) -> Result<String, FetchError> {
        let date = query.date_param();
        tracing::info!("Fetching menu for canteen {} on {}", query.canteen, date);

        let response = self
            .http_client
            .post(&self.base_url)
            .form(&[("resources_id", query.canteen.as_str()), ("date", date.as_str())])
            .send()
            .await
            .map_err(|e| self.classify(query, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::http(
                status.as_u16(),
                format!("HTTP error {} for canteen {} on {}", status.as_u16(), query.canteen, date),
            ));
        }

        response.text().await.map_err(|e| self.classify(query, e))
    }
}
