//! TfNSW car park REST client.
//!
//! Two requests per cycle:
//! 1. `GET {base}/carpark` lists facilities as `{id: name}`.
//! 2. `GET {base}/carpark/occupancy` returns `{id: {occupancy, location, tsn}}`.
//!
//! The occupancy endpoint is quota-limited. Phase 2 is retried on rate
//! limits and network failures, and when it still fails the listing is
//! returned with no occupancy rather than failing the whole source.

use std::time::Duration;

use futures::future::BoxFuture;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use tracing::{debug, warn};

use super::error::{SourceError, mentions_rate_limit};
use super::retry::RetryPolicy;
use super::types::{
    CarparkPayload, FacilityDetailDto, FacilityListing, RawCounts, RawFacility, SourceBatch,
    SourceKind,
};
use super::FacilitySource;

/// Default base URL for the TfNSW open data API.
pub const DEFAULT_REST_URL: &str = "https://api.transport.nsw.gov.au/v1";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for the REST client.
#[derive(Debug, Clone)]
pub struct RestConfig {
    /// TfNSW open data API key.
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
    /// Retry policy for the occupancy request.
    pub retry: RetryPolicy,
}

impl RestConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_REST_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }

    /// Set a custom base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// TfNSW car park API client.
#[derive(Debug, Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
    retry: RetryPolicy,
}

impl RestClient {
    pub fn new(config: RestConfig) -> Result<Self, SourceError> {
        if config.api_key.trim().is_empty() {
            return Err(SourceError::NotConfigured("TfNSW API key is empty".into()));
        }

        let mut headers = HeaderMap::new();

        // TfNSW expects "apikey <key>", not a bearer token
        let auth = HeaderValue::from_str(&format!("apikey {}", config.api_key.trim()))
            .map_err(|_| SourceError::NotConfigured("invalid API key format".into()))?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            retry: config.retry,
        })
    }

    /// Phase 1: the facility listing. Failures are returned as errors.
    ///
    /// A listing with no usable facilities is an error too: `RateLimited`
    /// if the body talks about quotas, `Malformed` otherwise.
    pub async fn fetch_listing(&self) -> Result<Vec<RawFacility>, SourceError> {
        let body = self.get_text("carpark").await?;

        let payload: CarparkPayload<FacilityListing> = match serde_json::from_str(&body) {
            Ok(payload) => payload,
            Err(_) if mentions_rate_limit(&body) => return Err(SourceError::RateLimited),
            Err(e) => return Err(SourceError::malformed(e.to_string(), &body)),
        };

        let records: Vec<RawFacility> = payload
            .into_entries()
            .into_iter()
            .filter_map(|(key, listing)| match listing {
                FacilityListing::Name(name) => {
                    let record = RawFacility::named(name);
                    Some(match key {
                        Some(id) => record.with_id(id),
                        None => record,
                    })
                }
                // An error envelope decodes as a detail with nothing in it
                FacilityListing::Detail(detail) => {
                    let record = detail.into_raw(key);
                    let unnamed = record.name.trim().is_empty();
                    (!(unnamed && record.counts == RawCounts::Missing)).then_some(record)
                }
            })
            .filter(|record| !record.is_blank())
            .collect();

        if records.is_empty() {
            if mentions_rate_limit(&body) {
                return Err(SourceError::RateLimited);
            }
            return Err(SourceError::malformed("listing has no facilities", &body));
        }

        debug!(count = records.len(), "fetched TfNSW facility listing");
        Ok(records)
    }

    /// Phase 2: occupancy for every facility.
    ///
    /// Rate limits and network failures are retried under the configured
    /// policy. Once retries are exhausted, or on any other failure, this
    /// logs a warning and returns no records instead of an error.
    pub async fn fetch_occupancy_records(&self) -> Vec<RawFacility> {
        match self
            .retry
            .run("TfNSW occupancy", || self.try_fetch_occupancy())
            .await
        {
            Ok(records) => records,
            Err(e) => {
                warn!(error = %e, "TfNSW occupancy unavailable, continuing without it");
                Vec::new()
            }
        }
    }

    async fn try_fetch_occupancy(&self) -> Result<Vec<RawFacility>, SourceError> {
        let body = self.get_text("carpark/occupancy").await?;

        let records = match serde_json::from_str::<CarparkPayload<FacilityDetailDto>>(&body) {
            Ok(payload) => payload
                .into_entries()
                .into_iter()
                .map(|(key, detail)| detail.into_raw(key))
                .filter(|r| !(r.name.trim().is_empty() && r.counts == RawCounts::Missing))
                .collect::<Vec<_>>(),
            Err(_) if mentions_rate_limit(&body) => return Err(SourceError::RateLimited),
            Err(e) => return Err(SourceError::malformed(e.to_string(), &body)),
        };

        // A quota message can also arrive as a well-formed but useless object
        if records.is_empty() && mentions_rate_limit(&body) {
            return Err(SourceError::RateLimited);
        }

        Ok(records)
    }

    async fn get_text(&self, path: &str) -> Result<String, SourceError> {
        let url = format!("{}/{}", self.base_url, path);
        let response = self.http.get(&url).send().await?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(SourceError::RateLimited);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();

            // Quota exhaustion is reported under assorted statuses
            if mentions_rate_limit(&body) {
                return Err(SourceError::RateLimited);
            }

            if status == reqwest::StatusCode::UNAUTHORIZED
                || status == reqwest::StatusCode::FORBIDDEN
            {
                return Err(SourceError::NotConfigured(format!(
                    "TfNSW rejected the API key (status {})",
                    status.as_u16()
                )));
            }

            return Err(SourceError::Unavailable {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(response.text().await?)
    }
}

impl FacilitySource for RestClient {
    fn kind(&self) -> SourceKind {
        SourceKind::Rest
    }

    fn fetch_facilities(&self) -> BoxFuture<'_, Result<SourceBatch, SourceError>> {
        Box::pin(async move {
            let listing = self.fetch_listing().await?;
            let occupancy = self.fetch_occupancy_records().await;
            Ok(SourceBatch::Split { listing, occupancy })
        })
    }

    fn fetch_occupancy(&self) -> BoxFuture<'_, Result<Vec<RawFacility>, SourceError>> {
        Box::pin(async move { Ok(self.fetch_occupancy_records().await) })
    }
}
