//! transportnsw.info GraphQL client.
//!
//! A single widget query returns every Park&Ride location with its free
//! and occupied counts. The response carries no ids and no coordinates.

use std::time::Duration;

use futures::future::BoxFuture;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde_json::json;
use tracing::debug;

use super::error::SourceError;
use super::types::{GraphqlResponse, RawCounts, RawFacility, SourceBatch, SourceKind};
use super::FacilitySource;

/// Public GraphQL endpoint behind the transportnsw.info trip planner.
pub const DEFAULT_GRAPHQL_URL: &str = "https://transportnsw.info/api/graphql";

/// User agent sent with every request.
pub const DEFAULT_USER_AGENT: &str = "NSW-Park-Ride-Checker/1.0";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Park&Ride widget query. `spots` is free spaces, `occupancy` is taken.
const PNR_QUERY: &str = "query{result:widgets{pnrLocations{name spots occupancy}}}";

/// Configuration for the GraphQL client.
#[derive(Debug, Clone)]
pub struct GraphqlConfig {
    pub endpoint: String,
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for GraphqlConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_GRAPHQL_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl GraphqlConfig {
    /// Set a custom endpoint (for testing or a proxy).
    pub fn with_endpoint(mut self, url: impl Into<String>) -> Self {
        self.endpoint = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// GraphQL occupancy client.
#[derive(Debug, Clone)]
pub struct GraphqlClient {
    http: reqwest::Client,
    endpoint: String,
}

impl GraphqlClient {
    pub fn new(config: GraphqlConfig) -> Result<Self, SourceError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(config.user_agent)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            http,
            endpoint: config.endpoint,
        })
    }

    /// Run the widget query and decode the locations.
    ///
    /// Not retried: a failure here moves the pipeline on to the next source.
    pub async fn fetch_locations(&self) -> Result<Vec<RawFacility>, SourceError> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(&json!({ "query": PNR_QUERY }))
            .send()
            .await?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(SourceError::RateLimited);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Unavailable {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = response.text().await?;

        let parsed: GraphqlResponse = serde_json::from_str(&body)
            .map_err(|e| SourceError::malformed(e.to_string(), &body))?;

        let locations = parsed
            .data
            .and_then(|d| d.result)
            .and_then(|r| r.widgets)
            .and_then(|w| w.pnr_locations)
            .ok_or_else(|| {
                let message = match &parsed.errors {
                    Some(errors) if !errors.is_empty() => errors
                        .iter()
                        .map(|e| e.message.as_str())
                        .collect::<Vec<_>>()
                        .join("; "),
                    _ => "missing data.result.widgets.pnrLocations".to_string(),
                };
                SourceError::malformed(message, &body)
            })?;

        let records: Vec<RawFacility> = locations
            .into_iter()
            .filter_map(|loc| {
                let name = loc.name.filter(|n| !n.trim().is_empty())?;
                Some(RawFacility::named(name).with_counts(RawCounts::AvailableOccupied {
                    available: loc.spots,
                    occupied: loc.occupancy,
                }))
            })
            .collect();

        debug!(count = records.len(), "decoded GraphQL Park&Ride locations");
        Ok(records)
    }
}

impl FacilitySource for GraphqlClient {
    fn kind(&self) -> SourceKind {
        SourceKind::Graphql
    }

    fn fetch_facilities(&self) -> BoxFuture<'_, Result<SourceBatch, SourceError>> {
        Box::pin(async move { self.fetch_locations().await.map(SourceBatch::Records) })
    }
}
