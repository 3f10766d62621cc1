//! Upstream data sources for Park&Ride facilities.
//!
//! Each adapter fetches one upstream and decodes it into [`RawFacility`]
//! records. Adapters never normalize names or resolve coordinates; that
//! is the pipeline's job.
//!
//! - [`GraphqlClient`]: the transportnsw.info widget query. One request,
//!   names plus free and occupied counts.
//! - [`RestClient`]: the TfNSW car park API. A listing request and an
//!   occupancy request, the second retried on rate limits.
//! - [`ScrapeClient`]: a scraper service that reads the public occupancy
//!   page and reports free spaces per car park.
//! - [`MockSource`]: demo records, built in or loaded from a JSON file.

mod error;
mod graphql;
mod mock;
mod rest;
pub mod retry;
mod scrape;
mod types;

use futures::future::BoxFuture;

pub use error::{SourceError, mentions_rate_limit};
pub use graphql::{DEFAULT_GRAPHQL_URL, GraphqlClient, GraphqlConfig};
pub use mock::MockSource;
pub use rest::{DEFAULT_REST_URL, RestClient, RestConfig};
pub use retry::RetryPolicy;
pub use scrape::{DEFAULT_SCRAPER_URL, ScrapeClient, ScrapeConfig, extract_scraped_text};
pub use types::{
    CarparkPayload, FacilityDetailDto, FacilityListing, LenientNumber, LenientText, RawCounts,
    RawFacility, ScrapedCarpark, SourceBatch, SourceKind, UnknownSourceKind, count_of,
};

/// A source of facility records.
///
/// This abstraction lets the pipeline be tested with scripted sources and
/// lets sources be wrapped (see [`crate::cache::CachedSource`]).
pub trait FacilitySource: Send + Sync {
    /// Which upstream this is.
    fn kind(&self) -> SourceKind;

    /// Fetch everything needed to build the facility list.
    fn fetch_facilities(&self) -> BoxFuture<'_, Result<SourceBatch, SourceError>>;

    /// Fetch occupancy figures only.
    ///
    /// The default fetches the full batch and keeps the occupancy part.
    /// Sources with a cheaper occupancy-only request override this.
    fn fetch_occupancy(&self) -> BoxFuture<'_, Result<Vec<RawFacility>, SourceError>> {
        Box::pin(async move {
            match self.fetch_facilities().await? {
                SourceBatch::Records(records) => Ok(records),
                SourceBatch::Split { occupancy, .. } => Ok(occupancy),
            }
        })
    }
}

/// In-process HTTP stubs for adapter tests.
#[cfg(test)]
pub(crate) mod stub {
    use axum::Router;

    /// Serve `router` on an ephemeral local port and return its base URL.
    pub async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }
}
