//! Scraper service client.
//!
//! The scraper renders the public Park&Ride page in a headless browser and
//! serves what it finds as `{name: {name, spaces}}`. Only free spaces are
//! known; capacity comes from the facility list or is estimated later.

use std::collections::BTreeMap;
use std::time::Duration;

use futures::future::BoxFuture;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use tracing::debug;

use crate::domain::{FACILITY_PREFIX, collapse_whitespace, with_facility_prefix};

use super::error::SourceError;
use super::types::{
    CarparkPayload, LenientNumber, RawCounts, RawFacility, ScrapedCarpark, ScrapedCarparkDto,
    SourceBatch, SourceKind, count_of,
};
use super::FacilitySource;

/// Where the scraper service listens by default.
pub const DEFAULT_SCRAPER_URL: &str = "http://127.0.0.1:3001";

/// Scraping drives a real browser, so it is slow.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

const OCCUPANCY_PATH: &str = "api/scrape/carpark-occupancy";

/// Configuration for the scrape client.
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SCRAPER_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ScrapeConfig {
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Client for the scraper service.
#[derive(Debug, Clone)]
pub struct ScrapeClient {
    http: reqwest::Client,
    base_url: String,
}

impl ScrapeClient {
    pub fn new(config: ScrapeConfig) -> Result<Self, SourceError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetch the scraped car parks.
    ///
    /// Accepts the scraper's JSON map, or raw page text for scrapers that
    /// forward it unparsed. An empty result is an error: the page rendered
    /// but nothing on it looked like a car park.
    pub async fn fetch_scraped(&self) -> Result<Vec<ScrapedCarpark>, SourceError> {
        let url = format!("{}/{}", self.base_url, OCCUPANCY_PATH);
        let response = self.http.get(&url).send().await?;

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

        let carparks = match serde_json::from_str::<CarparkPayload<ScrapedCarparkDto>>(&body) {
            Ok(payload) => from_payload(payload),
            Err(_) => extract_scraped_text(&body),
        };

        if carparks.is_empty() {
            return Err(SourceError::malformed(
                "no car park data in scraper response",
                &body,
            ));
        }

        debug!(count = carparks.len(), "fetched scraped car parks");
        Ok(carparks)
    }
}

impl FacilitySource for ScrapeClient {
    fn kind(&self) -> SourceKind {
        SourceKind::Scrape
    }

    fn fetch_facilities(&self) -> BoxFuture<'_, Result<SourceBatch, SourceError>> {
        Box::pin(async move {
            let records = self.fetch_scraped().await?.into_iter().map(to_raw).collect();
            Ok(SourceBatch::Records(records))
        })
    }
}

fn from_payload(payload: CarparkPayload<ScrapedCarparkDto>) -> Vec<ScrapedCarpark> {
    payload
        .into_entries()
        .into_iter()
        .filter_map(|(key, dto)| {
            let name = dto
                .name
                .or(key)
                .map(|n| collapse_whitespace(&n))
                .filter(|n| !n.is_empty())?;
            // Entries without a spaces field are not car parks
            let spaces = dto.spaces.as_ref().map(LenientNumber::to_count)?;
            Some(ScrapedCarpark { name, spaces })
        })
        .collect()
}

/// Scraped entries become records named the way the other sources name
/// them, so coordinates and fuzzy matching work the same.
fn to_raw(carpark: ScrapedCarpark) -> RawFacility {
    RawFacility::named(with_facility_prefix(&carpark.name)).with_counts(RawCounts::AvailableOnly {
        available: Some(LenientNumber::from(carpark.spaces)),
    })
}

/// Extract `Park&Ride - {name}{digits} spaces` readings from page text.
///
/// The page runs the name straight into the count (`"Park&Ride -
/// Ashfield168 spaces"`), so the name is everything up to the first digit.
/// When a name appears more than once the first non-zero reading wins.
pub fn extract_scraped_text(text: &str) -> Vec<ScrapedCarpark> {
    let lower = text.to_ascii_lowercase();
    let mut found: BTreeMap<String, (usize, u32)> = BTreeMap::new();
    let mut order = 0;
    let mut from = 0;

    while let Some(offset) = lower[from..].find(FACILITY_PREFIX) {
        let start = from + offset + FACILITY_PREFIX.len();
        from = start;

        let Some((name, spaces)) = parse_reading(&text[start..]) else {
            continue;
        };

        match found.get_mut(&name) {
            Some((_, existing)) if *existing == 0 => *existing = spaces,
            Some(_) => {}
            None => {
                found.insert(name, (order, spaces));
                order += 1;
            }
        }
    }

    let mut readings: Vec<_> = found.into_iter().collect();
    readings.sort_by_key(|(_, (order, _))| *order);
    readings
        .into_iter()
        .map(|(name, (_, spaces))| ScrapedCarpark { name, spaces })
        .collect()
}

/// Parse `\s*-\s*{name}{digits}\s+spaces` at the start of `rest`.
fn parse_reading(rest: &str) -> Option<(String, u32)> {
    let rest = rest.trim_start().strip_prefix('-')?;

    let digits_at = rest.find(|c: char| c.is_ascii_digit())?;
    let name = collapse_whitespace(&rest[..digits_at]);
    // A name running into the next entry means this one had no count
    if name.is_empty() || name.to_ascii_lowercase().contains(FACILITY_PREFIX) {
        return None;
    }

    let after_name = &rest[digits_at..];
    let digits_end = after_name
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(after_name.len());
    let spaces: u32 = after_name[..digits_end].parse().ok()?;

    let tail = &after_name[digits_end..];
    let word = tail.trim_start();
    if word.len() == tail.len() || !word.to_ascii_lowercase().starts_with("spaces") {
        return None;
    }

    Some((name, spaces))
}
