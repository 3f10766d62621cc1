//! Process configuration from environment variables.
//!
//! | Variable | Default |
//! |---|---|
//! | `PARKRIDE_SOURCES` | `graphql,scrape,rest` |
//! | `PARKRIDE_GRAPHQL_URL` | transportnsw.info endpoint |
//! | `PARKRIDE_REST_URL` | `https://api.transport.nsw.gov.au/v1` |
//! | `TFNSW_API_KEY` | unset (REST source skipped) |
//! | `PARKRIDE_SCRAPER_URL` | `http://127.0.0.1:3001` |
//! | `PARKRIDE_MOCK_FILE` | unset (built-in demo data) |
//! | `PARKRIDE_BIND` | `127.0.0.1:8000` |
//! | `PARKRIDE_STATIC_DIR` | unset (no UI served) |
//! | `PARKRIDE_REFRESH_SECS` | `300` |
//! | `PARKRIDE_CACHE_TTL_SECS` | `60` |
//! | `PARKRIDE_DEFAULT_LOCATION` | `-33.7738,150.9351` (Seven Hills) |

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::cache::{BatchStore, CachedSource};
use crate::geo::Position;
use crate::pipeline::Reconciler;
use crate::sources::{
    FacilitySource, GraphqlClient, GraphqlConfig, MockSource, RestClient, RestConfig,
    ScrapeClient, ScrapeConfig, SourceKind, UnknownSourceKind,
};

/// Priority order used when `PARKRIDE_SOURCES` is unset.
pub const DEFAULT_SOURCES: [SourceKind; 3] =
    [SourceKind::Graphql, SourceKind::Scrape, SourceKind::Rest];

pub const DEFAULT_BIND: &str = "127.0.0.1:8000";

/// How often the background task rebuilds the facility list.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(5 * 60);

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60);

/// Reference point for distances when the client sends none.
pub const DEFAULT_LOCATION: Position = Position {
    latitude: -33.7738,
    longitude: 150.9351,
};

/// Errors reading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid {var}={value:?}: {reason}")]
    InvalidValue {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("invalid {var}: {source}")]
    UnknownSource {
        var: &'static str,
        #[source]
        source: UnknownSourceKind,
    },
}

/// Everything the server needs to start.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Source priority, highest first.
    pub sources: Vec<SourceKind>,
    pub graphql: GraphqlConfig,
    pub rest_base_url: String,
    pub rest_api_key: Option<String>,
    pub scrape: ScrapeConfig,
    pub mock_file: Option<PathBuf>,
    pub bind: SocketAddr,
    pub static_dir: Option<PathBuf>,
    pub refresh_interval: Duration,
    pub cache_ttl: Duration,
    pub default_location: Position,
}

impl AppConfig {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Read the configuration through `lookup` (for testing).
    ///
    /// Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let sources = match get("PARKRIDE_SOURCES") {
            Some(list) => parse_sources(&list)?,
            None => DEFAULT_SOURCES.to_vec(),
        };

        let mut graphql = GraphqlConfig::default();
        if let Some(url) = get("PARKRIDE_GRAPHQL_URL") {
            graphql = graphql.with_endpoint(url);
        }

        let mut scrape = ScrapeConfig::default();
        if let Some(url) = get("PARKRIDE_SCRAPER_URL") {
            scrape = scrape.with_base_url(url);
        }

        let bind_value = get("PARKRIDE_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind = bind_value
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue {
                var: "PARKRIDE_BIND",
                value: bind_value.clone(),
                reason: e.to_string(),
            })?;

        let refresh_interval = match get("PARKRIDE_REFRESH_SECS") {
            Some(v) => parse_secs("PARKRIDE_REFRESH_SECS", &v)?,
            None => DEFAULT_REFRESH_INTERVAL,
        };
        if refresh_interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                var: "PARKRIDE_REFRESH_SECS",
                value: "0".into(),
                reason: "must be at least 1".into(),
            });
        }

        let cache_ttl = match get("PARKRIDE_CACHE_TTL_SECS") {
            Some(v) => parse_secs("PARKRIDE_CACHE_TTL_SECS", &v)?,
            None => DEFAULT_CACHE_TTL,
        };

        let default_location = match get("PARKRIDE_DEFAULT_LOCATION") {
            Some(v) => parse_location("PARKRIDE_DEFAULT_LOCATION", &v)?,
            None => DEFAULT_LOCATION,
        };

        Ok(Self {
            sources,
            graphql,
            rest_base_url: get("PARKRIDE_REST_URL")
                .unwrap_or_else(|| crate::sources::DEFAULT_REST_URL.to_string()),
            rest_api_key: get("TFNSW_API_KEY"),
            scrape,
            mock_file: get("PARKRIDE_MOCK_FILE").map(PathBuf::from),
            bind,
            static_dir: get("PARKRIDE_STATIC_DIR").map(PathBuf::from),
            refresh_interval,
            cache_ttl,
            default_location,
        })
    }

    /// Build the source chain.
    ///
    /// Network sources are wrapped in a cache backed by `store`. A source
    /// that cannot be constructed (e.g. REST without an API key) is logged
    /// and left out rather than failing start-up.
    pub fn build_reconciler(&self, store: BatchStore) -> Reconciler {
        let mut chain: Vec<Arc<dyn FacilitySource>> = Vec::new();

        for kind in &self.sources {
            let source: Result<Arc<dyn FacilitySource>, String> = match kind {
                SourceKind::Graphql => GraphqlClient::new(self.graphql.clone())
                    .map(|c| cached(c, &store))
                    .map_err(|e| e.to_string()),
                SourceKind::Scrape => ScrapeClient::new(self.scrape.clone())
                    .map(|c| cached(c, &store))
                    .map_err(|e| e.to_string()),
                SourceKind::Rest => match &self.rest_api_key {
                    Some(key) => RestClient::new(
                        RestConfig::new(key.clone()).with_base_url(self.rest_base_url.clone()),
                    )
                    .map(|c| cached(c, &store))
                    .map_err(|e| e.to_string()),
                    None => Err("TFNSW_API_KEY is not set".to_string()),
                },
                SourceKind::Mock => Ok(Arc::new(self.mock_source()) as Arc<dyn FacilitySource>),
            };

            match source {
                Ok(source) => chain.push(source),
                Err(reason) => warn!(source = %kind, reason = %reason, "source disabled"),
            }
        }

        if chain.is_empty() {
            warn!("no data sources configured; facility list will stay empty");
        } else {
            let order: Vec<&str> = chain.iter().map(|s| s.kind().as_str()).collect();
            info!(sources = ?order, "source chain ready");
        }

        Reconciler::new(chain)
    }

    fn mock_source(&self) -> MockSource {
        let Some(path) = &self.mock_file else {
            return MockSource::builtin();
        };
        match MockSource::from_file(path) {
            Ok(source) => source,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "mock data unreadable, using built-in demo data");
                MockSource::builtin()
            }
        }
    }
}

fn cached<S: FacilitySource + 'static>(source: S, store: &BatchStore) -> Arc<dyn FacilitySource> {
    Arc::new(CachedSource::new(source, store.clone()))
}

fn parse_sources(list: &str) -> Result<Vec<SourceKind>, ConfigError> {
    let mut sources = Vec::new();
    for name in list.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        let kind: SourceKind = name.parse().map_err(|source| ConfigError::UnknownSource {
            var: "PARKRIDE_SOURCES",
            source,
        })?;
        if !sources.contains(&kind) {
            sources.push(kind);
        }
    }
    Ok(sources)
}

fn parse_secs(var: &'static str, value: &str) -> Result<Duration, ConfigError> {
    value
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|e| ConfigError::InvalidValue {
            var,
            value: value.to_string(),
            reason: e.to_string(),
        })
}

fn parse_location(var: &'static str, value: &str) -> Result<Position, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidValue {
        var,
        value: value.to_string(),
        reason: reason.to_string(),
    };

    let (lat, lon) = value
        .split_once(',')
        .ok_or_else(|| invalid("expected \"lat,lon\""))?;
    let latitude: f64 = lat.trim().parse().map_err(|_| invalid("bad latitude"))?;
    let longitude: f64 = lon.trim().parse().map_err(|_| invalid("bad longitude"))?;

    let position = Position::new(latitude, longitude);
    if !position.is_finite() || latitude.abs() > 90.0 || longitude.abs() > 180.0 {
        return Err(invalid("out of range"));
    }
    Ok(position)
}
