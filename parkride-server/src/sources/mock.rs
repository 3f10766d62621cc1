//! Demo data source for running without upstream access.
//!
//! Serves either a small built-in set of Sydney car parks or records
//! loaded from a JSON file in the TfNSW occupancy format. Anything served
//! from here is flagged as demo data.

use std::path::Path;
use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::RwLock;

use super::error::SourceError;
use super::types::{
    CarparkPayload, FacilityDetailDto, LenientNumber, RawCounts, RawFacility, SourceBatch,
    SourceKind,
};
use super::FacilitySource;

/// id, name, latitude, longitude, station code, total, occupied, time
type DemoRow = (&'static str, &'static str, f64, f64, &'static str, u32, u32, &'static str);

const DEMO_CARPARKS: [DemoRow; 5] = [
    ("1", "Tallawong Station Car Park", -33.6896, 150.9068, "TWG", 1000, 850, "12:00"),
    ("2", "Kellyville Station Car Park", -33.7135, 150.9490, "KVE", 1360, 200, "12:05"),
    ("3", "Bella Vista Station", -33.7299, 150.9577, "BVA", 800, 795, "12:10"),
    ("4", "Hills Showground Station", -33.7275, 150.9856, "HSG", 600, 300, "12:15"),
    ("5", "Gordon Station Car Park", -33.7562, 151.1540, "GDN", 200, 180, "12:15"),
];

const DEMO_MONTH: &str = "Oct";

/// Mock source that serves fixed records.
#[derive(Debug, Clone)]
pub struct MockSource {
    records: Arc<RwLock<Vec<RawFacility>>>,
}

impl MockSource {
    /// The built-in demo car parks.
    pub fn builtin() -> Self {
        let records = DEMO_CARPARKS
            .iter()
            .map(|&(id, name, lat, lon, code, total, occupied, time)| {
                RawFacility::named(name)
                    .with_id(id)
                    .with_coordinates(lat, lon)
                    .with_station_code(code)
                    .with_counts(RawCounts::TotalOccupied {
                        total: Some(LenientNumber::from(total)),
                        occupied: Some(LenientNumber::from(occupied)),
                    })
                    .with_labels(time, DEMO_MONTH)
            })
            .collect();
        Self::with_records(records)
    }

    /// Load records from a JSON file shaped like the TfNSW occupancy
    /// response: an array of facilities or an object keyed by id.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        Ok(Self::with_records(load_records(path.as_ref())?))
    }

    pub fn with_records(records: Vec<RawFacility>) -> Self {
        Self {
            records: Arc::new(RwLock::new(records)),
        }
    }

    /// Number of records currently served.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Reload records from disk (useful while editing demo data).
    ///
    /// On failure the current records are kept.
    pub async fn reload(&self, path: impl AsRef<Path>) -> Result<usize, SourceError> {
        let fresh = load_records(path.as_ref())?;
        let count = fresh.len();
        *self.records.write().await = fresh;
        Ok(count)
    }
}

fn load_records(path: &Path) -> Result<Vec<RawFacility>, SourceError> {
    let json = std::fs::read_to_string(path).map_err(|e| {
        SourceError::NotConfigured(format!("failed to read mock data {}: {e}", path.display()))
    })?;

    let payload: CarparkPayload<FacilityDetailDto> = serde_json::from_str(&json)
        .map_err(|e| SourceError::malformed(format!("{}: {e}", path.display()), &json))?;

    Ok(payload
        .into_entries()
        .into_iter()
        .map(|(key, detail)| detail.into_raw(key))
        .filter(|record| !record.is_blank())
        .collect())
}

impl FacilitySource for MockSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Mock
    }

    fn fetch_facilities(&self) -> BoxFuture<'_, Result<SourceBatch, SourceError>> {
        Box::pin(async move { Ok(SourceBatch::Records(self.records.read().await.clone())) })
    }
}
