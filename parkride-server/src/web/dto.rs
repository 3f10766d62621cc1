//! Data transfer objects for web requests and responses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Availability, Facility};
use crate::geo::Position;
use crate::pipeline::FacilityList;
use crate::sources::SourceKind;

use super::directions::facility_directions_url;

/// Query for the facility list.
#[derive(Debug, Default, Deserialize)]
pub struct ListFacilitiesRequest {
    /// `name`, `availability` or `distance` (defaults to name)
    pub sort: Option<String>,

    /// Reference latitude for distance sorting
    pub lat: Option<f64>,

    /// Reference longitude for distance sorting
    pub lon: Option<f64>,

    /// Whether to list facilities that cannot be placed on a map (default true)
    pub include_unresolved: Option<bool>,
}

/// Free-text facility search.
#[derive(Debug, Default, Deserialize)]
pub struct SearchFacilitiesRequest {
    #[serde(default)]
    pub q: String,
}

/// Query for the closest facilities to a point.
#[derive(Debug, Default, Deserialize)]
pub struct NearestRequest {
    pub lat: Option<f64>,
    pub lon: Option<f64>,

    /// How many to return (defaults to 3)
    pub n: Option<usize>,
}

/// A facility as served to the UI.
#[derive(Debug, Serialize)]
pub struct FacilityResult {
    pub id: String,

    /// Cleaned display name
    pub name: String,

    /// Latitude, absent when unresolved
    pub lat: Option<f64>,

    /// Longitude, absent when unresolved
    pub lon: Option<f64>,

    pub station_code: Option<String>,

    /// Total spaces
    pub total: u32,

    /// Occupied spaces
    pub occupied: u32,

    /// Free spaces, never more than `total`
    pub spots_free: u32,

    pub availability: Availability,

    /// Whether upstream reports live (not historical) figures
    pub has_realtime_data: bool,

    /// Google Maps directions link
    pub directions_url: Option<String>,

    /// Distance from the request's reference point, when one applies
    pub distance_km: Option<f64>,

    /// Last update time label from upstream
    pub time: String,

    /// Month label from upstream
    pub month: String,
}

impl FacilityResult {
    /// Convert a facility, measuring distance from `reference` if given.
    pub fn from_facility(facility: &Facility, reference: Option<Position>) -> Self {
        let position = facility.position.filter(|p| p.is_usable());
        Self {
            id: facility.id.to_string(),
            name: facility.name.clone(),
            lat: position.map(|p| p.latitude),
            lon: position.map(|p| p.longitude),
            station_code: facility.station_code.as_ref().map(|c| c.to_string()),
            total: facility.occupancy.total,
            occupied: facility.occupancy.occupied,
            spots_free: facility.spots_free(),
            availability: facility.availability(),
            has_realtime_data: facility.has_realtime_data(),
            directions_url: facility_directions_url(facility),
            distance_km: reference.and_then(|r| facility.distance_from(r)),
            time: facility.occupancy.time.clone(),
            month: facility.occupancy.month.clone(),
        }
    }
}

/// Where a response's data came from.
#[derive(Debug, Serialize)]
pub struct Provenance {
    /// Source that served the data, absent when every source failed
    pub source: Option<SourceKind>,

    /// Served by a fallback rather than the preferred source
    pub degraded: bool,

    /// Served from demo data
    pub demo: bool,

    pub fetched_at: DateTime<Utc>,
}

impl Provenance {
    pub fn from_list(list: &FacilityList) -> Self {
        Self {
            source: list.served_by,
            degraded: list.degraded,
            demo: list.is_demo(),
            fetched_at: list.fetched_at,
        }
    }
}

/// Response for the list, search and nearest endpoints.
#[derive(Debug, Serialize)]
pub struct FacilityListResponse {
    #[serde(flatten)]
    pub provenance: Provenance,

    pub facilities: Vec<FacilityResult>,

    /// Names that could not be placed on the map
    pub missing_coordinates: Vec<String>,
}

impl FacilityListResponse {
    pub fn new(list: &FacilityList, facilities: Vec<FacilityResult>) -> Self {
        Self {
            provenance: Provenance::from_list(list),
            facilities,
            missing_coordinates: list.missing_coordinates.iter().cloned().collect(),
        }
    }
}

/// Occupancy figures for one facility.
#[derive(Debug, Serialize)]
pub struct OccupancyResult {
    pub id: String,
    pub name: String,
    pub total: u32,
    pub occupied: u32,
    pub spots_free: u32,
    pub availability: Availability,
    pub time: String,
    pub month: String,
}

impl OccupancyResult {
    pub fn from_facility(facility: &Facility) -> Self {
        Self {
            id: facility.id.to_string(),
            name: facility.name.clone(),
            total: facility.occupancy.total,
            occupied: facility.occupancy.occupied,
            spots_free: facility.spots_free(),
            availability: facility.availability(),
            time: facility.occupancy.time.clone(),
            month: facility.occupancy.month.clone(),
        }
    }
}

/// Response for the lightweight occupancy refresh.
#[derive(Debug, Serialize)]
pub struct OccupancyResponse {
    #[serde(flatten)]
    pub provenance: Provenance,

    pub occupancy: Vec<OccupancyResult>,
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
