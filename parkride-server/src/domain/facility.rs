//! The facility entity.

use std::fmt;

use serde::Serialize;

use crate::geo::{Position, distance_km};

use super::occupancy::Occupancy;
use super::station_code::StationCode;

/// Identifier of a facility within one reconciled snapshot.
///
/// Source ids are kept verbatim; ids for sources without them are
/// synthesized by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct FacilityId(String);

impl FacilityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FacilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Sydney Metro Northwest stations whose car parks report live counts.
const REALTIME_STATIONS: [&str; 5] = [
    "tallawong",
    "bella vista",
    "hills showground",
    "cherrybrook",
    "kellyville",
];

/// Facility ids of the Metro Northwest car parks in the TfNSW feed.
const REALTIME_FACILITY_IDS: [&str; 8] = ["26", "27", "28", "29", "30", "31", "32", "33"];

/// Free-space ratio below which a facility counts as full.
const FULL_RATIO: f64 = 0.10;

/// Free-space ratio below which a facility counts as filling up.
const FILLING_RATIO: f64 = 0.30;

/// Coarse availability shown next to a facility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    Good,
    FillingUp,
    Full,
    /// No capacity figures.
    Unknown,
}

/// One Park&Ride car park.
#[derive(Debug, Clone, PartialEq)]
pub struct Facility {
    pub id: FacilityId,
    /// Cleaned display name.
    pub name: String,
    /// `None` when the position could not be resolved.
    pub position: Option<Position>,
    pub station_code: Option<StationCode>,
    pub occupancy: Occupancy,
}

impl Facility {
    pub fn new(id: FacilityId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            position: None,
            station_code: None,
            occupancy: Occupancy::default(),
        }
    }

    pub fn with_position(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_station_code(mut self, code: StationCode) -> Self {
        self.station_code = Some(code);
        self
    }

    pub fn with_occupancy(mut self, occupancy: Occupancy) -> Self {
        self.occupancy = occupancy;
        self
    }

    pub fn spots_free(&self) -> u32 {
        self.occupancy.spots_free()
    }

    /// Whether the facility can be placed on a map.
    pub fn is_resolved(&self) -> bool {
        self.position.is_some_and(|p| p.is_usable())
    }

    /// Distance from `reference`, or `None` for unresolved facilities.
    pub fn distance_from(&self, reference: Position) -> Option<f64> {
        let position = self.position.filter(|p| p.is_usable())?;
        let d = distance_km(reference, position);
        d.is_finite().then_some(d)
    }

    pub fn availability(&self) -> Availability {
        if !self.occupancy.has_data() {
            return Availability::Unknown;
        }
        let ratio = f64::from(self.spots_free()) / f64::from(self.occupancy.total);
        if ratio < FULL_RATIO {
            Availability::Full
        } else if ratio < FILLING_RATIO {
            Availability::FillingUp
        } else {
            Availability::Good
        }
    }

    /// Whether this car park is one that reports live occupancy.
    ///
    /// Other facilities only have historical figures upstream.
    pub fn has_realtime_data(&self) -> bool {
        if REALTIME_FACILITY_IDS.contains(&self.id.as_str()) {
            return true;
        }
        let name = self.name.to_lowercase();
        REALTIME_STATIONS.iter().any(|station| name.contains(station))
    }
}
