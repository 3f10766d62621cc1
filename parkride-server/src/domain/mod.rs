//! Domain types for the Park&Ride occupancy service.
//!
//! Everything the sources produce is normalized into these types before
//! the rest of the crate sees it, so code that receives them can trust
//! their invariants (clean names, non-negative free counts).

mod facility;
mod names;
mod occupancy;
mod station_code;

pub use facility::{Availability, Facility, FacilityId};
pub use names::{
    FACILITY_PREFIX, FACILITY_PREFIX_DISPLAY, canonical_name, clean_display_name,
    collapse_whitespace, match_key, station_after_prefix, strip_facility_prefix,
    with_facility_prefix,
};
pub use occupancy::{
    Occupancy, OccupancyEntry, OccupancyMap, OccupancyReading, SCRAPED_TOTAL_ESTIMATE_FACTOR,
};
pub use station_code::{InvalidStationCode, StationCode};
