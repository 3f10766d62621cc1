//! Google Maps directions URL generation.
//!
//! Lets the UI link each resolved car park to turn-by-turn directions
//! without embedding a maps SDK.

use crate::domain::Facility;
use crate::geo::Position;

const DIRECTIONS_BASE: &str = "https://www.google.com/maps/dir/?api=1";

/// Generate a directions URL to `destination`.
///
/// The starting point is left to the maps app (the user's location).
///
/// # Example
///
/// ```ignore
/// // For Tallawong:
/// let url = directions_url(Position::new(-33.6896, 150.9068));
/// // Returns: "https://www.google.com/maps/dir/?api=1&destination=-33.6896,150.9068"
/// ```
pub fn directions_url(destination: Position) -> String {
    format!(
        "{DIRECTIONS_BASE}&destination={},{}",
        destination.latitude, destination.longitude
    )
}

/// Directions URL for a facility, or `None` if it cannot be placed on a map.
pub fn facility_directions_url(facility: &Facility) -> Option<String> {
    facility
        .position
        .filter(|p| p.is_usable())
        .map(directions_url)
}
