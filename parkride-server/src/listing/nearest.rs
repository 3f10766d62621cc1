//! Closest facilities to a point.

use crate::domain::Facility;
use crate::geo::Position;

/// How many facilities "nearest" returns unless told otherwise.
pub const DEFAULT_NEAREST: usize = 3;

/// The `n` resolved facilities closest to `reference`, with their
/// distances in kilometres. Ties keep input order.
pub fn nearest(facilities: &[Facility], reference: Position, n: usize) -> Vec<(&Facility, f64)> {
    if !reference.is_finite() {
        return Vec::new();
    }

    let mut found: Vec<(&Facility, f64)> = facilities
        .iter()
        .filter_map(|f| f.distance_from(reference).map(|d| (f, d)))
        .collect();
    found.sort_by(|(_, a), (_, b)| a.total_cmp(b));
    found.truncate(n);
    found
}
