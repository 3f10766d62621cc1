//! Merging occupancy readings into a facility list.
//!
//! Sources disagree on ids and spelling, so readings are matched to
//! facilities by id first and then by a fuzzy name comparison.

use std::collections::HashSet;

use crate::domain::{Facility, OccupancyMap, match_key};

/// Minimum share of the shorter name's words that must appear in the
/// other name for a containment match to count.
pub const WORD_OVERLAP_THRESHOLD: f64 = 0.5;

/// Whether two facility names refer to the same car park.
///
/// Both names are reduced to their match key (prefix stripped, whitespace
/// collapsed, lowercase). Equal keys match. Otherwise one key must contain
/// the other and they must share at least [`WORD_OVERLAP_THRESHOLD`] of
/// the shorter key's words. Empty names never match.
pub fn names_match(a: &str, b: &str) -> bool {
    let a = match_key(a);
    let b = match_key(b);
    if a.is_empty() || b.is_empty() {
        return false;
    }
    if a == b {
        return true;
    }
    if !(a.contains(&b) || b.contains(&a)) {
        return false;
    }

    let words_a: HashSet<&str> = a.split(' ').collect();
    let words_b: HashSet<&str> = b.split(' ').collect();
    let common = words_a.intersection(&words_b).count();
    let shorter = words_a.len().min(words_b.len());

    common as f64 >= WORD_OVERLAP_THRESHOLD * shorter as f64
}

/// Apply readings to the facilities they belong to.
///
/// Each facility takes the first reading with its id, or failing that the
/// first reading whose name matches. Facilities with no reading keep their
/// occupancy; readings that match nothing are dropped.
pub fn merge_occupancy(facilities: Vec<Facility>, occupancy: &OccupancyMap) -> Vec<Facility> {
    if occupancy.is_empty() {
        return facilities;
    }

    facilities
        .into_iter()
        .map(|mut facility| {
            let entry = occupancy.get_by_id(&facility.id).or_else(|| {
                occupancy.iter().find(|entry| {
                    entry
                        .name
                        .as_deref()
                        .is_some_and(|name| names_match(name, &facility.name))
                })
            });
            if let Some(entry) = entry {
                facility.occupancy = entry.reading.apply_to(&facility.occupancy);
            }
            facility
        })
        .collect()
}
