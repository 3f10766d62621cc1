//! Coordinate lookup for facilities whose source carries no geometry.
//!
//! Matching is deliberately simple:
//!
//! 1. exact match on the canonical name;
//! 2. otherwise the first table entry where either name contains the other;
//! 3. otherwise the station part after a `Park&Ride -` prefix is matched
//!    the same way.
//!
//! When several entries satisfy a containment test the first one in table
//! order wins. That is not always the best match (e.g. a new
//! `"park&ride - kellyville (east)"` resolves to the plain Kellyville entry),
//! but it is deterministic.

mod table;

use tracing::warn;

use crate::domain::{StationCode, canonical_name, station_after_prefix, strip_facility_prefix};
use crate::geo::Position;

pub use table::{FACILITY_COORDINATES, TableEntry};

/// Result of a successful lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLocation {
    /// Table key that matched.
    pub key: &'static str,
    pub position: Position,
    pub station_code: Option<StationCode>,
}

impl ResolvedLocation {
    fn from_entry(entry: &TableEntry) -> Self {
        Self {
            key: entry.key,
            position: Position::new(entry.latitude, entry.longitude),
            station_code: entry
                .station_code
                .and_then(|code| StationCode::parse(code).ok()),
        }
    }
}

/// Name → position lookup over a static, ordered table.
#[derive(Debug, Clone, Copy)]
pub struct CoordinateResolver {
    entries: &'static [TableEntry],
}

impl Default for CoordinateResolver {
    fn default() -> Self {
        Self::new(FACILITY_COORDINATES)
    }
}

impl CoordinateResolver {
    /// Create a resolver over a custom table.
    pub fn new(entries: &'static [TableEntry]) -> Self {
        Self { entries }
    }

    /// Number of table entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve a raw facility name, logging a warning on a miss.
    pub fn resolve(&self, name: &str) -> Option<ResolvedLocation> {
        let found = self.find(name);
        if found.is_none() {
            warn!(facility = name, "no coordinates found for facility");
        }
        found.map(ResolvedLocation::from_entry)
    }

    fn find(&self, name: &str) -> Option<&'static TableEntry> {
        let canonical = canonical_name(name);
        if canonical.is_empty() {
            return None;
        }

        let entries = self.entries;

        if let Some(entry) = entries.iter().find(|e| e.key == canonical) {
            return Some(entry);
        }

        if let Some(entry) = entries
            .iter()
            .find(|e| canonical.contains(e.key) || e.key.contains(canonical.as_str()))
        {
            return Some(entry);
        }

        let station = station_after_prefix(&canonical)?;
        entries.iter().find(|e| {
            let bare = strip_facility_prefix(e.key);
            e.key.contains(station) || (!bare.is_empty() && station.contains(bare))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const fn row(key: &'static str, latitude: f64, code: Option<&'static str>) -> TableEntry {
        TableEntry {
            key,
            latitude,
            longitude: 151.0,
            station_code: code,
        }
    }

    static ORDERED: &[TableEntry] = &[
        row("park&ride - kellyville", -1.0, Some("KVE")),
        row("park&ride - kellyville (north)", -2.0, Some("KVE")),
        row("park&ride - gordon", -3.0, None),
        row("park&ride - gordon henry st (north)", -4.0, Some("GDN")),
    ];

    fn resolver() -> CoordinateResolver {
        CoordinateResolver::new(ORDERED)
    }

    #[test]
    fn exact_match_wins_over_earlier_partial() {
        let hit = resolver().resolve("Park&Ride - Kellyville (north)").unwrap();
        assert_eq!(hit.key, "park&ride - kellyville (north)");
        assert_eq!(hit.position.latitude, -2.0);
    }

    #[test]
    fn every_builtin_key_resolves_to_itself() {
        let resolver = CoordinateResolver::default();
        for entry in FACILITY_COORDINATES {
            let hit = resolver.resolve(&entry.key.to_uppercase()).unwrap();
            assert_eq!(hit.key, entry.key);
        }
    }

    #[test]
    fn historical_marker_is_ignored() {
        let hit = resolver()
            .resolve("Park&Ride - Gordon (historical only)")
            .unwrap();
        assert_eq!(hit.key, "park&ride - gordon");
        assert_eq!(hit.station_code, None);
    }

    #[test]
    fn input_containing_key_takes_first_in_table_order() {
        // Matches both kellyville rows by containment; first one wins.
        let hit = resolver().resolve("Park&Ride - Kellyville (east)").unwrap();
        assert_eq!(hit.key, "park&ride - kellyville");
    }

    #[test]
    fn key_containing_input() {
        let hit = resolver().resolve("Gordon Henry St").unwrap();
        assert_eq!(hit.key, "park&ride - gordon henry st (north)");
        assert_eq!(hit.station_code, Some(StationCode::parse("GDN").unwrap()));
    }

    #[test]
    fn station_fragment_after_prefix() {
        // No spaces around the dash, so neither containment test passes
        // on the full name.
        let hit = resolver().resolve("Park&Ride-Gordon").unwrap();
        assert_eq!(hit.key, "park&ride - gordon");
    }

    #[test]
    fn station_fragment_containing_bare_key() {
        let hit = resolver().resolve("park&ride-gordon upper level").unwrap();
        assert_eq!(hit.key, "park&ride - gordon");
    }

    #[test]
    fn unknown_name_is_not_found() {
        assert!(resolver().resolve("Park&Ride - Ashfield").is_none());
        assert!(resolver().resolve("Central Station").is_none());
    }

    #[test]
    fn empty_name_is_not_found() {
        assert!(resolver().resolve("").is_none());
        assert!(resolver().resolve(" (historical only) ").is_none());
    }

    #[test]
    fn builtin_table_resolves_metro_variants() {
        let resolver = CoordinateResolver::default();
        let hit = resolver.resolve("Tallawong Station Car Park").unwrap();
        assert_eq!(hit.station_code.unwrap().as_str(), "TWG");
        let hit = resolver.resolve("Park&Ride - Tallawong P2").unwrap();
        assert_eq!(hit.key, "park&ride - tallawong p2");
    }
}
