//! Static facility coordinate table.
//!
//! The GraphQL feed carries names but no geometry, so positions are kept
//! here, keyed by canonical (lowercase, marker-free) facility name.
//! Coordinates are approximate and mostly taken from the station itself.
//!
//! Order matters: fuzzy lookups return the first matching entry.

/// One row of the coordinate table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableEntry {
    /// Canonical facility name.
    pub key: &'static str,
    pub latitude: f64,
    pub longitude: f64,
    pub station_code: Option<&'static str>,
}

const fn entry(key: &'static str, latitude: f64, longitude: f64, code: &'static str) -> TableEntry {
    TableEntry {
        key,
        latitude,
        longitude,
        station_code: Some(code),
    }
}

/// Known Park&Ride facilities.
pub static FACILITY_COORDINATES: &[TableEntry] = &[
    // Sydney Metro Northwest
    entry("park&ride - tallawong", -33.6896, 150.9068, "TWG"),
    entry("park&ride - kellyville", -33.7135, 150.9490, "KVE"),
    entry("park&ride - bella vista", -33.7299, 150.9577, "BVA"),
    entry("park&ride - hills showground", -33.7275, 150.9856, "HSG"),
    entry("park&ride - cherrybrook", -33.7375, 151.0033, "CBK"),

    // Train and bus interchanges
    entry("park&ride - ashfield", -33.8889, 151.1256, "AFD"),
    entry("park&ride - beverly hills", -33.9481, 151.0806, "BVH"),
    entry("park&ride - brookvale", -33.7608, 151.2650, "BKV"),
    entry("park&ride - campbelltown farrow rd (north)", -34.0667, 150.8167, "CTN"),
    entry("park&ride - campbelltown hurley st", -34.0667, 150.8167, "CTN"),
    entry("park&ride - dee why", -33.7500, 151.3000, "DYH"),
    entry("park&ride - edmondson park (south)", -33.9600, 150.8600, "EDP"),
    entry("park&ride - gordon", -33.7562, 151.1540, "GDN"),
    entry("park&ride - hornsby", -33.7025, 151.0994, "HBY"),
    entry("park&ride - kogarah", -33.9631, 151.1356, "KGH"),
    entry("park&ride - leppington", -33.9500, 150.8000, "LEP"),
    entry("park&ride - macquarie park", -33.7800, 151.1200, "MQP"),
    entry("park&ride - emu plains", -33.7500, 150.6500, "EMP"),
    entry("park&ride - gosford", -33.4267, 151.3428, "GFD"),
    entry("park&ride - kiama", -34.6717, 150.8544, "KIA"),
    entry("park&ride - penrith (at-grade)", -33.7500, 150.7000, "PNT"),
    entry("park&ride - penrith (multi-level)", -33.7500, 150.7000, "PNT"),
    entry("park&ride - revesby", -33.9500, 151.0167, "RVB"),
    entry("park&ride - riverwood", -33.9500, 151.0500, "RWD"),
    entry("park&ride - schofields", -33.7000, 150.8667, "SFS"),
    entry("park&ride - seven hills", -33.7738, 150.9351, "SEV"),
    entry("park&ride - st marys", -33.7667, 150.7667, "SMS"),
    entry("park&ride - sutherland", -34.0333, 151.0667, "STL"),
    entry("park&ride - tallawong p1", -33.6896, 150.9068, "TWG"),
    entry("park&ride - tallawong p2", -33.6896, 150.9068, "TWG"),
    entry("park&ride - tallawong p3", -33.6896, 150.9068, "TWG"),
    entry("park&ride - kellyville (north)", -33.7135, 150.9490, "KVE"),
    entry("park&ride - kellyville (south)", -33.7135, 150.9490, "KVE"),
    entry("park&ride - warriewood", -33.6833, 151.3000, "WWD"),
    entry("park&ride - warwick farm", -33.9167, 150.9333, "WKF"),
    entry("park&ride - west ryde", -33.8083, 151.0833, "WRD"),
    entry("park&ride - gordon henry st (north)", -33.7562, 151.1540, "GDN"),
    entry("park&ride - lindfield village green", -33.7750, 151.1667, "LFD"),
    entry("park&ride - manly vale", -33.7833, 151.2667, "MLV"),
    entry("park&ride - mona vale", -33.6833, 151.3000, "MNV"),
    entry("park&ride - narrabeen", -33.7167, 151.3000, "NBN"),
    entry("park&ride - north rocks", -33.7833, 151.0167, "NRK"),
    entry("park&ride - wynyard", -33.8667, 151.2000, "WYD"),

    // Alternative spellings used by older feeds
    entry("tallawong station car park", -33.6896, 150.9068, "TWG"),
    entry("kellyville station car park", -33.7135, 150.9490, "KVE"),
    entry("bella vista station", -33.7299, 150.9577, "BVA"),
    entry("hills showground station", -33.7275, 150.9856, "HSG"),
    entry("cherrybrook station", -33.7375, 151.0033, "CBK"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_canonical() {
        for entry in FACILITY_COORDINATES {
            assert_eq!(
                entry.key,
                crate::domain::canonical_name(entry.key),
                "key {:?} is not canonical",
                entry.key
            );
        }
    }

    #[test]
    fn keys_are_unique() {
        let mut keys: Vec<_> = FACILITY_COORDINATES.iter().map(|e| e.key).collect();
        keys.sort_unstable();
        let before = keys.len();
        keys.dedup();
        assert_eq!(keys.len(), before);
    }

    #[test]
    fn positions_are_around_sydney() {
        for entry in FACILITY_COORDINATES {
            assert!((-35.0..=-33.0).contains(&entry.latitude), "{}", entry.key);
            assert!((150.0..=152.0).contains(&entry.longitude), "{}", entry.key);
        }
    }

    #[test]
    fn station_codes_are_valid() {
        for entry in FACILITY_COORDINATES {
            if let Some(code) = entry.station_code {
                assert!(crate::domain::StationCode::parse(code).is_ok(), "{code}");
            }
        }
    }
}
