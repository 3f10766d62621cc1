//! Raw source records to domain facilities.

use std::collections::{BTreeSet, HashSet};

use crate::coordinates::CoordinateResolver;
use crate::domain::{
    Facility, FacilityId, Occupancy, OccupancyEntry, OccupancyMap, OccupancyReading, StationCode,
    clean_display_name,
};
use crate::geo::Position;
use crate::sources::{RawCounts, RawFacility, count_of};

/// Facilities built from one batch, plus the names that could not be
/// placed on the map.
#[derive(Debug, Clone, Default)]
pub struct Normalized {
    pub facilities: Vec<Facility>,
    pub missing_coordinates: BTreeSet<String>,
}

/// Normalize raw records into facilities.
///
/// - names are cleaned of historical markers;
/// - counts are parsed leniently, anything unusable is 0;
/// - a missing or `(0, 0)` position is looked up by name, and the table's
///   station code is used only when the source had none;
/// - records without an id get `"{index}-{slug}"`, and repeated ids are
///   suffixed `-2`, `-3`, … so ids stay unique.
pub fn normalize_records(records: &[RawFacility], resolver: &CoordinateResolver) -> Normalized {
    let mut out = Normalized::default();
    let mut seen = HashSet::new();

    for (index, raw) in records.iter().enumerate() {
        if raw.is_blank() {
            continue;
        }

        let source_id = raw.id.as_deref().map(str::trim).filter(|id| !id.is_empty());
        let mut name = clean_display_name(&raw.name);
        if name.is_empty() {
            name = source_id.unwrap_or_default().to_string();
        }

        let base_id = match source_id {
            Some(id) => id.to_string(),
            None => format!("{index}-{}", slug(&name)),
        };
        let id = unique_id(base_id, &mut seen);

        let occupancy = reading_of(raw)
            .map(|reading| reading.apply_to(&Occupancy::default()))
            .unwrap_or_default();

        let mut facility = Facility::new(FacilityId::new(id), name).with_occupancy(occupancy);

        if let Some(code) = raw
            .station_code
            .as_deref()
            .and_then(|code| StationCode::parse_normalized(code).ok())
        {
            facility = facility.with_station_code(code);
        }

        match source_position(raw) {
            Some(position) => facility = facility.with_position(position),
            None => match resolver.resolve(&raw.name) {
                Some(hit) => {
                    facility.position = Some(hit.position);
                    if facility.station_code.is_none() {
                        facility.station_code = hit.station_code;
                    }
                }
                None => {
                    out.missing_coordinates.insert(facility.name.clone());
                }
            },
        }

        out.facilities.push(facility);
    }

    out
}

/// Occupancy readings addressed by id and cleaned name, for merging into
/// an existing facility list.
pub fn occupancy_entries(records: &[RawFacility]) -> OccupancyMap {
    records
        .iter()
        .filter_map(|raw| {
            let reading = reading_of(raw)?;
            let id = raw
                .id
                .as_deref()
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(FacilityId::new);
            let name = Some(clean_display_name(&raw.name)).filter(|n| !n.is_empty());
            if id.is_none() && name.is_none() {
                return None;
            }
            Some(OccupancyEntry { id, name, reading })
        })
        .collect()
}

/// What the record says about occupancy, in domain terms.
fn reading_of(raw: &RawFacility) -> Option<OccupancyReading> {
    let occupancy = match &raw.counts {
        RawCounts::Missing => return None,
        RawCounts::TotalOccupied { total, occupied } => {
            Occupancy::new(count_of(total), count_of(occupied))
        }
        RawCounts::AvailableOccupied {
            available,
            occupied,
        } => {
            let occupied = count_of(occupied);
            Occupancy::new(count_of(available).saturating_add(occupied), occupied)
        }
        RawCounts::AvailableOnly { available } => {
            return Some(OccupancyReading::Available {
                spaces: count_of(available),
            });
        }
    };

    Some(OccupancyReading::Counts(occupancy.with_labels(
        raw.time.clone().unwrap_or_default(),
        raw.month.clone().unwrap_or_default(),
    )))
}

fn source_position(raw: &RawFacility) -> Option<Position> {
    let latitude = raw.latitude.as_ref()?.to_f64()?;
    let longitude = raw.longitude.as_ref()?.to_f64()?;
    Some(Position::new(latitude, longitude)).filter(Position::is_usable)
}

/// Lowercase alphanumeric words joined by `-`.
fn slug(name: &str) -> String {
    name.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

fn unique_id(base: String, seen: &mut HashSet<String>) -> String {
    if seen.insert(base.clone()) {
        return base;
    }
    let mut n = 2;
    loop {
        let candidate = format!("{base}-{n}");
        if seen.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::LenientNumber;

    fn resolver() -> CoordinateResolver {
        CoordinateResolver::default()
    }

    fn total_occupied(total: u32, occupied: u32) -> RawCounts {
        RawCounts::TotalOccupied {
            total: Some(LenientNumber::from(total)),
            occupied: Some(LenientNumber::from(occupied)),
        }
    }

    #[test]
    fn cleans_names_and_computes_free_spots() {
        let records = vec![
            RawFacility::named("Park&Ride - Gordon (Historical Only)")
                .with_id("5")
                .with_counts(total_occupied(200, 180))
                .with_labels("12:15", "Oct"),
        ];
        let out = normalize_records(&records, &resolver());

        let f = &out.facilities[0];
        assert_eq!(f.name, "Park&Ride - Gordon");
        assert_eq!(f.spots_free(), 20);
        assert_eq!(f.occupancy.time, "12:15");
        assert_eq!(f.station_code.as_ref().map(|c| c.as_str()), Some("GDN"));
        assert!(out.missing_coordinates.is_empty());
    }

    #[test]
    fn garbage_counts_become_zero() {
        let records = vec![RawFacility::named("Park&Ride - Ashfield").with_counts(
            RawCounts::TotalOccupied {
                total: Some(LenientNumber::Text("lots".into())),
                occupied: None,
            },
        )];
        let out = normalize_records(&records, &resolver());
        assert_eq!(out.facilities[0].occupancy, Occupancy::default());
    }

    #[test]
    fn graphql_counts_sum_to_total() {
        let records = vec![RawFacility::named("Park&Ride - Bella Vista").with_counts(
            RawCounts::AvailableOccupied {
                available: Some(LenientNumber::from(5u32)),
                occupied: Some(LenientNumber::from(795u32)),
            },
        )];
        let f = &normalize_records(&records, &resolver()).facilities[0];
        assert_eq!(f.occupancy.total, 800);
        assert_eq!(f.spots_free(), 5);
    }

    #[test]
    fn source_position_and_code_are_kept() {
        let records = vec![
            RawFacility::named("Park&Ride - Tallawong P1")
                .with_coordinates(-33.6917, 150.9046)
                .with_station_code("2155384"),
        ];
        let f = &normalize_records(&records, &resolver()).facilities[0];
        assert_eq!(f.position, Some(Position::new(-33.6917, 150.9046)));
        assert_eq!(f.station_code.as_ref().unwrap().as_str(), "2155384");
    }

    #[test]
    fn null_island_is_resolved_from_table() {
        let records = vec![
            RawFacility::named("Park&Ride - Tallawong P1")
                .with_coordinates(0.0, 0.0)
                .with_station_code("2155384"),
        ];
        let f = &normalize_records(&records, &resolver()).facilities[0];
        assert_eq!(f.position, Some(Position::new(-33.6896, 150.9068)));
        // Source code wins over the table's
        assert_eq!(f.station_code.as_ref().unwrap().as_str(), "2155384");
    }

    #[test]
    fn unresolved_facility_is_kept_and_reported() {
        let records = vec![
            RawFacility::named("Park&Ride - Nowhere Special").with_counts(total_occupied(10, 1)),
        ];
        let out = normalize_records(&records, &resolver());
        assert_eq!(out.facilities.len(), 1);
        assert!(!out.facilities[0].is_resolved());
        assert!(out.missing_coordinates.contains("Park&Ride - Nowhere Special"));
    }

    #[test]
    fn synthesized_ids_are_stable_and_unique() {
        let records = vec![
            RawFacility::named("Park&Ride - Kellyville (north)"),
            RawFacility::named("Park&Ride - Ashfield").with_id("1-park-ride-ashfield"),
            RawFacility::named("Park&Ride - Ashfield"),
            RawFacility::named("Park&Ride - Gordon").with_id("9"),
            RawFacility::named("Park&Ride - Gordon").with_id("9"),
        ];
        let first = normalize_records(&records, &resolver());
        let again = normalize_records(&records, &resolver());

        let ids: Vec<_> = first.facilities.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(
            ids,
            [
                "0-park-ride-kellyville-north",
                "1-park-ride-ashfield",
                "2-park-ride-ashfield",
                "9",
                "9-2",
            ]
        );
        assert_eq!(first.facilities, again.facilities);
    }

    #[test]
    fn blank_records_are_skipped() {
        let records = vec![RawFacility::default(), RawFacility::named("Park&Ride - Gordon")];
        assert_eq!(normalize_records(&records, &resolver()).facilities.len(), 1);
    }

    #[test]
    fn occupancy_entries_carry_id_and_clean_name() {
        let records = vec![
            RawFacility::named("Park&Ride - Gordon (historical)")
                .with_id("5")
                .with_counts(total_occupied(200, 100)),
            RawFacility::named("No counts").with_id("6"),
            RawFacility::named("Park&Ride - Ashfield").with_counts(RawCounts::AvailableOnly {
                available: Some(LenientNumber::from(42u32)),
            }),
        ];
        let map = occupancy_entries(&records);
        assert_eq!(map.len(), 2);

        let gordon = map.get_by_id(&FacilityId::new("5")).unwrap();
        assert_eq!(gordon.name.as_deref(), Some("Park&Ride - Gordon"));

        let ashfield = map.iter().nth(1).unwrap();
        assert_eq!(ashfield.id, None);
        assert_eq!(ashfield.reading, OccupancyReading::Available { spaces: 42 });
    }
}
