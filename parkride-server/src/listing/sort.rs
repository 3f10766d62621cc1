//! Facility orderings.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::domain::Facility;
use crate::geo::Position;

/// How to order a facility list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SortOrder {
    /// Case-insensitive by display name. Names are ASCII, so lowercase
    /// code-point order matches locale collation.
    Name,
    /// Most free spaces first.
    Availability,
    /// Closest to the reference first; unresolved facilities last.
    Distance(Position),
}

/// Sort key names accepted by [`SortKey::from_str`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Name,
    Availability,
    Distance,
}

/// Error returned when parsing an unknown sort key.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown sort order {0:?} (expected name, availability or distance)")]
pub struct UnknownSortKey(pub String);

impl FromStr for SortKey {
    type Err = UnknownSortKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "name" => Ok(SortKey::Name),
            "availability" | "spots" => Ok(SortKey::Availability),
            "distance" => Ok(SortKey::Distance),
            _ => Err(UnknownSortKey(s.to_string())),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SortKey::Name => "name",
            SortKey::Availability => "availability",
            SortKey::Distance => "distance",
        })
    }
}

/// Return the facilities in the requested order.
///
/// All orderings are stable: facilities that compare equal keep their
/// input order.
pub fn sort_facilities(facilities: &[Facility], order: SortOrder) -> Vec<&Facility> {
    let mut sorted: Vec<&Facility> = facilities.iter().collect();

    match order {
        SortOrder::Name => sorted.sort_by_cached_key(|f| f.name.to_lowercase()),
        SortOrder::Availability => sorted.sort_by_key(|f| std::cmp::Reverse(f.spots_free())),
        SortOrder::Distance(reference) => {
            let mut keyed: Vec<(Option<f64>, &Facility)> = sorted
                .into_iter()
                .map(|f| (f.distance_from(reference), f))
                .collect();
            keyed.sort_by(|(a, _), (b, _)| compare_distance(*a, *b));
            sorted = keyed.into_iter().map(|(_, f)| f).collect();
        }
    }

    sorted
}

/// Known distances ascending, unknown after all known.
fn compare_distance(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FacilityId, Occupancy};

    fn facility(id: &str, name: &str, free: u32) -> Facility {
        Facility::new(FacilityId::new(id), name).with_occupancy(Occupancy::new(free, 0))
    }

    fn ids(sorted: &[&Facility]) -> Vec<String> {
        sorted.iter().map(|f| f.id.to_string()).collect()
    }

    #[test]
    fn by_name_ignores_case() {
        let list = vec![
            facility("1", "park&ride - gordon", 0),
            facility("2", "Park&Ride - Ashfield", 0),
            facility("3", "PARK&RIDE - BELLA VISTA", 0),
        ];
        assert_eq!(ids(&sort_facilities(&list, SortOrder::Name)), ["2", "3", "1"]);
    }

    #[test]
    fn by_availability_descending_and_stable() {
        let list = vec![
            facility("1", "a", 10),
            facility("2", "b", 50),
            facility("3", "c", 10),
            facility("4", "d", 0),
        ];
        assert_eq!(
            ids(&sort_facilities(&list, SortOrder::Availability)),
            ["2", "1", "3", "4"]
        );
    }

    #[test]
    fn by_distance_puts_unresolved_last_in_input_order() {
        let seven_hills = Position::new(-33.7738, 150.9351);
        let list = vec![
            facility("u1", "unresolved one", 0),
            facility("gdn", "gordon", 0).with_position(Position::new(-33.7562, 151.1540)),
            facility("u2", "unresolved two", 0).with_position(Position::new(0.0, 0.0)),
            facility("bva", "bella vista", 0).with_position(Position::new(-33.7299, 150.9577)),
        ];
        assert_eq!(
            ids(&sort_facilities(&list, SortOrder::Distance(seven_hills))),
            ["bva", "gdn", "u1", "u2"]
        );
    }

    #[test]
    fn sort_key_parsing() {
        assert_eq!("Distance".parse::<SortKey>().unwrap(), SortKey::Distance);
        assert_eq!("spots".parse::<SortKey>().unwrap(), SortKey::Availability);
        assert!("price".parse::<SortKey>().is_err());
        assert_eq!(SortKey::default(), SortKey::Name);
    }
}
