//! Occupancy snapshots and the readings that update them.

use serde::Serialize;

use super::FacilityId;

/// How many spaces a facility has and how many are taken, at one moment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Occupancy {
    /// Total capacity.
    pub total: u32,
    /// Occupied spaces as reported. May exceed `total` on noisy feeds.
    pub occupied: u32,
    /// Time-of-day label of the last update (e.g. `"12:05"`), empty if unknown.
    pub time: String,
    /// Month label of the last update (e.g. `"Oct"`), empty if unknown.
    pub month: String,
}

impl Occupancy {
    /// Counts without time labels.
    pub fn new(total: u32, occupied: u32) -> Self {
        Self {
            total,
            occupied,
            ..Self::default()
        }
    }

    /// Attach the update labels.
    pub fn with_labels(mut self, time: impl Into<String>, month: impl Into<String>) -> Self {
        self.time = time.into();
        self.month = month.into();
        self
    }

    /// Free spaces: `max(0, total - occupied)`, so never above `total`.
    pub fn spots_free(&self) -> u32 {
        self.total.saturating_sub(self.occupied)
    }

    /// Whether any capacity is known.
    pub fn has_data(&self) -> bool {
        self.total > 0
    }
}

/// Multiplier used to guess capacity when a source only reports free spaces.
pub const SCRAPED_TOTAL_ESTIMATE_FACTOR: u32 = 2;

/// One occupancy observation from a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OccupancyReading {
    /// Full counts. Replaces whatever the facility had.
    Counts(Occupancy),
    /// Only free spaces are known (scraped pages).
    Available { spaces: u32 },
}

impl OccupancyReading {
    /// Produce the facility's new occupancy from its current one.
    ///
    /// For free-space-only readings the existing capacity is kept when
    /// known; otherwise it is estimated as
    /// `SCRAPED_TOTAL_ESTIMATE_FACTOR * spaces`. The existing labels are
    /// kept because a scraped page carries none.
    pub fn apply_to(&self, current: &Occupancy) -> Occupancy {
        match self {
            OccupancyReading::Counts(occupancy) => occupancy.clone(),
            OccupancyReading::Available { spaces } => {
                let total = if current.total > 0 {
                    current.total
                } else {
                    spaces.saturating_mul(SCRAPED_TOTAL_ESTIMATE_FACTOR)
                };
                Occupancy {
                    total,
                    occupied: total.saturating_sub(*spaces),
                    time: current.time.clone(),
                    month: current.month.clone(),
                }
            }
        }
    }
}

/// An occupancy reading addressed to a facility by id, name, or both.
#[derive(Debug, Clone, PartialEq)]
pub struct OccupancyEntry {
    pub id: Option<FacilityId>,
    pub name: Option<String>,
    pub reading: OccupancyReading,
}

/// Occupancy readings from one source, in source order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OccupancyMap {
    entries: Vec<OccupancyEntry>,
}

impl OccupancyMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: OccupancyEntry) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &OccupancyEntry> {
        self.entries.iter()
    }

    /// The first entry carrying this id.
    pub fn get_by_id(&self, id: &FacilityId) -> Option<&OccupancyEntry> {
        self.entries.iter().find(|e| e.id.as_ref() == Some(id))
    }
}

impl FromIterator<OccupancyEntry> for OccupancyMap {
    fn from_iter<I: IntoIterator<Item = OccupancyEntry>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spots_free_saturates() {
        assert_eq!(Occupancy::new(100, 40).spots_free(), 60);
        assert_eq!(Occupancy::new(100, 140).spots_free(), 0);
        assert_eq!(Occupancy::new(0, 0).spots_free(), 0);
    }

    #[test]
    fn counts_replace_current() {
        let current = Occupancy::new(500, 10).with_labels("09:00", "Sep");
        let reading = OccupancyReading::Counts(Occupancy::new(600, 300).with_labels("10:00", "Oct"));
        assert_eq!(reading.apply_to(&current), Occupancy::new(600, 300).with_labels("10:00", "Oct"));
    }

    #[test]
    fn available_keeps_known_total() {
        let current = Occupancy::new(1000, 0).with_labels("12:00", "Oct");
        let next = OccupancyReading::Available { spaces: 150 }.apply_to(&current);
        assert_eq!(next.total, 1000);
        assert_eq!(next.occupied, 850);
        assert_eq!(next.spots_free(), 150);
        assert_eq!(next.time, "12:00");
    }

    #[test]
    fn available_estimates_unknown_total() {
        let next = OccupancyReading::Available { spaces: 42 }.apply_to(&Occupancy::default());
        assert_eq!(next.total, 84);
        assert_eq!(next.spots_free(), 42);
    }

    #[test]
    fn available_above_known_total_is_clamped() {
        let current = Occupancy::new(30, 0);
        let next = OccupancyReading::Available { spaces: 45 }.apply_to(&current);
        assert_eq!(next.total, 30);
        assert_eq!(next.spots_free(), 30);
    }

    #[test]
    fn lookup_by_id_returns_first() {
        let id = FacilityId::new("26");
        let map: OccupancyMap = vec![
            OccupancyEntry {
                id: Some(id.clone()),
                name: None,
                reading: OccupancyReading::Available { spaces: 1 },
            },
            OccupancyEntry {
                id: Some(id.clone()),
                name: None,
                reading: OccupancyReading::Available { spaces: 2 },
            },
        ]
        .into_iter()
        .collect();

        assert_eq!(
            map.get_by_id(&id).map(|e| &e.reading),
            Some(&OccupancyReading::Available { spaces: 1 })
        );
        assert!(map.get_by_id(&FacilityId::new("27")).is_none());
    }
}
