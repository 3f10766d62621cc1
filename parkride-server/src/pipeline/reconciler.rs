//! The source priority chain.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::coordinates::CoordinateResolver;
use crate::domain::{Facility, FacilityId, OccupancyMap};
use crate::sources::{FacilitySource, SourceBatch, SourceKind};

use super::merge::merge_occupancy;
use super::normalize::{Normalized, normalize_records, occupancy_entries};

/// One reconciled snapshot of every facility.
#[derive(Debug, Clone)]
pub struct FacilityList {
    pub facilities: Vec<Facility>,
    /// `None` when every source failed.
    pub served_by: Option<SourceKind>,
    /// Not served by the first source in the chain.
    pub degraded: bool,
    pub fetched_at: DateTime<Utc>,
    /// Names that could not be placed on the map this cycle.
    pub missing_coordinates: BTreeSet<String>,
}

impl FacilityList {
    /// The result of a cycle in which every source failed.
    pub fn empty() -> Self {
        Self {
            facilities: Vec::new(),
            served_by: None,
            degraded: true,
            fetched_at: Utc::now(),
            missing_coordinates: BTreeSet::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.facilities.is_empty()
    }

    pub fn len(&self) -> usize {
        self.facilities.len()
    }

    /// Served from demo data.
    pub fn is_demo(&self) -> bool {
        self.served_by == Some(SourceKind::Mock)
    }

    pub fn get(&self, id: &FacilityId) -> Option<&Facility> {
        self.facilities.iter().find(|f| &f.id == id)
    }
}

/// Occupancy readings from the first source that had any.
#[derive(Debug, Clone)]
pub struct OccupancyRefresh {
    pub occupancy: OccupancyMap,
    pub served_by: Option<SourceKind>,
    pub fetched_at: DateTime<Utc>,
}

/// Tries each source in priority order and reconciles the first
/// non-empty answer into a [`FacilityList`].
///
/// Holds no mutable state, so one instance can serve concurrent callers.
#[derive(Clone)]
pub struct Reconciler {
    sources: Vec<Arc<dyn FacilitySource>>,
    resolver: CoordinateResolver,
}

impl Reconciler {
    /// Create a reconciler over `sources`, highest priority first.
    pub fn new(sources: Vec<Arc<dyn FacilitySource>>) -> Self {
        Self {
            sources,
            resolver: CoordinateResolver::default(),
        }
    }

    pub fn with_resolver(mut self, resolver: CoordinateResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Source kinds in priority order.
    pub fn source_kinds(&self) -> Vec<SourceKind> {
        self.sources.iter().map(|s| s.kind()).collect()
    }

    /// Fetch and reconcile the facility list.
    ///
    /// Never fails: when every source errors or comes back empty the result
    /// is an empty list with `served_by` unset.
    pub async fn fetch_facilities(&self) -> FacilityList {
        for (index, source) in self.sources.iter().enumerate() {
            let kind = source.kind();

            let batch = match source.fetch_facilities().await {
                Ok(batch) => batch,
                Err(e) => {
                    warn!(source = %kind, error = %e, "source failed, trying next");
                    continue;
                }
            };

            if batch.is_empty() {
                info!(source = %kind, "source returned no facilities, trying next");
                continue;
            }

            let Normalized {
                facilities,
                missing_coordinates,
            } = self.reconcile(batch);

            if facilities.is_empty() {
                info!(source = %kind, "no usable facilities from source, trying next");
                continue;
            }

            if !missing_coordinates.is_empty() {
                warn!(
                    source = %kind,
                    count = missing_coordinates.len(),
                    facilities = ?missing_coordinates,
                    "facilities without coordinates"
                );
            }

            let degraded = index > 0;
            info!(
                source = %kind,
                facilities = facilities.len(),
                degraded,
                "facility list refreshed"
            );

            return FacilityList {
                facilities,
                served_by: Some(kind),
                degraded,
                fetched_at: Utc::now(),
                missing_coordinates,
            };
        }

        warn!(sources = self.sources.len(), "all sources exhausted");
        FacilityList::empty()
    }

    /// Fetch occupancy readings only, for refreshing an existing list.
    ///
    /// Walks the same chain; the first source with any readings wins.
    pub async fn fetch_occupancy_only(&self) -> OccupancyRefresh {
        for source in &self.sources {
            let kind = source.kind();
            match source.fetch_occupancy().await {
                Ok(records) => {
                    let occupancy = occupancy_entries(&records);
                    if occupancy.is_empty() {
                        info!(source = %kind, "source returned no occupancy, trying next");
                        continue;
                    }
                    info!(source = %kind, readings = occupancy.len(), "occupancy refreshed");
                    return OccupancyRefresh {
                        occupancy,
                        served_by: Some(kind),
                        fetched_at: Utc::now(),
                    };
                }
                Err(e) => warn!(source = %kind, error = %e, "occupancy source failed, trying next"),
            }
        }

        warn!(sources = self.sources.len(), "no source returned occupancy");
        OccupancyRefresh {
            occupancy: OccupancyMap::new(),
            served_by: None,
            fetched_at: Utc::now(),
        }
    }

    fn reconcile(&self, batch: SourceBatch) -> Normalized {
        match batch {
            SourceBatch::Records(records) => normalize_records(&records, &self.resolver),
            SourceBatch::Split { listing, occupancy } => {
                let normalized = normalize_records(&listing, &self.resolver);
                Normalized {
                    facilities: merge_occupancy(
                        normalized.facilities,
                        &occupancy_entries(&occupancy),
                    ),
                    missing_coordinates: normalized.missing_coordinates,
                }
            }
        }
    }
}
