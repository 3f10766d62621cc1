//! Application state for the web layer.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::cache::BatchStore;
use crate::geo::Position;
use crate::pipeline::{FacilityList, Reconciler, merge_occupancy};
use crate::sources::SourceKind;

/// Shared application state.
///
/// Holds the reconciler and the most recent non-empty facility list.
#[derive(Clone)]
pub struct AppState {
    /// Source chain and reconciliation
    pub reconciler: Arc<Reconciler>,

    /// Reference point when a request gives none
    pub default_location: Position,

    latest: Arc<RwLock<FacilityList>>,
    store: Option<BatchStore>,
}

/// Outcome of an occupancy-only refresh.
#[derive(Debug, Clone)]
pub struct OccupancyUpdate {
    /// The list with fresh figures merged in.
    pub list: FacilityList,
    /// Source of the fresh figures, `None` if no source had any.
    pub served_by: Option<SourceKind>,
    pub degraded: bool,
}

impl AppState {
    /// Create a new app state with an empty list.
    pub fn new(reconciler: Reconciler, default_location: Position) -> Self {
        Self {
            reconciler: Arc::new(reconciler),
            default_location,
            latest: Arc::new(RwLock::new(FacilityList::empty())),
            store: None,
        }
    }

    /// Attach the source cache so forced refreshes can bypass it.
    pub fn with_store(mut self, store: BatchStore) -> Self {
        self.store = Some(store);
        self
    }

    /// The most recent list.
    pub async fn snapshot(&self) -> FacilityList {
        self.latest.read().await.clone()
    }

    /// Run a full cycle and keep the result unless it came back empty.
    ///
    /// Returns the list now current.
    pub async fn refresh(&self) -> FacilityList {
        let fetched = self.reconciler.fetch_facilities().await;

        let mut latest = self.latest.write().await;
        if fetched.is_empty() {
            if !latest.is_empty() {
                warn!(
                    kept = latest.len(),
                    "refresh produced no facilities, keeping previous list"
                );
            }
        } else {
            *latest = fetched;
        }
        latest.clone()
    }

    /// Full cycle with cached source answers discarded first.
    pub async fn force_refresh(&self) -> FacilityList {
        if let Some(store) = &self.store {
            store.clear();
        }
        info!("forced refresh");
        self.refresh().await
    }

    /// Fetch occupancy only and merge it into the current list.
    ///
    /// Falls back to a full cycle when there is no list yet.
    pub async fn refresh_occupancy(&self) -> OccupancyUpdate {
        if self.latest.read().await.is_empty() {
            let list = self.refresh().await;
            return OccupancyUpdate {
                served_by: list.served_by,
                degraded: list.degraded,
                list,
            };
        }

        let refresh = self.reconciler.fetch_occupancy_only().await;
        let preferred = self.reconciler.source_kinds().first().copied();
        let degraded = refresh.served_by.is_none() || refresh.served_by != preferred;

        let mut latest = self.latest.write().await;
        if !refresh.occupancy.is_empty() {
            let facilities = std::mem::take(&mut latest.facilities);
            latest.facilities = merge_occupancy(facilities, &refresh.occupancy);
            latest.fetched_at = refresh.fetched_at;
        }

        OccupancyUpdate {
            list: latest.clone(),
            served_by: refresh.served_by,
            degraded,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures::future::BoxFuture;

    use super::*;
    use crate::cache::{CacheConfig, CachedSource, MemoryStore};
    use crate::sources::{
        FacilitySource, LenientNumber, MockSource, RawCounts, RawFacility, SourceBatch,
        SourceError,
    };

    /// Answers once, then fails.
    struct Flaky {
        calls: AtomicUsize,
    }

    impl FacilitySource for Flaky {
        fn kind(&self) -> SourceKind {
            SourceKind::Graphql
        }

        fn fetch_facilities(&self) -> BoxFuture<'_, Result<SourceBatch, SourceError>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move {
                if call == 0 {
                    Ok(SourceBatch::Records(vec![
                        RawFacility::named("Park&Ride - Ashfield").with_counts(
                            RawCounts::TotalOccupied {
                                total: Some(LenientNumber::from(100u32)),
                                occupied: Some(LenientNumber::from(40u32)),
                            },
                        ),
                    ]))
                } else {
                    Err(SourceError::Network("connection refused".to_string()))
                }
            })
        }
    }

    fn demo_state() -> AppState {
        let reconciler = Reconciler::new(vec![Arc::new(MockSource::builtin())]);
        AppState::new(reconciler, Position::new(-33.7738, 150.9351))
    }

    #[tokio::test]
    async fn starts_empty_and_refreshes() {
        let state = demo_state();
        assert!(state.snapshot().await.is_empty());

        let list = state.refresh().await;
        assert_eq!(list.len(), 5);
        assert!(list.is_demo());
        assert_eq!(state.snapshot().await.len(), 5);
    }

    #[tokio::test]
    async fn empty_refresh_keeps_previous_list() {
        let source = Flaky {
            calls: AtomicUsize::new(0),
        };
        let state = AppState::new(
            Reconciler::new(vec![Arc::new(source)]),
            Position::new(-33.7738, 150.9351),
        );

        assert_eq!(state.refresh().await.len(), 1);
        let second = state.refresh().await;
        assert_eq!(second.len(), 1);
        assert_eq!(second.facilities[0].spots_free(), 60);
    }

    #[tokio::test]
    async fn occupancy_refresh_without_list_runs_full_cycle() {
        let state = demo_state();
        let update = state.refresh_occupancy().await;
        assert_eq!(update.list.len(), 5);
        assert_eq!(update.served_by, Some(SourceKind::Mock));
        assert!(!update.degraded);
    }

    #[tokio::test]
    async fn occupancy_refresh_merges_into_list() {
        let state = demo_state();
        state.refresh().await;

        let update = state.refresh_occupancy().await;
        assert_eq!(update.served_by, Some(SourceKind::Mock));
        assert_eq!(update.list.len(), 5);
        let tallawong = update
            .list
            .facilities
            .iter()
            .find(|f| f.name.contains("Tallawong"))
            .unwrap();
        assert_eq!(tallawong.spots_free(), 150);
    }

    #[tokio::test]
    async fn forced_refresh_clears_cache() {
        let calls = Arc::new(AtomicUsize::new(0));

        struct Counting(Arc<AtomicUsize>);
        impl FacilitySource for Counting {
            fn kind(&self) -> SourceKind {
                SourceKind::Scrape
            }
            fn fetch_facilities(&self) -> BoxFuture<'_, Result<SourceBatch, SourceError>> {
                self.0.fetch_add(1, Ordering::SeqCst);
                Box::pin(async {
                    Ok(SourceBatch::Records(vec![RawFacility::named(
                        "Park&Ride - Gordon",
                    )]))
                })
            }
        }

        let store: BatchStore = Arc::new(MemoryStore::<SourceBatch>::new(&CacheConfig::default()));
        let source = CachedSource::new(Counting(calls.clone()), store.clone());
        let state = AppState::new(
            Reconciler::new(vec![Arc::new(source)]),
            Position::new(-33.7738, 150.9351),
        )
        .with_store(store);

        state.refresh().await;
        state.refresh().await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        state.force_refresh().await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
