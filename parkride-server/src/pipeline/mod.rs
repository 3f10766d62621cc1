//! Multi-source reconciliation.
//!
//! Sources are tried in priority order and the first non-empty answer is
//! normalized into facilities. Listings without occupancy are merged with
//! separately fetched readings, and missing coordinates are filled in from
//! the static table. Nothing here fails: an exhausted chain yields an empty
//! list and the caller decides whether to keep what it had.

mod merge;
mod normalize;
mod reconciler;

pub use merge::{WORD_OVERLAP_THRESHOLD, merge_occupancy, names_match};
pub use normalize::{Normalized, normalize_records, occupancy_entries};
pub use reconciler::{FacilityList, OccupancyRefresh, Reconciler};
