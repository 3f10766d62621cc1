//! Views over a reconciled facility list: sorting, search and nearest-N.

mod nearest;
mod search;
mod sort;

pub use nearest::{DEFAULT_NEAREST, nearest};
pub use search::search_facilities;
pub use sort::{SortKey, SortOrder, UnknownSortKey, sort_facilities};
