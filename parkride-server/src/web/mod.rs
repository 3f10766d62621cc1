//! Web layer for the Park&Ride occupancy service.
//!
//! Provides JSON endpoints over the latest reconciled facility list and
//! optionally serves the browser UI's static files.

mod directions;
mod dto;
mod routes;
mod state;

pub use directions::{directions_url, facility_directions_url};
pub use dto::*;
pub use routes::{AppError, create_router};
pub use state::{AppState, OccupancyUpdate};
