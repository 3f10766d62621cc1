//! NSW Park&Ride occupancy server.
//!
//! Pulls car park listings and occupancy from a chain of upstream sources,
//! reconciles them into one facility list with map positions, and serves
//! that list over HTTP.

pub mod cache;
pub mod config;
pub mod coordinates;
pub mod domain;
pub mod geo;
pub mod listing;
pub mod pipeline;
pub mod sources;
pub mod web;
