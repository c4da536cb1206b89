//! A travel agent web service.
//!
//! A travel query posted to `/api/chat` is answered by a tool-calling model
//! that looks up the weather, searches for prices, computes costs and finds
//! videos, then writes a day-by-day itinerary. Without a model the service
//! still answers, with canned demo itineraries.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

pub mod config;
pub mod demo;
mod planner;
pub mod server;
pub mod tools;

pub use planner::{Planner, travel_agent};

/// Re-exports of [`wayfarer_core`] crate.
pub mod core {
    pub use wayfarer_core::*;
}
