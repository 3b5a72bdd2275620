#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Runtime adapter that wires the turf world to its periodic systems.
//!
//! A [`Session`] owns the authoritative world behind one lock, drives the
//! income, combat and proximity systems from background tickers, and exposes
//! the player actions together with read-only views for display.

mod collaborators;
mod config;
mod session;
mod tickers;

pub use collaborators::{
    AchievementSink, Clock, Collaborators, LocationProvider, ManualClock, NullAchievements,
    PlayerLocations, SystemClock,
};
pub use config::{load_config, parse_config};
pub use session::{PlayerStats, Session};
pub use tickers::TickSummary;
