//! Pit-strategy prediction backend: fits per-compound tire degradation
//! models from historical laps, scores candidate stop sequences under the
//! current weather, and ranks them by win probability.

pub mod config;
pub mod data;
pub mod error;
pub mod model;
pub mod narrative;
pub mod rank;
pub mod strategy;
pub mod types;
pub mod weather;
