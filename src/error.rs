use crate::types::Compound;
use thiserror::Error;

/// Pipeline errors. Only `NoViableStrategy` and `UnknownCircuit` abort a
/// request; the rest are recovered locally with a degraded-mode marker.
#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("insufficient data to fit {compound:?}: {laps} usable laps, {distinct} distinct stint positions")]
    InsufficientData {
        compound: Compound,
        laps: usize,
        distinct: usize,
    },

    #[error("fitted slope for {compound:?} is negative ({slope:.4} s/lap); rejecting model")]
    InvalidSlope { compound: Compound, slope: f64 },

    #[error("weather unavailable for {circuit}: {reason}")]
    WeatherUnavailable { circuit: String, reason: String },

    #[error("no compound has a valid degradation model; cannot generate strategies")]
    NoViableStrategy,

    #[error("narrative unavailable: {0}")]
    NarrativeUnavailable(String),

    #[error("unknown circuit: {0}")]
    UnknownCircuit(String),
}
