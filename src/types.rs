use serde::{Deserialize, Serialize};

/// Dry-weather slick compounds plus the intermediate used as the wet proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Compound {
    Soft,
    Medium,
    Hard,
    Intermediate,
}

impl Compound {
    /// The compounds a dry-race strategy may pick from.
    pub const SLICKS: [Compound; 3] = [Compound::Soft, Compound::Medium, Compound::Hard];

    pub fn as_str(&self) -> &'static str {
        match self {
            Compound::Soft => "SOFT",
            Compound::Medium => "MEDIUM",
            Compound::Hard => "HARD",
            Compound::Intermediate => "INTERMEDIATE",
        }
    }

    pub fn parse(s: &str) -> Option<Compound> {
        match s.to_uppercase().as_str() {
            "SOFT" => Some(Compound::Soft),
            "MEDIUM" => Some(Compound::Medium),
            "HARD" => Some(Compound::Hard),
            "INTERMEDIATE" | "INTER" => Some(Compound::Intermediate),
            _ => None,
        }
    }
}

/// One recorded lap from the historical store. Immutable after load.
#[derive(Debug, Clone, PartialEq)]
pub struct LapRecord {
    pub race_id: String,
    pub driver_id: String,
    pub compound: Compound,
    /// Position within the stint, 1-based.
    pub lap_in_stint: u32,
    pub lap_time_s: f64,
}

/// Fitted linear degradation model for one compound:
/// `lap_time = slope * lap_in_stint + base_time`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CompoundModel {
    pub compound: Compound,
    /// Seconds lost per additional lap of tire age.
    pub slope: f64,
    /// Predicted lap time at lap_in_stint = 0.
    pub base_time: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    Dry,
    Wet,
}

/// Per-request weather for one circuit. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherSnapshot {
    pub circuit: String,
    pub track_temp_c: f64,
    pub condition: Condition,
    /// Normalized 0..=1 from recent rainfall.
    pub rain_probability: f64,
    pub fetched_at_ms: i64,
}

/// Rain probability above this counts as a wet race.
pub const WET_THRESHOLD: f64 = 0.3;

impl WeatherSnapshot {
    pub fn new(circuit: &str, track_temp_c: f64, rain_probability: f64, fetched_at_ms: i64) -> Self {
        let condition = if rain_probability > WET_THRESHOLD {
            Condition::Wet
        } else {
            Condition::Dry
        };
        WeatherSnapshot {
            circuit: circuit.to_string(),
            track_temp_c,
            condition,
            rain_probability,
            fetched_at_ms,
        }
    }

    pub fn is_wet(&self) -> bool {
        self.condition == Condition::Wet
    }
}

/// One stint of a candidate strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Stint {
    pub compound: Compound,
    pub laps: u32,
}

/// A full-race stop sequence with its score. Probability is filled in
/// by the ranker; until then it is 0.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyCandidate {
    pub stints: Vec<Stint>,
    /// Cumulative lap numbers at which the car pits (one per stop).
    pub pit_laps: Vec<u32>,
    pub stops: usize,
    pub predicted_total_time: f64,
    pub win_probability: f64,
}

impl StrategyCandidate {
    pub fn new(stints: Vec<Stint>, predicted_total_time: f64) -> Self {
        let mut pit_laps = Vec::with_capacity(stints.len().saturating_sub(1));
        if let Some((_, before_last)) = stints.split_last() {
            let mut cum = 0u32;
            for stint in before_last {
                cum += stint.laps;
                pit_laps.push(cum);
            }
        }
        let stops = stints.len().saturating_sub(1);
        StrategyCandidate {
            stints,
            pit_laps,
            stops,
            predicted_total_time,
            win_probability: 0.0,
        }
    }
}

/// Race-length parameters and enumeration bounds for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct RaceParameters {
    pub total_laps: u32,
    pub min_stops: usize,
    pub max_stops: usize,
    /// Stop laps are only considered on multiples of this granularity.
    pub stop_lap_grid: u32,
    /// No stint may be shorter than this.
    pub min_stint_laps: u32,
    /// Stationary + pit-lane delta per stop, seconds.
    pub pit_loss_s: f64,
}

impl RaceParameters {
    pub fn for_race(total_laps: u32) -> Self {
        RaceParameters {
            total_laps,
            min_stops: 1,
            max_stops: 3,
            stop_lap_grid: 5,
            min_stint_laps: 5,
            pit_loss_s: 22.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compound_round_trips_through_strings() {
        for c in [
            Compound::Soft,
            Compound::Medium,
            Compound::Hard,
            Compound::Intermediate,
        ] {
            assert_eq!(Compound::parse(c.as_str()), Some(c));
        }
        assert_eq!(Compound::parse("soft"), Some(Compound::Soft));
        assert_eq!(Compound::parse("WET"), None);
    }

    #[test]
    fn wet_flag_follows_rain_threshold() {
        let dry = WeatherSnapshot::new("Monza", 28.0, 0.1, 0);
        assert!(!dry.is_wet());
        let wet = WeatherSnapshot::new("Spa", 16.0, 0.6, 0);
        assert!(wet.is_wet());
    }

    #[test]
    fn pit_laps_are_cumulative_stint_ends() {
        let cand = StrategyCandidate::new(
            vec![
                Stint { compound: Compound::Soft, laps: 15 },
                Stint { compound: Compound::Medium, laps: 20 },
                Stint { compound: Compound::Hard, laps: 22 },
            ],
            5400.0,
        );
        assert_eq!(cand.stops, 2);
        assert_eq!(cand.pit_laps, vec![15, 35]);
    }

    #[test]
    fn degenerate_candidates_do_not_panic() {
        let empty = StrategyCandidate::new(vec![], 0.0);
        assert_eq!(empty.stops, 0);
        assert!(empty.pit_laps.is_empty());

        let no_stop = StrategyCandidate::new(
            vec![Stint { compound: Compound::Hard, laps: 57 }],
            5400.0,
        );
        assert_eq!(no_stop.stops, 0);
        assert!(no_stop.pit_laps.is_empty());
    }
}
