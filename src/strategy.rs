use crate::error::StrategyError;
use crate::model::ModelSet;
use crate::types::{CompoundModel, RaceParameters, Stint, StrategyCandidate, WeatherSnapshot};

/// Hard cap on enumerated candidates. Iteration goes stop-count ascending,
/// so the low-stop sequences are always present when the cap truncates.
pub const ENUMERATION_CAP: usize = 200;

/// Track temperature at which no heat penalty applies, °C.
const HOT_BASELINE_C: f64 = 30.0;

/// Wet running: degradation accelerates, base pace drops, and the whole
/// race carries extra risk time (intermediate-tire proxy constants).
const WET_SLOPE_FACTOR: f64 = 1.5;
const WET_BASE_PENALTY_S: f64 = 3.0;
const WET_TOTAL_FACTOR: f64 = 1.1;

/// Multiplicative degradation penalty for running above the heat baseline.
fn temp_factor(weather: &WeatherSnapshot) -> f64 {
    1.0 + ((weather.track_temp_c - HOT_BASELINE_C) / 100.0).max(0.0)
}

/// Predicted time for one stint of `laps` laps on a fresh set:
/// sum over i = 1..laps of (slope_adj * i + base_adj), in closed form.
fn stint_time(model: &CompoundModel, laps: u32, weather: &WeatherSnapshot) -> f64 {
    let mut slope = model.slope * temp_factor(weather);
    let mut base = model.base_time;
    if weather.is_wet() {
        slope *= WET_SLOPE_FACTOR;
        base += WET_BASE_PENALTY_S;
    }
    let n = laps as f64;
    base * n + slope * n * (n + 1.0) / 2.0
}

/// Enumerate and score candidate stop sequences.
///
/// Stop laps live on a fixed grid (`params.stop_lap_grid`) with a minimum
/// stint length, compounds range over the fitted models with repetition,
/// and the whole enumeration is capped at `ENUMERATION_CAP`. Fails with
/// `NoViableStrategy` only when no compound has a valid model.
pub fn generate(
    models: &ModelSet,
    weather: &WeatherSnapshot,
    params: &RaceParameters,
) -> Result<Vec<StrategyCandidate>, StrategyError> {
    let fitted = models.fitted_models();
    if fitted.is_empty() {
        return Err(StrategyError::NoViableStrategy);
    }

    let mut candidates = Vec::new();
    'outer: for stops in params.min_stops..=params.max_stops {
        for stop_laps in stop_lap_combinations(params, stops) {
            let lengths = stint_lengths(&stop_laps, params.total_laps);
            for sequence in model_sequences(&fitted, stops + 1) {
                let mut total = params.pit_loss_s * stops as f64;
                let mut stints = Vec::with_capacity(sequence.len());
                for (&model, &laps) in sequence.iter().zip(&lengths) {
                    total += stint_time(model, laps, weather);
                    stints.push(Stint { compound: model.compound, laps });
                }
                if weather.is_wet() {
                    total *= WET_TOTAL_FACTOR;
                }
                candidates.push(StrategyCandidate::new(stints, total));
                if candidates.len() >= ENUMERATION_CAP {
                    break 'outer;
                }
            }
        }
    }

    if candidates.is_empty() {
        // Race too short for the configured stint grid.
        return Err(StrategyError::NoViableStrategy);
    }
    order_candidates(&mut candidates);
    Ok(candidates)
}

/// Fastest first; equal predicted times order fewer stops first.
pub(crate) fn order_candidates(candidates: &mut [StrategyCandidate]) {
    candidates.sort_by(|a, b| {
        a.predicted_total_time
            .total_cmp(&b.predicted_total_time)
            .then(a.stops.cmp(&b.stops))
    });
}

/// Ascending stop-lap tuples on the grid, keeping every stint at least
/// `min_stint_laps` long (including the final stint to the flag).
fn stop_lap_combinations(params: &RaceParameters, stops: usize) -> Vec<Vec<u32>> {
    let mut out = Vec::new();
    let mut current = Vec::with_capacity(stops);
    extend_combination(params, stops, params.min_stint_laps, &mut current, &mut out);
    out
}

fn extend_combination(
    params: &RaceParameters,
    stops: usize,
    earliest: u32,
    current: &mut Vec<u32>,
    out: &mut Vec<Vec<u32>>,
) {
    if current.len() == stops {
        out.push(current.clone());
        return;
    }
    // Leave room for the remaining stops plus the final stint.
    let remaining = (stops - current.len()) as u32;
    let latest = params
        .total_laps
        .saturating_sub(remaining * params.min_stint_laps);
    let mut lap = earliest.next_multiple_of(params.stop_lap_grid);
    while lap <= latest {
        current.push(lap);
        extend_combination(params, stops, lap + params.min_stint_laps, current, out);
        current.pop();
        lap += params.stop_lap_grid;
    }
}

fn stint_lengths(stop_laps: &[u32], total_laps: u32) -> Vec<u32> {
    let mut lengths = Vec::with_capacity(stop_laps.len() + 1);
    let mut prev = 0;
    for &stop in stop_laps {
        lengths.push(stop - prev);
        prev = stop;
    }
    lengths.push(total_laps - prev);
    lengths
}

/// Cartesian product with repetition: every way to assign a fitted model
/// to each stint.
fn model_sequences<'a>(
    fitted: &[&'a CompoundModel],
    stints: usize,
) -> Vec<Vec<&'a CompoundModel>> {
    let mut out = vec![Vec::new()];
    for _ in 0..stints {
        let mut next = Vec::with_capacity(out.len() * fitted.len());
        for prefix in &out {
            for &model in fitted {
                let mut seq = prefix.clone();
                seq.push(model);
                next.push(seq);
            }
        }
        out = next;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::LapDataset;
    use crate::model::ModelSet;
    use crate::types::{Compound, LapRecord, RaceParameters, WeatherSnapshot};

    fn linear_laps(compound: Compound, base: f64, slope: f64, n: u32) -> Vec<LapRecord> {
        (1..=n)
            .map(|i| LapRecord {
                race_id: "r".into(),
                driver_id: "VER".into(),
                compound,
                lap_in_stint: i,
                lap_time_s: base + slope * i as f64,
            })
            .collect()
    }

    fn three_compound_models() -> ModelSet {
        let mut laps = linear_laps(Compound::Soft, 88.0, 0.08, 20);
        laps.extend(linear_laps(Compound::Medium, 89.0, 0.05, 25));
        laps.extend(linear_laps(Compound::Hard, 90.5, 0.02, 30));
        ModelSet::fit(&LapDataset::from_records(laps, 1))
    }

    fn dry_weather() -> WeatherSnapshot {
        WeatherSnapshot::new("Bahrain", 28.0, 0.0, 0)
    }

    #[test]
    fn no_models_means_no_viable_strategy() {
        let empty = ModelSet::fit(&LapDataset::from_records(vec![], 1));
        let err = generate(&empty, &dry_weather(), &RaceParameters::for_race(57)).unwrap_err();
        assert!(matches!(err, StrategyError::NoViableStrategy));
    }

    #[test]
    fn respects_stop_bounds_cap_and_race_distance() {
        let models = three_compound_models();
        let params = RaceParameters::for_race(57);
        let candidates = generate(&models, &dry_weather(), &params).unwrap();

        assert!(!candidates.is_empty());
        assert!(candidates.len() <= ENUMERATION_CAP);
        for c in &candidates {
            assert!(c.stops >= params.min_stops && c.stops <= params.max_stops);
            let total: u32 = c.stints.iter().map(|s| s.laps).sum();
            assert_eq!(total, params.total_laps, "laps must cover the race");
            assert!(c.stints.iter().all(|s| s.laps >= params.min_stint_laps));
            for laps in &c.pit_laps {
                assert_eq!(laps % params.stop_lap_grid, 0, "stops sit on the grid");
            }
        }
    }

    #[test]
    fn output_is_sorted_fastest_first() {
        let candidates = generate(
            &three_compound_models(),
            &dry_weather(),
            &RaceParameters::for_race(57),
        )
        .unwrap();
        for pair in candidates.windows(2) {
            assert!(pair[0].predicted_total_time <= pair[1].predicted_total_time);
        }
    }

    #[test]
    fn equal_times_order_fewer_stops_first() {
        let mk = |stops: usize, time: f64| {
            let mut stints = vec![Stint { compound: Compound::Medium, laps: 20 }];
            for _ in 0..stops {
                stints.push(Stint { compound: Compound::Hard, laps: 10 });
            }
            StrategyCandidate::new(stints, time)
        };
        let mut cands = vec![mk(3, 5000.0), mk(1, 5000.0), mk(2, 4990.0)];
        order_candidates(&mut cands);
        assert_eq!(cands[0].stops, 2);
        assert_eq!(cands[1].stops, 1);
        assert_eq!(cands[2].stops, 3);
    }

    #[test]
    fn wet_weather_is_never_faster() {
        let models = three_compound_models();
        let params = RaceParameters::for_race(57);
        let dry = generate(&models, &dry_weather(), &params).unwrap();
        let wet = generate(
            &models,
            &WeatherSnapshot::new("Bahrain", 28.0, 0.9, 0),
            &params,
        )
        .unwrap();
        assert!(wet[0].predicted_total_time > dry[0].predicted_total_time);
    }

    #[test]
    fn heat_scales_degradation_only_above_baseline() {
        let models = three_compound_models();
        let params = RaceParameters::for_race(57);
        let cool = generate(&models, &WeatherSnapshot::new("B", 20.0, 0.0, 0), &params).unwrap();
        let baseline = generate(&models, &dry_weather(), &params).unwrap();
        let hot = generate(&models, &WeatherSnapshot::new("B", 45.0, 0.0, 0), &params).unwrap();
        assert_eq!(
            cool[0].predicted_total_time,
            baseline[0].predicted_total_time,
            "no bonus below the baseline"
        );
        assert!(hot[0].predicted_total_time > baseline[0].predicted_total_time);
    }

    #[test]
    fn generation_is_deterministic() {
        let models = three_compound_models();
        let params = RaceParameters::for_race(66);
        let weather = dry_weather();
        let a = generate(&models, &weather, &params).unwrap();
        let b = generate(&models, &weather, &params).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn stint_math_matches_the_per_lap_sum() {
        let model = CompoundModel {
            compound: Compound::Medium,
            slope: 0.5,
            base_time: 89.5,
        };
        let weather = dry_weather();
        let by_formula = stint_time(&model, 10, &weather);
        let by_loop: f64 = (1..=10).map(|i| 0.5 * i as f64 + 89.5).sum();
        assert!((by_formula - by_loop).abs() < 1e-9);
    }
}
