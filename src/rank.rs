use crate::types::StrategyCandidate;

/// Softmax temperature in seconds: a candidate this much slower than the
/// best loses roughly a factor e of win probability.
const SOFTMAX_BETA_S: f64 = 5.0;

/// Assign each candidate a win probability via a softmax over negative
/// predicted total time, then sort descending by probability with ties
/// broken by fewer stops. Probabilities sum to 1.0 for any non-empty list.
pub fn assign_probabilities(candidates: &mut Vec<StrategyCandidate>) {
    if candidates.is_empty() {
        return;
    }

    let best = candidates
        .iter()
        .map(|c| c.predicted_total_time)
        .fold(f64::INFINITY, f64::min);

    // Shift by the best time before exponentiating so the weights stay in
    // a safe floating-point range.
    let weights: Vec<f64> = candidates
        .iter()
        .map(|c| ((best - c.predicted_total_time) / SOFTMAX_BETA_S).exp())
        .collect();
    let total: f64 = weights.iter().sum();

    for (candidate, weight) in candidates.iter_mut().zip(&weights) {
        candidate.win_probability = weight / total;
    }

    candidates.sort_by(|a, b| {
        b.win_probability
            .total_cmp(&a.win_probability)
            .then(a.stops.cmp(&b.stops))
    });
}
