use crate::data::LapDataset;
use crate::error::StrategyError;
use crate::types::{Compound, CompoundModel, LapRecord};
use parking_lot::RwLock;
use std::collections::HashMap;

/// Fits need at least this many usable laps per compound.
pub const MIN_LAPS_PER_FIT: usize = 3;

/// Ordinary least-squares fit of `lap_time = slope * lap_in_stint + base_time`
/// over one compound's laps, via the closed-form normal equations.
///
/// Fails with `InsufficientData` when there are too few laps or fewer than
/// two distinct stint positions (the slope is undefined on a vertical line),
/// and with `InvalidSlope` when the fit says tires get faster with age.
pub fn fit_compound(compound: Compound, laps: &[&LapRecord]) -> Result<CompoundModel, StrategyError> {
    let n = laps.len();
    let mut distinct: Vec<u32> = laps.iter().map(|l| l.lap_in_stint).collect();
    distinct.sort_unstable();
    distinct.dedup();

    if n < MIN_LAPS_PER_FIT || distinct.len() < 2 {
        return Err(StrategyError::InsufficientData {
            compound,
            laps: n,
            distinct: distinct.len(),
        });
    }

    let nf = n as f64;
    let sum_x: f64 = laps.iter().map(|l| l.lap_in_stint as f64).sum();
    let sum_y: f64 = laps.iter().map(|l| l.lap_time_s).sum();
    let mean_x = sum_x / nf;
    let mean_y = sum_y / nf;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    for lap in laps {
        let dx = lap.lap_in_stint as f64 - mean_x;
        sxx += dx * dx;
        sxy += dx * (lap.lap_time_s - mean_y);
    }

    let slope = sxy / sxx;
    let base_time = mean_y - slope * mean_x;

    if slope < 0.0 {
        return Err(StrategyError::InvalidSlope { compound, slope });
    }

    Ok(CompoundModel { compound, slope, base_time })
}

/// The fitted models for one dataset version, plus the compounds that could
/// not be fitted and why. Exclusions are reported to the caller, never fatal
/// on their own.
#[derive(Debug, Clone)]
pub struct ModelSet {
    pub models: HashMap<Compound, CompoundModel>,
    pub excluded: Vec<(Compound, String)>,
    pub dataset_version: u64,
}

impl ModelSet {
    pub fn fit(dataset: &LapDataset) -> ModelSet {
        let mut models = HashMap::new();
        let mut excluded = Vec::new();
        for compound in Compound::SLICKS {
            let laps = dataset.for_compound(compound);
            match fit_compound(compound, &laps) {
                Ok(model) => {
                    tracing::info!(
                        "fitted {}: base={:.2}s slope={:.3}s/lap over {} laps",
                        compound.as_str(),
                        model.base_time,
                        model.slope,
                        laps.len()
                    );
                    models.insert(compound, model);
                }
                Err(e) => {
                    tracing::warn!("excluding {}: {}", compound.as_str(), e);
                    excluded.push((compound, e.to_string()));
                }
            }
        }
        ModelSet {
            models,
            excluded,
            dataset_version: dataset.version,
        }
    }

    pub fn get(&self, compound: Compound) -> Option<&CompoundModel> {
        self.models.get(&compound)
    }

    /// Fitted compounds in a fixed soft-to-hard order, so enumeration output
    /// is deterministic regardless of hash ordering.
    pub fn fitted_compounds(&self) -> Vec<Compound> {
        Compound::SLICKS
            .into_iter()
            .filter(|c| self.models.contains_key(c))
            .collect()
    }

    /// The fitted models themselves, in the same soft-to-hard order.
    pub fn fitted_models(&self) -> Vec<&CompoundModel> {
        Compound::SLICKS
            .iter()
            .filter_map(|c| self.models.get(c))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

/// Caches the fitted `ModelSet` keyed by the dataset's version token.
/// Refit happens only when the version changes; repeated requests against
/// the same data reuse the cached coefficients.
pub struct ModelStore {
    cached: RwLock<Option<ModelSet>>,
}

impl ModelStore {
    pub fn new() -> Self {
        ModelStore { cached: RwLock::new(None) }
    }

    pub fn models(&self, dataset: &LapDataset) -> ModelSet {
        if let Some(set) = self.cached.read().as_ref() {
            if set.dataset_version == dataset.version {
                return set.clone();
            }
        }
        let set = ModelSet::fit(dataset);
        *self.cached.write() = Some(set.clone());
        set
    }
}

impl Default for ModelStore {
    fn default() -> Self {
        Self::new()
    }
}
