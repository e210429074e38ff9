use crate::types::{Compound, LapRecord};
use serde::Deserialize;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;

/// Raw CSV row as exported from the timing archive.
#[derive(Debug, Deserialize)]
struct RawLap {
    #[serde(rename = "RaceId")]
    race_id: String,
    #[serde(rename = "Driver")]
    driver: String,
    #[serde(rename = "Compound")]
    compound: String,
    #[serde(rename = "LapInStint")]
    lap_in_stint: f64,
    #[serde(rename = "LapTimeSeconds")]
    lap_time_seconds: f64,
}

/// Historical lap dataset, read-only after load. The version token is a
/// hash of the loaded rows, so reloading changed data always carries a new
/// token and downstream caches know to refit.
#[derive(Debug, Clone)]
pub struct LapDataset {
    pub laps: Vec<LapRecord>,
    pub version: u64,
}

fn dataset_version(laps: &[LapRecord]) -> u64 {
    let mut hasher = DefaultHasher::new();
    for lap in laps {
        lap.race_id.hash(&mut hasher);
        lap.driver_id.hash(&mut hasher);
        lap.compound.as_str().hash(&mut hasher);
        lap.lap_in_stint.hash(&mut hasher);
        lap.lap_time_s.to_bits().hash(&mut hasher);
    }
    hasher.finish()
}

impl LapDataset {
    /// Load laps from a CSV file, dropping rows that are unusable for
    /// fitting: missing compound, out-of-range lap times (in/out laps and
    /// red-flag laps show up as extreme values), or a stint position < 1.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(path.as_ref())?;

        let mut laps = Vec::new();
        let mut skipped = 0usize;
        for row in reader.deserialize() {
            let raw: RawLap = row?;
            match Self::clean(raw) {
                Some(lap) => laps.push(lap),
                None => skipped += 1,
            }
        }
        tracing::info!(
            "loaded {} laps from {} ({} rows skipped)",
            laps.len(),
            path.as_ref().display(),
            skipped
        );
        let version = dataset_version(&laps);
        Ok(LapDataset { laps, version })
    }

    pub fn from_records(laps: Vec<LapRecord>, version: u64) -> Self {
        LapDataset { laps, version }
    }

    fn clean(raw: RawLap) -> Option<LapRecord> {
        let compound = Compound::parse(&raw.compound)?;
        if raw.driver.is_empty()
            || raw.lap_in_stint < 1.0
            || raw.lap_time_seconds <= 0.0
            || raw.lap_time_seconds >= 300.0
        {
            return None;
        }
        Some(LapRecord {
            race_id: raw.race_id,
            driver_id: raw.driver,
            compound,
            lap_in_stint: raw.lap_in_stint.round() as u32,
            lap_time_s: raw.lap_time_seconds,
        })
    }

    /// All laps recorded on the given compound.
    pub fn for_compound(&self, compound: Compound) -> Vec<&LapRecord> {
        self.laps.iter().filter(|l| l.compound == compound).collect()
    }
}

/// Static circuit catalog: race length plus coordinates for the weather
/// lookup. Lap counts are the nominal race distances.
pub struct Circuit {
    pub name: &'static str,
    pub total_laps: u32,
    pub lat: f64,
    pub lon: f64,
}

pub const CIRCUITS: &[Circuit] = &[
    Circuit { name: "Bahrain", total_laps: 57, lat: 26.0325, lon: 50.5106 },
    Circuit { name: "Saudi Arabia", total_laps: 50, lat: 26.8528, lon: 43.9719 },
    Circuit { name: "Australia", total_laps: 58, lat: -37.8497, lon: 144.8430 },
    Circuit { name: "Japan", total_laps: 53, lat: 34.8431, lon: 139.3275 },
    Circuit { name: "China", total_laps: 56, lat: 31.2862, lon: 121.1825 },
    Circuit { name: "Miami", total_laps: 57, lat: 25.9581, lon: -80.2389 },
    Circuit { name: "Imola", total_laps: 63, lat: 44.3439, lon: 11.7131 },
    Circuit { name: "Monaco", total_laps: 78, lat: 43.7419, lon: 7.4251 },
    Circuit { name: "Canada", total_laps: 70, lat: 45.5007, lon: -73.5224 },
    Circuit { name: "Spain", total_laps: 66, lat: 41.5700, lon: 2.2611 },
    Circuit { name: "Austria", total_laps: 71, lat: 47.2194, lon: 14.7964 },
    Circuit { name: "Silverstone", total_laps: 52, lat: 52.0754, lon: -0.8480 },
    Circuit { name: "Hungary", total_laps: 70, lat: 47.5786, lon: 19.2523 },
    Circuit { name: "Belgium", total_laps: 44, lat: 50.4381, lon: 5.9717 },
    Circuit { name: "Netherlands", total_laps: 72, lat: 52.3914, lon: 4.5411 },
    Circuit { name: "Monza", total_laps: 53, lat: 45.6156, lon: 9.2852 },
    Circuit { name: "Azerbaijan", total_laps: 51, lat: 40.3725, lon: 49.8533 },
    Circuit { name: "Singapore", total_laps: 62, lat: 1.2914, lon: 103.8642 },
    Circuit { name: "USA", total_laps: 56, lat: 30.1328, lon: -97.6413 },
    Circuit { name: "Mexico", total_laps: 71, lat: 19.4042, lon: -99.0907 },
    Circuit { name: "Brazil", total_laps: 71, lat: -23.7006, lon: -46.6944 },
    Circuit { name: "Las Vegas", total_laps: 50, lat: 36.1169, lon: -115.1833 },
    Circuit { name: "Qatar", total_laps: 57, lat: 25.1497, lon: 51.5111 },
    Circuit { name: "Abu Dhabi", total_laps: 58, lat: 24.4672, lon: 54.6031 },
];

pub fn find_circuit(name: &str) -> Option<&'static Circuit> {
    CIRCUITS.iter().find(|c| c.name.eq_ignore_ascii_case(name))
}
