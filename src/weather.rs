use crate::config::AppConfig;
use crate::data::Circuit;
use crate::error::StrategyError;
use crate::types::WeatherSnapshot;
use serde::Deserialize;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const OPENWEATHER_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

/// Rainfall (mm over the last hour) that maps to rain probability 1.0.
const RAIN_SATURATION_MM: f64 = 5.0;

/// Track surface runs hotter than the air; rough offset in °C.
const TRACK_TEMP_OFFSET_C: f64 = 10.0;

#[derive(Debug, Deserialize)]
struct OwmMain {
    temp: f64,
}

#[derive(Debug, Deserialize, Default)]
struct OwmRain {
    #[serde(rename = "1h", default)]
    one_hour_mm: f64,
}

#[derive(Debug, Deserialize)]
struct OwmResponse {
    main: OwmMain,
    #[serde(default)]
    rain: Option<OwmRain>,
}

/// Client for the OpenWeatherMap current-weather endpoint. A failed fetch
/// never aborts the pipeline; callers fall back to the configured default
/// snapshot via `fetch_or_default`.
pub struct WeatherClient {
    http: reqwest::Client,
    api_key: String,
    default_track_temp_c: f64,
    default_rain_probability: f64,
}

impl WeatherClient {
    pub fn new(cfg: &AppConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(cfg.weather_timeout)
            .build()
            .unwrap_or_default();
        WeatherClient {
            http,
            api_key: cfg.openweather_api_key.clone(),
            default_track_temp_c: cfg.default_track_temp_c,
            default_rain_probability: cfg.default_rain_probability,
        }
    }

    /// Fetch current conditions for a circuit, retrying once on a transient
    /// network failure.
    pub async fn fetch(&self, circuit: &Circuit) -> Result<WeatherSnapshot, StrategyError> {
        if self.api_key.is_empty() {
            return Err(self.unavailable(circuit, "no OPENWEATHER_API_KEY configured"));
        }

        let mut last_err = String::new();
        for attempt in 0..2 {
            if attempt > 0 {
                tokio::time::sleep(Duration::from_millis(250)).await;
            }
            match self.fetch_once(circuit).await {
                Ok(snapshot) => return Ok(snapshot),
                Err(reason) => {
                    tracing::warn!("weather fetch attempt {} for {} failed: {}", attempt + 1, circuit.name, reason);
                    last_err = reason;
                }
            }
        }
        Err(self.unavailable(circuit, &last_err))
    }

    /// Fetch, or substitute the configured default. The bool is the
    /// degraded-mode flag surfaced to the user.
    pub async fn fetch_or_default(&self, circuit: &Circuit) -> (WeatherSnapshot, bool) {
        match self.fetch(circuit).await {
            Ok(snapshot) => (snapshot, false),
            Err(e) => {
                tracing::warn!("{}; continuing in degraded mode", e);
                (self.default_snapshot(circuit.name), true)
            }
        }
    }

    pub fn default_snapshot(&self, circuit: &str) -> WeatherSnapshot {
        WeatherSnapshot::new(
            circuit,
            self.default_track_temp_c,
            self.default_rain_probability,
            now_ms(),
        )
    }

    async fn fetch_once(&self, circuit: &Circuit) -> Result<WeatherSnapshot, String> {
        let resp = self
            .http
            .get(OPENWEATHER_URL)
            .query(&[
                ("lat", circuit.lat.to_string()),
                ("lon", circuit.lon.to_string()),
                ("appid", self.api_key.clone()),
                ("units", "metric".to_string()),
            ])
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = resp.status();
        if !status.is_success() {
            return Err(format!("provider returned {}", status));
        }
        let body: OwmResponse = resp.json().await.map_err(|e| e.to_string())?;
        Ok(snapshot_from_response(circuit.name, &body, now_ms()))
    }

    fn unavailable(&self, circuit: &Circuit, reason: &str) -> StrategyError {
        StrategyError::WeatherUnavailable {
            circuit: circuit.name.to_string(),
            reason: reason.to_string(),
        }
    }
}

fn snapshot_from_response(circuit: &str, body: &OwmResponse, fetched_at_ms: i64) -> WeatherSnapshot {
    let track_temp = body.main.temp + TRACK_TEMP_OFFSET_C;
    let rain_mm = body.rain.as_ref().map(|r| r.one_hour_mm).unwrap_or(0.0);
    let rain_probability = (rain_mm / RAIN_SATURATION_MM).min(1.0);
    WeatherSnapshot::new(circuit, track_temp, rain_probability, fetched_at_ms)
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
