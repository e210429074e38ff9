use std::time::Duration;

/// Runtime configuration, read once from the environment at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    /// Path to the historical laps CSV.
    pub laps_csv: String,
    /// OpenWeatherMap key; empty means the weather client always degrades.
    pub openweather_api_key: String,
    /// Anthropic key; empty disables the narrative.
    pub anthropic_api_key: String,
    pub weather_timeout: Duration,
    pub narrative_timeout: Duration,
    /// Default track temperature used in degraded mode, °C.
    pub default_track_temp_c: f64,
    /// Default rain probability used in degraded mode.
    pub default_rain_probability: f64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        AppConfig {
            port: env_parse("PORT", 8080),
            laps_csv: std::env::var("LAPS_CSV").unwrap_or_else(|_| "data/laps.csv".to_string()),
            openweather_api_key: std::env::var("OPENWEATHER_API_KEY").unwrap_or_default(),
            anthropic_api_key: std::env::var("ANTHROPIC_API_KEY").unwrap_or_default(),
            weather_timeout: Duration::from_secs(env_parse("WEATHER_TIMEOUT_SECS", 10)),
            narrative_timeout: Duration::from_secs(env_parse("NARRATIVE_TIMEOUT_SECS", 30)),
            default_track_temp_c: 30.0,
            default_rain_probability: 0.1,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
