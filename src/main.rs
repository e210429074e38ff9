use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use pit_strategy_backend::config::AppConfig;
use pit_strategy_backend::data::{find_circuit, LapDataset, CIRCUITS};
use pit_strategy_backend::error::StrategyError;
use pit_strategy_backend::model::ModelStore;
use pit_strategy_backend::narrative::NarrativeClient;
use pit_strategy_backend::types::{RaceParameters, StrategyCandidate, WeatherSnapshot};
use pit_strategy_backend::weather::WeatherClient;
use pit_strategy_backend::{rank, strategy};

/// How many ranked strategies the response carries; probabilities are
/// still normalized over the full candidate set.
const RESPONSE_TOP_N: usize = 10;

#[derive(Clone)]
struct AppState {
    dataset: Arc<LapDataset>,
    store: Arc<ModelStore>,
    weather: Arc<WeatherClient>,
    narrative: Arc<NarrativeClient>,
}

#[derive(Debug, Deserialize)]
struct StrategyRequest {
    circuit: String,
}

#[derive(Serialize)]
struct CircuitOut {
    name: &'static str,
    total_laps: u32,
}

#[derive(Serialize)]
struct ExcludedCompound {
    compound: &'static str,
    reason: String,
}

#[derive(Serialize)]
struct StrategyResponse {
    circuit: String,
    total_laps: u32,
    weather: WeatherSnapshot,
    weather_degraded: bool,
    excluded_compounds: Vec<ExcludedCompound>,
    strategies: Vec<StrategyCandidate>,
    narrative: Option<String>,
}

type ApiError = (StatusCode, Json<serde_json::Value>);

fn api_error(status: StatusCode, err: &StrategyError) -> ApiError {
    (status, Json(json!({ "error": err.to_string() })))
}

async fn list_circuits() -> Json<Vec<CircuitOut>> {
    Json(
        CIRCUITS
            .iter()
            .map(|c| CircuitOut { name: c.name, total_laps: c.total_laps })
            .collect(),
    )
}

async fn predict_strategy(
    State(state): State<AppState>,
    Json(payload): Json<StrategyRequest>,
) -> Result<Json<StrategyResponse>, ApiError> {
    let circuit = find_circuit(&payload.circuit).ok_or_else(|| {
        api_error(
            StatusCode::NOT_FOUND,
            &StrategyError::UnknownCircuit(payload.circuit.clone()),
        )
    })?;

    let (weather, weather_degraded) = state.weather.fetch_or_default(circuit).await;
    let models = state.store.models(&state.dataset);
    let params = RaceParameters::for_race(circuit.total_laps);

    let mut candidates = strategy::generate(&models, &weather, &params)
        .map_err(|e| api_error(StatusCode::UNPROCESSABLE_ENTITY, &e))?;
    rank::assign_probabilities(&mut candidates);

    tracing::info!(
        "{}: {} candidates, best {:.1}s over {} stops (weather degraded: {})",
        circuit.name,
        candidates.len(),
        candidates[0].predicted_total_time,
        candidates[0].stops,
        weather_degraded
    );

    // Advisory only: a narrative failure still ships the numbers.
    let narrative = match state.narrative.explain(&candidates[0], &weather, &models).await {
        Ok(text) => Some(text),
        Err(e) => {
            tracing::warn!("{}", e);
            None
        }
    };

    candidates.truncate(RESPONSE_TOP_N);
    Ok(Json(StrategyResponse {
        circuit: circuit.name.to_string(),
        total_laps: circuit.total_laps,
        weather,
        weather_degraded,
        excluded_compounds: models
            .excluded
            .iter()
            .map(|(c, reason)| ExcludedCompound { compound: c.as_str(), reason: reason.clone() })
            .collect(),
        strategies: candidates,
        narrative,
    }))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cfg = AppConfig::from_env();
    let dataset = LapDataset::load(&cfg.laps_csv)?;

    let store = ModelStore::new();
    // Fit once up front so a bad dataset surfaces at startup, not on the
    // first request.
    let initial = store.models(&dataset);
    if initial.is_empty() {
        tracing::warn!("no compound could be fitted; every request will fail until the dataset is fixed");
    }

    let state = AppState {
        dataset: Arc::new(dataset),
        store: Arc::new(store),
        weather: Arc::new(WeatherClient::new(&cfg)),
        narrative: Arc::new(NarrativeClient::new(&cfg)),
    };

    let app = axum::Router::new()
        .route("/circuits", get(list_circuits))
        .route("/strategy", post(predict_strategy))
        .with_state(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], cfg.port));
    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
