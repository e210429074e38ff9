use crate::config::AppConfig;
use crate::error::StrategyError;
use crate::model::ModelSet;
use crate::types::{StrategyCandidate, WeatherSnapshot};
use serde::{Deserialize, Serialize};

const ANTHROPIC_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const NARRATIVE_MODEL: &str = "claude-3-5-haiku-latest";
const MAX_TOKENS: u32 = 500;

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct NarrativeRequest {
    model: &'static str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<Message>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NarrativeResponse {
    content: Vec<ContentBlock>,
}

/// Turns the ranked strategy into a race-engineer style justification via
/// the Anthropic Messages API. Strictly advisory: every failure maps to
/// `NarrativeUnavailable` and the numeric results ship without it.
pub struct NarrativeClient {
    http: reqwest::Client,
    api_key: String,
}

impl NarrativeClient {
    pub fn new(cfg: &AppConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(cfg.narrative_timeout)
            .build()
            .unwrap_or_default();
        NarrativeClient {
            http,
            api_key: cfg.anthropic_api_key.clone(),
        }
    }

    pub async fn explain(
        &self,
        candidate: &StrategyCandidate,
        weather: &WeatherSnapshot,
        models: &ModelSet,
    ) -> Result<String, StrategyError> {
        if self.api_key.is_empty() {
            return Err(StrategyError::NarrativeUnavailable(
                "no ANTHROPIC_API_KEY configured".to_string(),
            ));
        }

        let request = NarrativeRequest {
            model: NARRATIVE_MODEL,
            max_tokens: MAX_TOKENS,
            temperature: 0.3,
            messages: vec![Message {
                role: "user",
                content: build_prompt(candidate, weather, models),
            }],
        };

        let resp = self
            .http
            .post(ANTHROPIC_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| StrategyError::NarrativeUnavailable(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(StrategyError::NarrativeUnavailable(format!(
                "provider returned {}",
                status
            )));
        }

        let body: NarrativeResponse = resp
            .json()
            .await
            .map_err(|e| StrategyError::NarrativeUnavailable(e.to_string()))?;

        body.content
            .into_iter()
            .find_map(|block| block.text)
            .ok_or_else(|| {
                StrategyError::NarrativeUnavailable("response carried no text".to_string())
            })
    }
}

fn build_prompt(
    candidate: &StrategyCandidate,
    weather: &WeatherSnapshot,
    models: &ModelSet,
) -> String {
    let stints: Vec<String> = candidate
        .stints
        .iter()
        .map(|s| format!("{} for {} laps", s.compound.as_str(), s.laps))
        .collect();
    let coefficients: Vec<String> = models
        .fitted_models()
        .iter()
        .map(|m| {
            format!(
                "{}: base {:.2}s, degradation {:.3}s/lap",
                m.compound.as_str(),
                m.base_time,
                m.slope
            )
        })
        .collect();

    format!(
        "You are a Formula 1 strategy engineer. Justify this pit strategy for {circuit}.\n\
         Weather: track temp {temp:.1}C, rain probability {rain:.0}%, conditions {cond:?}.\n\
         Strategy: {stints}; pit on laps {pits:?}; predicted race time {total:.1}s; \
         estimated win probability {prob:.0}%.\n\
         Fitted tire models: {coeffs}.\n\
         Explain briefly how this choice balances tire degradation, pit-stop loss, \
         and the weather risk. Two short paragraphs at most.",
        circuit = weather.circuit,
        temp = weather.track_temp_c,
        rain = weather.rain_probability * 100.0,
        cond = weather.condition,
        stints = stints.join(", then "),
        pits = candidate.pit_laps,
        total = candidate.predicted_total_time,
        prob = candidate.win_probability * 100.0,
        coeffs = coefficients.join("; "),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::LapDataset;
    use crate::types::{Compound, LapRecord, Stint, WeatherSnapshot};

    #[test]
    fn prompt_carries_strategy_weather_and_coefficients() {
        let laps: Vec<LapRecord> = (1..=3)
            .map(|i| LapRecord {
                race_id: "r".into(),
                driver_id: "VER".into(),
                compound: Compound::Medium,
                lap_in_stint: i,
                lap_time_s: 89.5 + 0.5 * i as f64,
            })
            .collect();
        let models = ModelSet::fit(&LapDataset::from_records(laps, 1));
        let mut candidate = StrategyCandidate::new(
            vec![
                Stint { compound: Compound::Medium, laps: 25 },
                Stint { compound: Compound::Hard, laps: 28 },
            ],
            5400.0,
        );
        candidate.win_probability = 0.62;
        let weather = WeatherSnapshot::new("Monza", 34.0, 0.1, 0);

        let prompt = build_prompt(&candidate, &weather, &models);
        assert!(prompt.contains("Monza"));
        assert!(prompt.contains("MEDIUM for 25 laps"));
        assert!(prompt.contains("then HARD for 28 laps"));
        assert!(prompt.contains("[25]"), "pit lap list present");
        assert!(prompt.contains("degradation 0.500s/lap"));
        assert!(prompt.contains("62%"));
    }

    #[test]
    fn response_text_is_first_text_block() {
        let body: NarrativeResponse = serde_json::from_str(
            r#"{"content": [{"type": "text", "text": "Box on lap 25."}]}"#,
        )
        .unwrap();
        let text = body.content.into_iter().find_map(|b| b.text).unwrap();
        assert_eq!(text, "Box on lap 25.");
    }
}
