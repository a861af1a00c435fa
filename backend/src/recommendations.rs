use serde::{Deserialize, Serialize};
use shared::{EntryKind, RecommendationSource, RecommendationsResponse};

use crate::gemini::types::GenerateContentRequest;
use crate::gemini::Provider;
use crate::history::ConversationLog;

pub const DEFAULT_RECOMMENDATIONS: &str = "1. Irrigation: Water your crops in the early morning for optimal absorption.
2. Fertilization: Apply nitrogen-rich fertilizer next week based on soil analysis.
3. Pest Control: Monitor for aphids. Consider organic pest management.";

const CONTEXT_ENTRIES: usize = 5;
const LOG_REQUEST: &str = "Get farm recommendations";

/// Current farm conditions quoted in the recommendations prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FarmSnapshot {
    pub soil_moisture: f64,
    pub soil_ph: f64,
    pub temperature: f64,
    pub humidity: f64,
}

impl Default for FarmSnapshot {
    fn default() -> Self {
        Self {
            soil_moisture: 65.0,
            soil_ph: 6.8,
            temperature: 28.0,
            humidity: 65.0,
        }
    }
}

#[derive(Clone)]
pub struct RecommendationService {
    provider: Provider,
    log: ConversationLog,
    snapshot: FarmSnapshot,
}

impl RecommendationService {
    pub fn new(provider: Provider, log: ConversationLog, snapshot: FarmSnapshot) -> Self {
        Self {
            provider,
            log,
            snapshot,
        }
    }

    /// Asks the provider for three actionable recommendations. Falls back to the stock list
    /// on any provider failure or an empty reply.
    pub async fn recommend(&self, latest_diagnosis: Option<&str>) -> RecommendationsResponse {
        let history = self.history_context().await;
        let prompt = build_prompt(&self.snapshot, latest_diagnosis, &history);

        let text = match self
            .provider
            .generate(&GenerateContentRequest::text_only(prompt))
            .await
        {
            Ok(text) => text,
            Err(e) => {
                log::warn!("Recommendation request failed, using defaults: {}", e);
                return default_response();
            }
        };

        let recommendations = split_lines(&text);
        if recommendations.is_empty() {
            log::warn!("Provider returned empty recommendations, using defaults");
            return default_response();
        }

        if let Err(e) = self
            .log
            .append(EntryKind::Recommendation, LOG_REQUEST, &text)
            .await
        {
            log::warn!("Failed to record recommendation exchange: {}", e);
        }

        // The stub replies with the stock list, so it is not reported as AI output.
        let source = match self.provider {
            Provider::Gemini(_) => RecommendationSource::Ai,
            Provider::Stub(_) => RecommendationSource::Default,
        };
        RecommendationsResponse { recommendations, source }
    }

    async fn history_context(&self) -> String {
        match self.log.recent(CONTEXT_ENTRIES).await {
            Ok(entries) if !entries.is_empty() => entries
                .iter()
                .map(|entry| format!("User: {}\nAI: {}", entry.request, entry.response))
                .collect::<Vec<_>>()
                .join("\n\n"),
            Ok(_) => "No previous conversations".to_string(),
            Err(e) => {
                log::warn!("Conversation history unavailable for recommendations: {}", e);
                "No previous conversations".to_string()
            }
        }
    }
}

pub fn default_response() -> RecommendationsResponse {
    RecommendationsResponse {
        recommendations: split_lines(DEFAULT_RECOMMENDATIONS),
        source: RecommendationSource::Default,
    }
}

/// Non-empty trimmed lines of `text`.
pub fn split_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn build_prompt(snapshot: &FarmSnapshot, latest_diagnosis: Option<&str>, history: &str) -> String {
    let diagnosis = latest_diagnosis
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .unwrap_or("none");

    format!(
        "You are an expert agricultural AI assistant for smart farming. Based on the farm's current \
conditions and conversation history, provide 3 specific, actionable recommendations.

Current Farm Status:
- Soil Moisture: {}%
- Soil pH: {}
- Temperature: {}°C
- Humidity: {}%
- Recent Diagnoses: {}

Conversation History:
{}

Please provide recommendations in this format:
1. [Category]: [Specific action with timing]
2. [Category]: [Specific action with timing]
3. [Category]: [Specific action with timing]",
        snapshot.soil_moisture, snapshot.soil_ph, snapshot.temperature, snapshot.humidity, diagnosis, history
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gemini::client::GeminiClient;
    use crate::gemini::stub::StubGenerator;
    use crate::test_support::spawn_endpoint;
    use actix_web::HttpResponse;
    use serde_json::json;
    use std::time::Duration;

    fn gemini(base_url: &str) -> Provider {
        Provider::Gemini(
            GeminiClient::new("test-key".into(), base_url, "gemini-1.5-flash", Duration::from_secs(5)).unwrap(),
        )
    }

    #[test]
    fn prompt_quotes_snapshot_and_diagnosis() {
        let prompt = build_prompt(&FarmSnapshot::default(), Some("Early Blight"), "No previous conversations");
        assert!(prompt.contains("- Soil Moisture: 65%"));
        assert!(prompt.contains("- Soil pH: 6.8"));
        assert!(prompt.contains("- Temperature: 28°C"));
        assert!(prompt.contains("- Recent Diagnoses: Early Blight"));

        let prompt = build_prompt(&FarmSnapshot::default(), Some("  "), "");
        assert!(prompt.contains("- Recent Diagnoses: none"));
    }

    #[test]
    fn defaults_split_into_three_lines() {
        let response = default_response();
        assert_eq!(response.source, RecommendationSource::Default);
        assert_eq!(response.recommendations.len(), 3);
        assert!(response.recommendations[0].starts_with("1. Irrigation"));
    }

    #[actix_web::test]
    async fn ai_reply_is_split_and_logged() {
        let endpoint = spawn_endpoint(|_, body| {
            let prompt = body["contents"][0]["parts"][0]["text"].as_str().unwrap_or_default();
            assert!(prompt.contains("User: Symptom analysis: spots\nAI: looks fungal"));
            HttpResponse::Ok().json(json!({
                "candidates": [{"content": {"parts": [{"text": "1. Water: early.\n\n  2. Feed: later.  \n"}]}}]
            }))
        });
        let log = ConversationLog::open_in_memory().unwrap();
        log.append(EntryKind::SymptomDiagnosis, "Symptom analysis: spots", "looks fungal")
            .await
            .unwrap();

        let service = RecommendationService::new(gemini(&endpoint.base_url), log.clone(), FarmSnapshot::default());
        let response = service.recommend(None).await;

        assert_eq!(response.source, RecommendationSource::Ai);
        assert_eq!(response.recommendations, vec!["1. Water: early.", "2. Feed: later."]);
        let last = log.recent(1).await.unwrap();
        assert_eq!(last[0].kind, EntryKind::Recommendation);
        assert_eq!(last[0].request, LOG_REQUEST);
    }

    #[actix_web::test]
    async fn provider_failure_returns_defaults_without_logging() {
        let log = ConversationLog::open_in_memory().unwrap();
        let service = RecommendationService::new(gemini("http://127.0.0.1:1"), log.clone(), FarmSnapshot::default());

        let response = service.recommend(Some("Late Blight")).await;
        assert_eq!(response.source, RecommendationSource::Default);
        assert_eq!(response.recommendations, split_lines(DEFAULT_RECOMMENDATIONS));
        assert_eq!(log.count().await.unwrap(), 0);
    }

    #[actix_web::test]
    async fn stub_provider_reports_default_source() {
        let service = RecommendationService::new(
            Provider::Stub(StubGenerator),
            ConversationLog::unavailable("not configured"),
            FarmSnapshot::default(),
        );

        let response = service.recommend(None).await;
        assert_eq!(response.source, RecommendationSource::Default);
        assert_eq!(response.recommendations, default_response().recommendations);
    }
}
