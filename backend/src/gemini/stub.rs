use serde_json::json;

use super::types::GenerateContentRequest;
use crate::diagnosis::catalog::{match_symptoms, simulate_cnn_analysis};
use crate::diagnosis::pipeline::DIAGNOSIS_PROMPT_PREFIX;
use crate::recommendations::DEFAULT_RECOMMENDATIONS;

pub const STUB_MODEL_VERSION: &str = "PlantNet-CNN-v2.1";

/// Network-free generator used when no Gemini credential is configured.
///
/// Image prompts get a random catalog condition wrapped in prose. Text prompts opening with the
/// pathologist preamble are matched by keyword on their `Symptoms:` line. Every other prompt gets
/// the stock recommendations.
#[derive(Debug, Clone, Default)]
pub struct StubGenerator;

impl StubGenerator {
    pub fn generate(&self, request: &GenerateContentRequest) -> String {
        let prompt = request.prompt_text();
        let (disease, confidence) = if request.has_image() {
            simulate_cnn_analysis(&mut rand::rng())
        } else if prompt.trim_start().starts_with(DIAGNOSIS_PROMPT_PREFIX) {
            let disease = match_symptoms(symptoms_line(&prompt));
            (disease, disease.base_confidence)
        } else {
            return DEFAULT_RECOMMENDATIONS.to_string();
        };

        let body = json!({
            "diagnosis": disease.name,
            "confidence": confidence,
            "treatment": disease.treatment,
            "severity": disease.severity,
            "category": disease.category,
            "description": disease.description,
        });
        format!("Based on the visible symptoms, here is my assessment:\n{}", body)
    }
}

/// The described symptoms, so that notes and earlier context do not sway the match.
fn symptoms_line(prompt: &str) -> &str {
    prompt
        .lines()
        .find_map(|line| line.trim_start().strip_prefix("Symptoms:"))
        .unwrap_or(prompt)
}
