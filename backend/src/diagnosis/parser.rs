use serde::Deserialize;
use serde_json::Value;
use shared::{Category, Severity};
use std::str::FromStr;

use super::catalog::{self, GENERIC_TREATMENT};

/// Confidence assumed when the model omits one.
const DEFAULT_CONFIDENCE: f32 = 75.0;

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDiagnosis {
    pub diagnosis: String,
    pub confidence: f32,
    pub treatment: String,
    pub severity: Severity,
    pub category: Category,
    pub description: Option<String>,
}

/// Outcome of reading a model reply: either a structured diagnosis or the raw text.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedResponse {
    Structured(ParsedDiagnosis),
    Unstructured(String),
}

#[derive(Debug, Deserialize)]
struct RawDiagnosis {
    #[serde(default)]
    diagnosis: Option<String>,
    #[serde(default)]
    confidence: Option<Value>,
    #[serde(default)]
    treatment: Option<Value>,
    #[serde(default)]
    severity: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

/// Returns the first balanced `{...}` span in `text`, skipping braces inside JSON strings.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    let mut search_from = 0;

    while let Some(offset) = text[search_from..].find('{') {
        let start = search_from + offset;
        let mut depth = 0usize;
        let mut in_string = false;
        let mut escaped = false;

        for (i, &b) in bytes.iter().enumerate().skip(start) {
            if in_string {
                match b {
                    _ if escaped => escaped = false,
                    b'\\' => escaped = true,
                    b'"' => in_string = false,
                    _ => {}
                }
                continue;
            }
            match b {
                b'"' => in_string = true,
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(&text[start..=i]);
                    }
                }
                _ => {}
            }
        }

        search_from = start + 1;
    }

    None
}

/// Stage one decodes the embedded object strictly; anything that fails becomes `Unstructured`.
pub fn parse_response(text: &str) -> ParsedResponse {
    let Some(candidate) = extract_json_object(text) else {
        log::debug!("No JSON object found in model response");
        return ParsedResponse::Unstructured(text.to_string());
    };

    let raw: RawDiagnosis = match serde_json::from_str(candidate) {
        Ok(raw) => raw,
        Err(e) => {
            log::debug!("Embedded JSON did not decode: {}", e);
            return ParsedResponse::Unstructured(text.to_string());
        }
    };

    match coerce(raw) {
        Some(parsed) => ParsedResponse::Structured(parsed),
        None => {
            log::debug!("Embedded JSON has no diagnosis field");
            ParsedResponse::Unstructured(text.to_string())
        }
    }
}

fn coerce(raw: RawDiagnosis) -> Option<ParsedDiagnosis> {
    let diagnosis = raw.diagnosis.map(|d| d.trim().to_string()).filter(|d| !d.is_empty())?;
    let known = catalog::lookup(&diagnosis);

    let confidence = raw
        .confidence
        .as_ref()
        .and_then(confidence_from_value)
        .map(clamp_confidence)
        .unwrap_or(DEFAULT_CONFIDENCE);

    let treatment = raw
        .treatment
        .as_ref()
        .and_then(text_from_value)
        .or_else(|| known.map(|d| d.treatment.to_string()))
        .unwrap_or_else(|| GENERIC_TREATMENT.to_string());

    let severity = raw
        .severity
        .as_deref()
        .and_then(|s| Severity::from_str(s.trim()).ok())
        .or_else(|| known.map(|d| d.severity))
        .unwrap_or(Severity::Medium);

    let category = raw
        .category
        .as_deref()
        .and_then(|c| Category::from_str(c.trim()).ok())
        .or_else(|| known.map(|d| d.category))
        .unwrap_or(Category::Unknown);

    let description = raw
        .description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty());

    Some(ParsedDiagnosis {
        diagnosis,
        confidence,
        treatment,
        severity,
        category,
        description,
    })
}

fn confidence_from_value(value: &Value) -> Option<f32> {
    match value {
        Value::Number(n) => n.as_f64().map(|v| v as f32),
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f32>().ok(),
        _ => None,
    }
}

/// Pins a confidence into [0, 100]; NaN becomes 0.
pub fn clamp_confidence(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}

fn text_from_value(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" "),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}
