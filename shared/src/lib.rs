use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};
use uuid::Uuid;

/// Soil and tank parameters the dashboard knows thresholds for.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ParameterKey {
    #[strum(to_string = "moisture", serialize = "soil_moisture")]
    Moisture,
    Ph,
    Nitrogen,
    Phosphorus,
    Potassium,
    #[strum(to_string = "water", serialize = "water_level")]
    Water,
}

impl ParameterKey {
    pub fn label(&self) -> &'static str {
        match self {
            ParameterKey::Moisture => "Soil Moisture",
            ParameterKey::Ph => "pH",
            ParameterKey::Nitrogen => "Nitrogen (N)",
            ParameterKey::Phosphorus => "Phosphorus (P)",
            ParameterKey::Potassium => "Potassium (K)",
            ParameterKey::Water => "Water Level",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            ParameterKey::Moisture | ParameterKey::Water => "%",
            ParameterKey::Ph => "",
            ParameterKey::Nitrogen | ParameterKey::Phosphorus | ParameterKey::Potassium => "mg/kg",
        }
    }

    pub fn optimal_range(&self) -> &'static str {
        match self {
            ParameterKey::Moisture => "40–60%",
            ParameterKey::Ph => "6.0–7.0",
            ParameterKey::Nitrogen => "50–80 mg/kg",
            ParameterKey::Phosphorus => "20–40 mg/kg",
            ParameterKey::Potassium => "40–60 mg/kg",
            ParameterKey::Water => ">30%",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReadingStatus {
    Normal,
    Low,
    High,
    Critical,
    Acidic,
    Alkaline,
    Unknown,
}

/// Colour the dashboard paints a status badge with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ColorHint {
    Green,
    Orange,
    Red,
    Gray,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub status: ReadingStatus,
    pub color: ColorHint,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub parameter: String,
    pub value: f64,
    #[serde(default)]
    pub unit: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoilAnalysisRequest {
    pub readings: Vec<Reading>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoilMetric {
    pub parameter: String,
    pub label: String,
    pub value: f64,
    pub unit: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optimal_range: Option<String>,
    pub status: ReadingStatus,
    pub color: ColorHint,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoilReport {
    pub metrics: Vec<SoilMetric>,
    pub attention_count: usize,
    pub summary: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Severity {
    Low,
    Medium,
    High,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, EnumIter, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Category {
    Fungal,
    Bacterial,
    Viral,
    Nutrient,
    Environmental,
    Healthy,
    Unknown,
    Error,
}

/// One diagnosis shown in the plant-diagnosis panel. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosisRecord {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symptoms: Option<String>,
    pub image_uploaded: bool,
    pub diagnosis: String,
    pub confidence: f32,
    pub treatment: String,
    pub severity: Severity,
    pub category: Category,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_time_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymptomRequest {
    pub symptoms: String,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Body returned by the simulated CNN endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulatedDiagnosis {
    pub success: bool,
    pub diagnosis: String,
    pub confidence: f32,
    pub category: Category,
    pub treatment: String,
    pub severity: Severity,
    pub description: String,
    pub image_processed: bool,
    pub timestamp: DateTime<Utc>,
    pub model_version: String,
    pub processing_time: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EntryKind {
    ImageDiagnosis,
    SymptomDiagnosis,
    Recommendation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationEntry {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub request: String,
    pub response: String,
    pub kind: EntryKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationSource {
    Ai,
    Default,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationsResponse {
    pub recommendations: Vec<String>,
    pub source: RecommendationSource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherReport {
    pub location: String,
    pub temperature: i32,
    pub condition: String,
    pub humidity: i32,
    pub wind_speed: i32,
    pub feels_like: i32,
    pub rain_chance: i32,
    pub icon: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentReading {
    pub temperature: f64,
    pub humidity: f64,
    pub wind_speed: f64,
    pub light_intensity: f64,
    pub soil_temp: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricLevel {
    Ok,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentAnalysis {
    pub reading: EnvironmentReading,
    pub recorded_at: DateTime<Utc>,
    pub issues: Vec<String>,
    pub warnings: Vec<String>,
    pub positives: Vec<String>,
    pub temperature_level: MetricLevel,
    pub humidity_level: MetricLevel,
    pub summary: String,
}
