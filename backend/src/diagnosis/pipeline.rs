use chrono::Utc;
use shared::{Category, DiagnosisRecord, EntryKind, Severity};
use std::time::Instant;
use uuid::Uuid;

use super::image::ImageUpload;
use super::parser::{parse_response, ParsedResponse};
use super::InputError;
use crate::gemini::types::GenerateContentRequest;
use crate::gemini::Provider;
use crate::history::ConversationLog;

pub const DEFAULT_CONTEXT_ENTRIES: usize = 3;

/// Opening words shared by both diagnosis prompts.
pub const DIAGNOSIS_PROMPT_PREFIX: &str = "You are an expert plant pathologist";

const IMAGE_FALLBACK_TREATMENT: &str =
    "Monitor plant closely. Ensure proper watering and sunlight. Consider consulting a local agricultural expert.";
const IMAGE_FALLBACK_PROCESSING_MS: u64 = 1500;
const SYMPTOM_FALLBACK_TREATMENT: &str = "Please try again later or check your internet connection.";
const UNSTRUCTURED_CONFIDENCE: f32 = 75.0;

/// What is being diagnosed in one request.
enum Subject<'a> {
    Image(&'a ImageUpload),
    Symptoms { symptoms: &'a str, notes: Option<&'a str> },
}

impl Subject<'_> {
    fn kind(&self) -> EntryKind {
        match self {
            Subject::Image(_) => EntryKind::ImageDiagnosis,
            Subject::Symptoms { .. } => EntryKind::SymptomDiagnosis,
        }
    }

    /// The line written to the conversation log and echoed as context in later prompts.
    fn summary(&self) -> String {
        match self {
            Subject::Image(upload) => {
                let fingerprint = upload.fingerprint();
                format!("Plant image analysis (sha256:{})", &fingerprint[..12])
            }
            Subject::Symptoms { symptoms, .. } => format!("Symptom analysis: {}", symptoms),
        }
    }
}

/// Turns one image or symptom description into a `DiagnosisRecord`.
///
/// A request moves through prompt building, a single provider call, response parsing and
/// logging. Any provider failure produces the fallback record instead of an error; only
/// input validation can reject a request, and it does so before the provider is called.
#[derive(Clone)]
pub struct DiagnosisPipeline {
    provider: Provider,
    log: ConversationLog,
    context_entries: usize,
}

impl DiagnosisPipeline {
    pub fn new(provider: Provider, log: ConversationLog) -> Self {
        Self {
            provider,
            log,
            context_entries: DEFAULT_CONTEXT_ENTRIES,
        }
    }

    pub fn with_context_entries(mut self, context_entries: usize) -> Self {
        self.context_entries = context_entries;
        self
    }

    pub fn provider(&self) -> &Provider {
        &self.provider
    }

    pub async fn diagnose_image(&self, upload: &ImageUpload) -> DiagnosisRecord {
        log::info!(
            "Diagnosing uploaded image ({} bytes, {})",
            upload.len(),
            upload.mime_type()
        );
        self.run(Subject::Image(upload)).await
    }

    pub async fn diagnose_symptoms(
        &self,
        symptoms: &str,
        notes: Option<&str>,
    ) -> Result<DiagnosisRecord, InputError> {
        let symptoms = symptoms.trim();
        if symptoms.is_empty() {
            return Err(InputError::EmptySymptoms);
        }
        let notes = notes.map(str::trim).filter(|n| !n.is_empty());

        log::info!("Diagnosing described symptoms");
        Ok(self.run(Subject::Symptoms { symptoms, notes }).await)
    }

    async fn run(&self, subject: Subject<'_>) -> DiagnosisRecord {
        let started = Instant::now();

        log::debug!("Building {} prompt", subject.kind());
        let context = self.history_context().await;
        let request = build_request(&subject, &context);

        log::debug!("Awaiting {} provider response", self.provider.name());
        let (record, logged_response) = match self.provider.generate(&request).await {
            Ok(text) => {
                log::debug!("Parsing provider response ({} chars)", text.len());
                let elapsed = started.elapsed().as_millis() as u64;
                let record = self.record_from_response(&subject, &text, elapsed);
                (record, text)
            }
            Err(e) => {
                log::warn!("Diagnosis request failed, using fallback result: {}", e);
                let record = self.fallback_record(&subject);
                let treatment = record.treatment.clone();
                (record, treatment)
            }
        };

        self.record_exchange(subject.kind(), &subject.summary(), &logged_response)
            .await;
        record
    }

    /// `Previous: <request>` lines for the most recent exchanges, oldest first.
    async fn history_context(&self) -> String {
        match self.log.recent(self.context_entries).await {
            Ok(entries) if !entries.is_empty() => entries
                .iter()
                .map(|entry| format!("Previous: {}", entry.request))
                .collect::<Vec<_>>()
                .join("\n"),
            Ok(_) => "First analysis".to_string(),
            Err(e) => {
                log::warn!("Conversation history unavailable for prompt context: {}", e);
                "First analysis".to_string()
            }
        }
    }

    async fn record_exchange(&self, kind: EntryKind, request: &str, response: &str) {
        if let Err(e) = self.log.append(kind, request, response).await {
            log::warn!("Failed to record {} exchange: {}", kind, e);
        }
    }

    fn base_record(&self, subject: &Subject<'_>) -> DiagnosisRecord {
        let (symptoms, image_uploaded) = match subject {
            Subject::Image(_) => (None, true),
            Subject::Symptoms { symptoms, .. } => (Some(symptoms.to_string()), false),
        };
        DiagnosisRecord {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            symptoms,
            image_uploaded,
            diagnosis: String::new(),
            confidence: 0.0,
            treatment: String::new(),
            severity: Severity::Medium,
            category: Category::Unknown,
            description: None,
            model_version: Some(self.provider.model_version(image_uploaded)),
            processing_time_ms: None,
        }
    }

    fn record_from_response(&self, subject: &Subject<'_>, text: &str, elapsed_ms: u64) -> DiagnosisRecord {
        let mut record = self.base_record(subject);
        if record.image_uploaded {
            record.processing_time_ms = Some(elapsed_ms);
        }

        match parse_response(text) {
            ParsedResponse::Structured(parsed) => {
                record.diagnosis = parsed.diagnosis;
                record.confidence = parsed.confidence;
                record.treatment = parsed.treatment;
                record.severity = parsed.severity;
                record.category = parsed.category;
                record.description = parsed.description;
            }
            ParsedResponse::Unstructured(raw) => {
                let (diagnosis, description) = match subject {
                    Subject::Image(_) => (
                        "Plant Analysis Complete",
                        "Analysis completed with detailed observations",
                    ),
                    Subject::Symptoms { .. } => ("Plant Stress Detected", "Analysis completed"),
                };
                record.diagnosis = diagnosis.to_string();
                record.confidence = UNSTRUCTURED_CONFIDENCE;
                record.treatment = raw;
                record.severity = Severity::Medium;
                record.category = Category::Environmental;
                record.description = Some(description.to_string());
            }
        }
        record
    }

    fn fallback_record(&self, subject: &Subject<'_>) -> DiagnosisRecord {
        let mut record = self.base_record(subject);
        match subject {
            Subject::Image(_) => {
                record.diagnosis = "Plant Health Assessment".to_string();
                record.confidence = 70.0;
                record.treatment = IMAGE_FALLBACK_TREATMENT.to_string();
                record.severity = Severity::Medium;
                record.category = Category::Environmental;
                record.description = Some("Analysis completed with fallback model.".to_string());
                record.processing_time_ms = Some(IMAGE_FALLBACK_PROCESSING_MS);
            }
            Subject::Symptoms { .. } => {
                record.diagnosis = "Analysis Failed".to_string();
                record.confidence = 0.0;
                record.treatment = SYMPTOM_FALLBACK_TREATMENT.to_string();
                record.severity = Severity::Low;
                record.category = Category::Error;
                record.description = Some("An error occurred during analysis. Please try again.".to_string());
            }
        }
        record
    }
}

fn build_request(subject: &Subject<'_>, context: &str) -> GenerateContentRequest {
    match subject {
        Subject::Image(upload) => GenerateContentRequest::with_image(
            image_prompt(context),
            upload.mime_type(),
            upload.to_base64(),
        ),
        Subject::Symptoms { symptoms, notes } => {
            GenerateContentRequest::text_only(symptom_prompt(symptoms, *notes, context))
        }
    }
}

fn image_prompt(context: &str) -> String {
    format!(
        r#"{DIAGNOSIS_PROMPT_PREFIX} and agricultural specialist. Analyze this plant image carefully and provide a detailed diagnosis.

Look for:
- Leaf color, texture, and patterns
- Spots, lesions, or discoloration
- Signs of disease, pest damage, or nutrient deficiency
- Overall plant health

Previous context: {context}

Provide your response in JSON format:
{{
  "diagnosis": "specific disease or condition name",
  "confidence": 85,
  "treatment": "detailed treatment steps",
  "severity": "low/medium/high",
  "category": "fungal/bacterial/viral/nutrient/environmental/healthy",
  "description": "detailed description of what you observe"
}}"#
    )
}

fn symptom_prompt(symptoms: &str, notes: Option<&str>, context: &str) -> String {
    let notes = notes.unwrap_or("None");
    format!(
        r#"{DIAGNOSIS_PROMPT_PREFIX}. Based on these symptoms, provide a diagnosis:

Symptoms: {symptoms}
Additional Notes: {notes}

Previous context: {context}

Provide response in JSON format:
{{
  "diagnosis": "disease name",
  "confidence": 85,
  "treatment": "treatment steps",
  "severity": "low/medium/high",
  "category": "fungal/bacterial/viral/nutrient/environmental",
  "description": "detailed description"
}}"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnosis::image::tests::PNG_HEADER;
    use crate::gemini::client::GeminiClient;
    use crate::gemini::stub::{StubGenerator, STUB_MODEL_VERSION};
    use crate::test_support::spawn_endpoint;
    use actix_web::HttpResponse;
    use serde_json::json;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    fn gemini(base_url: &str) -> Provider {
        Provider::Gemini(
            GeminiClient::new("test-key".into(), base_url, "gemini-1.5-flash", Duration::from_secs(5)).unwrap(),
        )
    }

    fn reply(text: &str) -> HttpResponse {
        HttpResponse::Ok().json(json!({
            "candidates": [{"content": {"parts": [{"text": text}]}}]
        }))
    }

    fn png() -> ImageUpload {
        ImageUpload::new(PNG_HEADER.to_vec(), None, Some("leaf.png".into())).unwrap()
    }

    #[actix_web::test]
    async fn structured_reply_becomes_record_and_is_logged() {
        let raw = "Diagnosis follows.\n{\"diagnosis\": \"Early Blight\", \"confidence\": \"91%\", \
                   \"treatment\": \"Remove lower leaves.\", \"severity\": \"HIGH\", \"category\": \"Fungal\"}";
        let endpoint = spawn_endpoint(move |_, _| reply(raw));
        let log = ConversationLog::open_in_memory().unwrap();
        let pipeline = DiagnosisPipeline::new(gemini(&endpoint.base_url), log.clone());

        let record = pipeline
            .diagnose_symptoms("  dark rings on lower leaves ", Some("after rain"))
            .await
            .unwrap();

        assert_eq!(record.diagnosis, "Early Blight");
        assert_eq!(record.confidence, 91.0);
        assert_eq!(record.severity, Severity::High);
        assert_eq!(record.category, Category::Fungal);
        assert_eq!(record.symptoms.as_deref(), Some("dark rings on lower leaves"));
        assert!(!record.image_uploaded);
        assert_eq!(record.model_version.as_deref(), Some("gemini-1.5-flash"));

        let entries = log.recent(1).await.unwrap();
        assert_eq!(entries[0].request, "Symptom analysis: dark rings on lower leaves");
        assert_eq!(entries[0].response, raw);
        assert_eq!(entries[0].kind, EntryKind::SymptomDiagnosis);
    }

    #[actix_web::test]
    async fn prose_reply_uses_unstructured_defaults() {
        let endpoint = spawn_endpoint(|_, _| reply("Leaves look dry, water twice a week."));
        let pipeline = DiagnosisPipeline::new(
            gemini(&endpoint.base_url),
            ConversationLog::open_in_memory().unwrap(),
        );

        let record = pipeline.diagnose_symptoms("wilting", None).await.unwrap();
        assert_eq!(record.diagnosis, "Plant Stress Detected");
        assert_eq!(record.confidence, 75.0);
        assert_eq!(record.severity, Severity::Medium);
        assert_eq!(record.category, Category::Environmental);
        assert_eq!(record.treatment, "Leaves look dry, water twice a week.");

        let record = pipeline.diagnose_image(&png()).await;
        assert_eq!(record.diagnosis, "Plant Analysis Complete");
        assert_eq!(record.confidence, 75.0);
        assert_eq!(record.model_version.as_deref(), Some("Gemini Vision API"));
        assert!(record.processing_time_ms.is_some());
    }

    #[actix_web::test]
    async fn image_request_carries_inline_data_and_context() {
        let prompts = Arc::new(Mutex::new(Vec::new()));
        let captured = prompts.clone();
        let endpoint = spawn_endpoint(move |_, body| {
            let parts = &body["contents"][0]["parts"];
            captured
                .lock()
                .unwrap()
                .push(parts[0]["text"].as_str().unwrap_or_default().to_string());
            assert_eq!(parts[1]["inline_data"]["mime_type"], "image/png");
            reply("{\"diagnosis\": \"Healthy Plant\", \"confidence\": 96}")
        });
        let log = ConversationLog::open_in_memory().unwrap();
        let pipeline = DiagnosisPipeline::new(gemini(&endpoint.base_url), log.clone());

        let first = pipeline.diagnose_image(&png()).await;
        let second = pipeline.diagnose_image(&png()).await;
        assert_eq!(first.category, Category::Healthy);
        assert_eq!(second.confidence, 96.0);

        let prompts = prompts.lock().unwrap();
        assert!(prompts[0].contains("Previous context: First analysis"));
        assert!(prompts[1].contains("Previous: Plant image analysis (sha256:"));

        let entries = log.all().await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].kind, EntryKind::ImageDiagnosis);
    }

    #[actix_web::test]
    async fn network_failure_yields_fallback_records() {
        let log = ConversationLog::open_in_memory().unwrap();
        let pipeline = DiagnosisPipeline::new(gemini("http://127.0.0.1:1"), log.clone());

        let image = pipeline.diagnose_image(&png()).await;
        assert_eq!(image.diagnosis, "Plant Health Assessment");
        assert_eq!(image.confidence, 70.0);
        assert_eq!(image.severity, Severity::Medium);
        assert_eq!(image.category, Category::Environmental);
        assert_eq!(image.processing_time_ms, Some(1500));

        let symptoms = pipeline.diagnose_symptoms("yellow spots", None).await.unwrap();
        assert_eq!(symptoms.diagnosis, "Analysis Failed");
        assert_eq!(symptoms.confidence, 0.0);
        assert_eq!(symptoms.severity, Severity::Low);
        assert_eq!(symptoms.category, Category::Error);

        let entries = log.all().await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].response, IMAGE_FALLBACK_TREATMENT);
        assert_eq!(entries[1].response, SYMPTOM_FALLBACK_TREATMENT);
    }

    #[actix_web::test]
    async fn http_error_status_yields_fallback() {
        let endpoint = spawn_endpoint(|_, _| HttpResponse::Forbidden().json(json!({"error": {"message": "bad key"}})));
        let pipeline = DiagnosisPipeline::new(
            gemini(&endpoint.base_url),
            ConversationLog::open_in_memory().unwrap(),
        );

        let record = pipeline.diagnose_symptoms("holes in leaves", None).await.unwrap();
        assert_eq!(record.category, Category::Error);
        assert_eq!(endpoint.hits(), 1);
    }

    #[actix_web::test]
    async fn unavailable_log_does_not_change_result() {
        let endpoint = spawn_endpoint(|_, _| reply("{\"diagnosis\": \"Powdery Mildew\", \"confidence\": 80}"));
        let pipeline = DiagnosisPipeline::new(
            gemini(&endpoint.base_url),
            ConversationLog::unavailable("disk full"),
        );

        let record = pipeline.diagnose_symptoms("white powder on leaves", None).await.unwrap();
        assert_eq!(record.diagnosis, "Powdery Mildew");
        assert_eq!(record.confidence, 80.0);
        assert_eq!(record.category, Category::Fungal);
    }

    #[actix_web::test]
    async fn blank_symptoms_never_reach_provider() {
        let endpoint = spawn_endpoint(|_, _| reply("unused"));
        let log = ConversationLog::open_in_memory().unwrap();
        let pipeline = DiagnosisPipeline::new(gemini(&endpoint.base_url), log.clone());

        assert_eq!(
            pipeline.diagnose_symptoms(" \n\t ", Some("notes")).await.unwrap_err(),
            InputError::EmptySymptoms
        );
        assert_eq!(endpoint.hits(), 0);
        assert_eq!(log.count().await.unwrap(), 0);
    }

    #[actix_web::test]
    async fn stub_provider_produces_catalog_diagnosis() {
        let pipeline = DiagnosisPipeline::new(
            Provider::Stub(StubGenerator),
            ConversationLog::open_in_memory().unwrap(),
        );

        let record = pipeline.diagnose_image(&png()).await;
        assert!((75.0..=95.0).contains(&record.confidence));
        assert_ne!(record.category, Category::Error);
        assert_eq!(record.model_version.as_deref(), Some(STUB_MODEL_VERSION));
    }

    #[actix_web::test]
    async fn stub_provider_diagnoses_symptoms_by_keyword() {
        let pipeline = DiagnosisPipeline::new(
            Provider::Stub(StubGenerator),
            ConversationLog::open_in_memory().unwrap(),
        );

        let record = pipeline
            .diagnose_symptoms("leaves curl inward", Some("yellow spots on the fence"))
            .await
            .unwrap();
        assert_eq!(record.diagnosis, "Possible Viral Infection");
        assert_eq!(record.category, Category::Viral);
        assert_eq!(record.severity, Severity::High);
        assert_eq!(record.confidence, 73.0);
    }
}
