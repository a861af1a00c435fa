pub mod client;
pub mod stub;
pub mod types;

use client::GeminiClient;
use stub::StubGenerator;
use types::GenerateContentRequest;

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("HTTP error: {status} - {message}")]
    Http { status: u16, message: String },
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Text/vision generation backend: Gemini over HTTP, or the local stub.
#[derive(Debug, Clone)]
pub enum Provider {
    Gemini(GeminiClient),
    Stub(StubGenerator),
}

impl Provider {
    pub fn name(&self) -> &'static str {
        match self {
            Provider::Gemini(_) => "gemini",
            Provider::Stub(_) => "stub",
        }
    }

    /// Model tag stamped on diagnoses produced through this provider.
    pub fn model_version(&self, with_image: bool) -> String {
        match self {
            Provider::Gemini(_) if with_image => "Gemini Vision API".to_string(),
            Provider::Gemini(client) => client.model().to_string(),
            Provider::Stub(_) => stub::STUB_MODEL_VERSION.to_string(),
        }
    }

    pub async fn generate(&self, request: &GenerateContentRequest) -> Result<String, GenerationError> {
        match self {
            Provider::Gemini(client) => client.generate_content(request).await,
            Provider::Stub(stub) => Ok(stub.generate(request)),
        }
    }
}
