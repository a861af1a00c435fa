use reqwest::Client;
use std::time::Duration;

use super::types::{GenerateContentRequest, GenerateContentResponse};
use super::GenerationError;
use crate::config::Secret;

/// HTTP client for the Gemini `generateContent` endpoint.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: Secret,
    base_url: String,
    model: String,
}

impl GeminiClient {
    pub fn new(
        api_key: Secret,
        base_url: &str,
        model: &str,
        timeout: Duration,
    ) -> Result<Self, GenerationError> {
        if api_key.expose().trim().is_empty() {
            return Err(GenerationError::Config("Gemini API key is empty".to_string()));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GenerationError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    /// Issues one call and returns the first text part. No retries.
    pub async fn generate_content(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<String, GenerationError> {
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", self.api_key.expose())
            .json(request)
            .send()
            .await
            .map_err(|e| GenerationError::Network(e.to_string()))?;

        let status = response.status();
        log::info!("Gemini responded with status {}", status);

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GenerationError::Http {
                status: status.as_u16(),
                message,
            });
        }

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::MalformedResponse(format!("Failed to parse response: {}", e)))?;

        body.first_text()
            .map(str::to_string)
            .ok_or_else(|| GenerationError::MalformedResponse("No text part in response".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gemini::Provider;
    use crate::test_support::spawn_endpoint;
    use actix_web::HttpResponse;
    use serde_json::json;

    fn client_for(base_url: &str) -> GeminiClient {
        GeminiClient::new("test-key".into(), base_url, "gemini-1.5-flash", Duration::from_secs(5)).unwrap()
    }

    #[actix_web::test]
    async fn returns_first_candidate_text() {
        let endpoint = spawn_endpoint(|req, body| {
            assert_eq!(req.path(), "/models/gemini-1.5-flash:generateContent");
            assert_eq!(req.headers().get("x-goog-api-key").unwrap(), "test-key");
            assert_eq!(body["contents"][0]["parts"][0]["text"], "hello");
            HttpResponse::Ok().json(json!({
                "candidates": [{"content": {"parts": [{"text": "hi there"}], "role": "model"}}]
            }))
        });

        let text = client_for(&endpoint.base_url)
            .generate_content(&GenerateContentRequest::text_only("hello"))
            .await
            .unwrap();
        assert_eq!(text, "hi there");
    }

    #[actix_web::test]
    async fn non_success_status_is_http_error() {
        let endpoint = spawn_endpoint(|_, _| {
            HttpResponse::TooManyRequests().json(json!({"error": {"message": "quota"}}))
        });

        let err = client_for(&endpoint.base_url)
            .generate_content(&GenerateContentRequest::text_only("hello"))
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Http { status: 429, .. }));
    }

    #[actix_web::test]
    async fn missing_text_is_malformed() {
        let endpoint = spawn_endpoint(|_, _| HttpResponse::Ok().json(json!({"candidates": []})));

        let err = client_for(&endpoint.base_url)
            .generate_content(&GenerateContentRequest::text_only("hello"))
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::MalformedResponse(_)));
    }

    #[actix_web::test]
    async fn unreachable_endpoint_is_network_error() {
        let err = client_for("http://127.0.0.1:1")
            .generate_content(&GenerateContentRequest::text_only("hello"))
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Network(_)));
    }

    #[test]
    fn debug_output_hides_api_key() {
        let client = GeminiClient::new("sk-live-123".into(), "http://x", "m", Duration::from_secs(1)).unwrap();
        let printed = format!("{:?}", Provider::Gemini(client));
        assert!(!printed.contains("sk-live-123"), "{printed}");
        assert!(printed.contains("***"));
    }

    #[test]
    fn empty_key_is_rejected() {
        let err = GeminiClient::new(" ".into(), "http://x", "m", Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, GenerationError::Config(_)));
    }
}
