use crate::traits::TextGenerator;
use crate::ServiceError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
const GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/";

/// Returned by generative operations when no API key was configured.
pub const GENERATION_UNAVAILABLE: &str = "Gemini key missing - generation unavailable.";

pub struct GeminiClient {
    client: Client,
    endpoint: Url,
    api_key: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, model: &str) -> Result<Self, ServiceError> {
        Self::with_base_url(GEMINI_ENDPOINT, api_key, model)
    }

    pub fn with_base_url(
        base_url: &str,
        api_key: impl Into<String>,
        model: &str,
    ) -> Result<Self, ServiceError> {
        let base = Url::parse(&format!("{}/", base_url.trim_end_matches('/')))?;
        Ok(Self {
            client: Client::new(),
            endpoint: base.join(&format!("models/{model}:generateContent"))?,
            api_key: api_key.into(),
        })
    }

    /// Builds a client when `api_key` holds a non-blank key.
    pub fn from_key(api_key: Option<String>, model: &str) -> Result<Option<Self>, ServiceError> {
        match api_key.map(|key| key.trim().to_string()) {
            Some(key) if !key.is_empty() => Self::new(key, model).map(Some),
            _ => Ok(None),
        }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, ServiceError> {
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ServiceError::BackendResponse {
                backend: "gemini".to_string(),
                details: format!("{status}: {text}"),
            });
        }

        let parsed: GenerateResponse = response.json().await?;
        response_text(parsed)
    }
}

fn response_text(parsed: GenerateResponse) -> Result<String, ServiceError> {
    let parts = parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| content.parts)
        .ok_or_else(|| ServiceError::BackendResponse {
            backend: "gemini".to_string(),
            details: "response has no candidate content".to_string(),
        })?;

    Ok(parts.into_iter().filter_map(|part| part.text).collect())
}
