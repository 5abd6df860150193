//! Remote provider: one `generateContent` call per request.
//!
//! This is the only module that knows the remote API's request and response
//! shapes and the prompt wording. Every failure degrades to the fallback set.

use crate::error::ProviderError;
use crate::prompts::suggestion_prompt;
use futures::future::BoxFuture;
use quill_adapters::config::{Config, RemoteConfig};
use quill_core::suggest::fallback::fallback_suggestions;
use quill_core::suggest::parse::parse_response;
use quill_core::suggest::{ProviderModel, Suggestion};
use quill_core::util::truncate;
use quill_core::{SuggestionProvider, SuggestionRequest};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Maximum length for error content in error messages
const MAX_ERROR_CONTENT_LEN: usize = 200;

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<RequestContent>,
}

#[derive(Serialize)]
struct RequestContent {
    parts: Vec<RequestPart>,
}

#[derive(Serialize)]
struct RequestPart {
    text: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

/// Sanitize API response content for error messages to prevent credential leakage.
fn sanitize_api_response(content: &str) -> String {
    const SECRET_PATTERNS: &[&str] = &["api_key", "apikey", "x-goog-api-key", "secret", "bearer", "aiza"];

    let truncated = truncate(content, MAX_ERROR_CONTENT_LEN);
    let lower = truncated.to_lowercase();
    if SECRET_PATTERNS.iter().any(|p| lower.contains(p)) {
        return "(response details redacted - may contain sensitive data)".to_string();
    }
    truncated
}

/// Pull `candidates[0].content.parts[0].text` out of a response body
pub(crate) fn extract_text(body: &str) -> Result<String, ProviderError> {
    let parsed: GenerateResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::MalformedResponse(format!("invalid JSON body: {}", e)))?;

    parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|c| c.parts.into_iter().next())
        .and_then(|p| p.text)
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| {
            ProviderError::MalformedResponse("missing candidates[0].content.parts[0].text".into())
        })
}

pub struct RemoteProvider {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl RemoteProvider {
    pub fn new(config: &RemoteConfig, api_key: Option<String>) -> anyhow::Result<Self> {
        let timeout = config.request_timeout();
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            timeout,
        })
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Self::new(&config.remote, config.get_api_key())
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Suggestions for `request`; never empty unless the content is blank.
    pub async fn fetch_suggestions(&self, request: &SuggestionRequest) -> Vec<Suggestion> {
        if request.is_blank() {
            tracing::debug!("blank content, skipping remote provider");
            return Vec::new();
        }

        let text = match self.generate(request).await {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(kind = ?err.kind(), error = %err, "remote provider failed, using fallback");
                return fallback_suggestions(&request.content);
            }
        };

        let suggestions = parse_response(&text, &request.content);
        if suggestions.is_empty() {
            tracing::warn!(
                kind = ?crate::error::ErrorKind::ProviderMalformedResponse,
                "remote reply had no locatable suggestions, using fallback"
            );
            return fallback_suggestions(&request.content);
        }
        suggestions
    }

    /// Issue the request and return the raw reply text
    async fn generate(&self, request: &SuggestionRequest) -> Result<String, ProviderError> {
        let api_key = self.api_key.as_deref().ok_or(ProviderError::MissingApiKey)?;
        let timeout_secs = self.timeout.as_secs();

        let body = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart {
                    text: suggestion_prompt(
                        &request.content,
                        request.format,
                        request.focus.as_deref(),
                    ),
                }],
            }],
        };

        tracing::debug!(
            format = request.format.as_str(),
            chars = request.content.chars().count(),
            "requesting remote suggestions"
        );
        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .header("X-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::from_transport(e, timeout_secs))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::from_transport(e, timeout_secs))?;

        match status.as_u16() {
            401 | 403 => Err(ProviderError::AuthFailed {
                status: status.as_u16(),
            }),
            _ if !status.is_success() => Err(ProviderError::Http {
                status: status.as_u16(),
                body: sanitize_api_response(&text),
            }),
            _ => extract_text(&text),
        }
    }
}

impl SuggestionProvider for RemoteProvider {
    fn model(&self) -> ProviderModel {
        ProviderModel::Remote
    }

    fn suggest<'a>(&'a self, request: &'a SuggestionRequest) -> BoxFuture<'a, Vec<Suggestion>> {
        Box::pin(self.fetch_suggestions(request))
    }
}
