//! Local provider: a worker process per call.
//!
//! The worker is invoked as
//! `<program> [script] --inference --input=<content> --model_path=<path>` and
//! must print a JSON array of suggestion-shaped objects on stdout. Failures
//! here produce an empty list; the engine decides whether to fall back.

use crate::error::ProviderError;
use futures::future::BoxFuture;
use quill_adapters::config::LocalConfig;
use quill_adapters::util::run_command_with_timeout;
use quill_core::suggest::{
    Position, ProviderModel, Suggestion, SuggestionMetadata, SuggestionType,
    LOCAL_DEFAULT_CONFIDENCE,
};
use quill_core::util::{char_len, context_window, slice_chars, truncate, CONTEXT_RADIUS};
use quill_core::{SuggestionProvider, SuggestionRequest};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use tokio::process::Command;

pub const LOCAL_CATEGORY: &str = "Local Suggestion";

const MAX_STDERR_LEN: usize = 300;

/// One element of the worker's output array. Everything is optional so a
/// single odd element can be rejected without losing the rest.
#[derive(Debug, Deserialize)]
struct WorkerSuggestion {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    metadata: Option<WorkerMetadata>,
}

#[derive(Debug, Deserialize)]
struct WorkerMetadata {
    #[serde(default)]
    position: Option<Position>,
}

/// Named-entity span reported by the worker's `--ner` mode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySpan {
    #[serde(rename = "type")]
    pub entity_type: String,
    pub start: usize,
    pub end: usize,
}

/// Validate one worker element against the content it was produced for
fn validate_element(
    element: WorkerSuggestion,
    content: &str,
    content_len: usize,
) -> Result<Suggestion, String> {
    let text = element
        .text
        .filter(|t| !t.trim().is_empty())
        .ok_or("missing text")?;

    let position = element
        .metadata
        .and_then(|m| m.position)
        .unwrap_or(Position::new(0, content_len));
    if !position.fits(content_len) {
        return Err(format!(
            "span {}..{} outside content of length {}",
            position.start, position.end, content_len
        ));
    }

    let suggestion_type = element
        .kind
        .as_deref()
        .map(SuggestionType::from_token)
        .unwrap_or(SuggestionType::Style);
    let category = element
        .category
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(|| LOCAL_CATEGORY.to_string());

    let suggestion = Suggestion::new(
        text,
        suggestion_type,
        category,
        element.confidence.unwrap_or(LOCAL_DEFAULT_CONFIDENCE),
        ProviderModel::Local,
        SuggestionMetadata {
            position,
            context: context_window(content, position.start, position.end, CONTEXT_RADIUS),
            original_text: slice_chars(content, position.start, position.end).to_string(),
        },
    );

    Ok(match element.id.filter(|id| !id.is_empty()) {
        Some(id) => suggestion.with_id(id),
        None => suggestion,
    })
}

/// Decode worker stdout into suggestions.
///
/// The top level must be a JSON array; elements that fail validation are
/// dropped individually.
pub fn decode_worker_output(stdout: &str, content: &str) -> Result<Vec<Suggestion>, ProviderError> {
    let elements: Vec<serde_json::Value> = serde_json::from_str(stdout.trim())
        .map_err(|e| ProviderError::MalformedOutput(e.to_string()))?;

    let content_len = char_len(content);
    let mut suggestions = Vec::with_capacity(elements.len());
    for (idx, value) in elements.into_iter().enumerate() {
        let validated = serde_json::from_value::<WorkerSuggestion>(value)
            .map_err(|e| e.to_string())
            .and_then(|element| validate_element(element, content, content_len));
        match validated {
            Ok(suggestion) => suggestions.push(suggestion),
            Err(reason) => tracing::debug!(idx, %reason, "dropping worker suggestion"),
        }
    }
    Ok(suggestions)
}

/// Decode `--ner` output, dropping spans outside the content
pub fn decode_entities(stdout: &str, content: &str) -> Result<Vec<EntitySpan>, ProviderError> {
    let spans: Vec<EntitySpan> = serde_json::from_str(stdout.trim())
        .map_err(|e| ProviderError::MalformedOutput(e.to_string()))?;
    let content_len = char_len(content);
    Ok(spans
        .into_iter()
        .filter(|span| Position::new(span.start, span.end).fits(content_len))
        .collect())
}

pub struct WorkerProvider {
    config: LocalConfig,
}

impl WorkerProvider {
    pub fn new(config: LocalConfig) -> Self {
        Self { config }
    }

    fn command(&self, mode: &str, content: &str) -> Command {
        let mut command = Command::new(&self.config.program);
        if !self.config.script.as_os_str().is_empty() {
            command.arg(&self.config.script);
        }
        // `=` form: a passage opening with `-` must not read as a flag.
        let mut model_path = OsString::from("--model_path=");
        model_path.push(&self.config.model_path);
        command
            .arg(mode)
            .arg(format!("--input={}", content))
            .arg(model_path);
        command
    }

    /// Run the worker once and return its stdout on a clean exit
    async fn run(&self, mode: &str, content: &str) -> Result<String, ProviderError> {
        let mut command = self.command(mode, content);
        let result = run_command_with_timeout(&mut command, self.config.timeout())
            .await
            .map_err(ProviderError::ProcessSpawn)?;

        if result.timed_out {
            return Err(ProviderError::Timeout {
                secs: self.config.timeout_secs,
            });
        }
        if !result.success() {
            return Err(ProviderError::ProcessFailed {
                code: result.exit_code(),
                stderr: truncate(result.stderr.trim(), MAX_STDERR_LEN),
            });
        }
        if !result.stderr.trim().is_empty() {
            tracing::debug!(stderr = %truncate(result.stderr.trim(), MAX_STDERR_LEN), "worker diagnostics");
        }
        Ok(result.stdout)
    }

    /// Worker suggestions for `request`; empty on any failure.
    pub async fn fetch_suggestions(&self, request: &SuggestionRequest) -> Vec<Suggestion> {
        if !self.config.enabled || request.is_blank() {
            return Vec::new();
        }

        let outcome = self
            .run("--inference", &request.content)
            .await
            .and_then(|stdout| decode_worker_output(&stdout, &request.content));
        match outcome {
            Ok(suggestions) => suggestions,
            Err(err) => {
                tracing::warn!(kind = ?err.kind(), error = %err, "local worker failed");
                Vec::new()
            }
        }
    }

    /// Named entities in `content`; empty on any failure.
    pub async fn extract_entities(&self, content: &str) -> Vec<EntitySpan> {
        if !self.config.enabled || content.trim().is_empty() {
            return Vec::new();
        }

        let outcome = self
            .run("--ner", content)
            .await
            .and_then(|stdout| decode_entities(&stdout, content));
        match outcome {
            Ok(entities) => entities,
            Err(err) => {
                tracing::warn!(kind = ?err.kind(), error = %err, "entity extraction failed");
                Vec::new()
            }
        }
    }
}

impl SuggestionProvider for WorkerProvider {
    fn model(&self) -> ProviderModel {
        ProviderModel::Local
    }

    fn suggest<'a>(&'a self, request: &'a SuggestionRequest) -> BoxFuture<'a, Vec<Suggestion>> {
        Box::pin(self.fetch_suggestions(request))
    }
}
