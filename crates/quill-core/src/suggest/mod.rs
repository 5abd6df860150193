//! Suggestion model for Quill
//!
//! A suggestion anchors a proposed rewrite onto a character span of the
//! submitted document. Suggestions only live for one engine call: they are
//! produced, ranked, handed back, and never mutated afterwards.

pub mod fallback;
pub mod parse;
pub mod rank;

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Confidence attached to suggestions parsed from the remote provider
pub const REMOTE_CONFIDENCE: f64 = 0.85;

/// Confidence used for worker suggestions that carry no score of their own
pub const LOCAL_DEFAULT_CONFIDENCE: f64 = 0.85;

/// Kind of suggestion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SuggestionType {
    /// Word choice, rhythm, description
    Style,
    /// Story logic and events
    Plot,
    /// Characterisation, motivation, arcs
    Character,
    /// Spoken lines
    Dialogue,
    /// Pacing, scene and chapter shape
    Structure,
}

impl SuggestionType {
    pub const ALL: [SuggestionType; 5] = [
        SuggestionType::Style,
        SuggestionType::Plot,
        SuggestionType::Character,
        SuggestionType::Dialogue,
        SuggestionType::Structure,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SuggestionType::Style => "STYLE",
            SuggestionType::Plot => "PLOT",
            SuggestionType::Character => "CHARACTER",
            SuggestionType::Dialogue => "DIALOGUE",
            SuggestionType::Structure => "STRUCTURE",
        }
    }

    /// Parse a provider token. Anything unrecognised becomes `Style`.
    pub fn from_token(token: &str) -> Self {
        let upper = token.trim().to_uppercase();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == upper)
            .unwrap_or(SuggestionType::Style)
    }
}

/// Which backend produced a suggestion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProviderModel {
    /// Network text-generation API
    Remote,
    /// Locally spawned worker process
    Local,
    /// Merged output of both
    Hybrid,
}

impl ProviderModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderModel::Remote => "REMOTE",
            ProviderModel::Local => "LOCAL",
            ProviderModel::Hybrid => "HYBRID",
        }
    }
}

/// Review state of a suggestion. The engine only ever emits `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SuggestionStatus {
    #[default]
    Pending,
    Applied,
    Rejected,
}

/// Document format the writer is working in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WritingFormat {
    #[default]
    Novel,
    Screenplay,
    GameScript,
}

impl WritingFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            WritingFormat::Novel => "NOVEL",
            WritingFormat::Screenplay => "SCREENPLAY",
            WritingFormat::GameScript => "GAME_SCRIPT",
        }
    }

    /// Lenient parse: accepts `game-script`, `Game Script`, etc. Unknown labels map to `Novel`.
    pub fn from_label(label: &str) -> Self {
        let normalized: String = label
            .trim()
            .chars()
            .map(|c| match c {
                '-' | ' ' => '_',
                other => other.to_ascii_uppercase(),
            })
            .collect();
        match normalized.as_str() {
            "SCREENPLAY" => WritingFormat::Screenplay,
            "GAME_SCRIPT" | "GAMESCRIPT" => WritingFormat::GameScript,
            _ => WritingFormat::Novel,
        }
    }
}

/// Character span `[start, end)` in the original content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub start: usize,
    pub end: usize,
}

impl Position {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Whether `0 <= start <= end <= len` holds
    pub fn fits(&self, len: usize) -> bool {
        self.start <= self.end && self.end <= len
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionMetadata {
    pub position: Position,
    /// Text surrounding the span, for display only
    pub context: String,
    /// Exact text of the content at `position`
    pub original_text: String,
}

/// A proposed change to the document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    /// Assigned by the ranking pass when the producer left it empty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub text: String,
    #[serde(rename = "type")]
    pub suggestion_type: SuggestionType,
    pub category: String,
    pub confidence: f64,
    pub model: ProviderModel,
    pub metadata: SuggestionMetadata,
    #[serde(default)]
    pub status: SuggestionStatus,
}

impl Suggestion {
    /// Build a pending suggestion. Every field except `id` is required;
    /// confidence is clamped into `[0, 1]`.
    pub fn new(
        text: impl Into<String>,
        suggestion_type: SuggestionType,
        category: impl Into<String>,
        confidence: f64,
        model: ProviderModel,
        metadata: SuggestionMetadata,
    ) -> Self {
        Self {
            id: None,
            text: text.into(),
            suggestion_type,
            category: category.into(),
            confidence: clamp_confidence(confidence),
            model,
            metadata,
            status: SuggestionStatus::Pending,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn position(&self) -> Position {
        self.metadata.position
    }
}

fn clamp_confidence(confidence: f64) -> f64 {
    if confidence.is_nan() {
        0.0
    } else {
        confidence.clamp(0.0, 1.0)
    }
}

/// Source of suggestion identifiers.
///
/// Ids only need to be unique within one returned list, so tests can swap in
/// [`SequentialIds`] and assert exact values.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

/// Random v4 UUIDs (simple hex form)
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidIds;

impl IdGenerator for UuidIds {
    fn next_id(&self) -> String {
        Uuid::new_v4().simple().to_string()
    }
}

/// Deterministic `prefix-1`, `prefix-2`, ... ids
#[derive(Debug)]
pub struct SequentialIds {
    prefix: String,
    counter: AtomicU64,
}

impl SequentialIds {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: AtomicU64::new(0),
        }
    }
}

impl Default for SequentialIds {
    fn default() -> Self {
        Self::new("s")
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{}-{}", self.prefix, n)
    }
}
