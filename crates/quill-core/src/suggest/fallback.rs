//! Deterministic suggestions used when no provider yields anything usable.

use super::{Position, ProviderModel, Suggestion, SuggestionMetadata, SuggestionType};
use crate::util::char_len;

pub const STYLE_FALLBACK_TEXT: &str =
    "Consider enhancing this description with more sensory details.";
pub const CHARACTER_FALLBACK_TEXT: &str =
    "Try incorporating more character emotions and reactions here.";

/// Two generic suggestions spanning the whole content. Pure, no I/O.
pub fn fallback_suggestions(content: &str) -> Vec<Suggestion> {
    let metadata = SuggestionMetadata {
        position: Position::new(0, char_len(content)),
        context: content.to_string(),
        original_text: content.to_string(),
    };

    vec![
        Suggestion::new(
            STYLE_FALLBACK_TEXT,
            SuggestionType::Style,
            "Style Improvement",
            0.9,
            ProviderModel::Remote,
            metadata.clone(),
        ),
        Suggestion::new(
            CHARACTER_FALLBACK_TEXT,
            SuggestionType::Character,
            "Character Development",
            0.85,
            ProviderModel::Local,
            metadata,
        ),
    ]
}

/// Whether a suggestion came out of [`fallback_suggestions`]
pub fn is_fallback(suggestion: &Suggestion) -> bool {
    suggestion.text == STYLE_FALLBACK_TEXT || suggestion.text == CHARACTER_FALLBACK_TEXT
}
