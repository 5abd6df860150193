//! Parser for free-text provider replies.
//!
//! The remote provider is asked to answer in blocks separated by blank lines,
//! each carrying three labelled lines:
//!
//! ```text
//! Type: DIALOGUE
//! Original text: quick brown fox
//! Improved version: swift auburn fox
//! ```
//!
//! Labels are matched case-insensitively and in any order. A block missing a
//! field, or whose original text cannot be found in the document, is skipped.
//! Nothing in here is allowed to fail the whole reply.

use super::fallback::fallback_suggestions;
use super::{
    Position, ProviderModel, Suggestion, SuggestionMetadata, SuggestionType, REMOTE_CONFIDENCE,
};
use crate::util::{char_len, context_window, find_char_offset, truncate, CONTEXT_RADIUS};
use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

pub const REMOTE_CATEGORY: &str = "Gemini Suggestion";

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("field pattern failed to compile: {0}")]
    Pattern(#[from] regex::Error),
}

struct FieldPatterns {
    kind: Regex,
    original: Regex,
    improved: Regex,
}

impl FieldPatterns {
    fn compile() -> Result<Self, regex::Error> {
        // Leading list markers, quote markers and bold markers are tolerated.
        let label = |name: &str| Regex::new(&format!(r"(?i)^[\s>*#.)\-\d]*{}\s*:\s*(.*)$", name));
        Ok(Self {
            kind: label("type")?,
            original: label(r"original\s+text")?,
            improved: label(r"improved\s+version")?,
        })
    }
}

static FIELD_PATTERNS: OnceLock<Result<FieldPatterns, regex::Error>> = OnceLock::new();

fn field_patterns() -> Result<&'static FieldPatterns, ParseError> {
    FIELD_PATTERNS
        .get_or_init(FieldPatterns::compile)
        .as_ref()
        .map_err(|e| ParseError::Pattern(e.clone()))
}

/// One labelled block, before anchoring
#[derive(Debug, PartialEq)]
struct RawBlock<'a> {
    kind: &'a str,
    original: &'a str,
    improved: &'a str,
}

/// Parse a provider reply into anchored suggestions.
///
/// Never fails: an internal error yields the fallback set for `content`.
pub fn parse_response(raw: &str, content: &str) -> Vec<Suggestion> {
    match parse_blocks(raw, content) {
        Ok(suggestions) => {
            tracing::debug!(count = suggestions.len(), "parsed provider reply");
            suggestions
        }
        Err(err) => {
            tracing::warn!(error = %err, "provider reply could not be parsed, using fallback");
            fallback_suggestions(content)
        }
    }
}

/// Parse every complete, locatable block. Skipped blocks are not errors.
pub fn parse_blocks(raw: &str, content: &str) -> Result<Vec<Suggestion>, ParseError> {
    let patterns = field_patterns()?;
    let mut suggestions = Vec::new();

    for block in split_blocks(raw) {
        let Some(fields) = read_block(&block, patterns) else {
            tracing::debug!(block = %truncate(&block.join(" "), 80), "skipping incomplete block");
            continue;
        };
        let Some((original, start)) = locate(fields.original, content) else {
            tracing::debug!(
                original = %truncate(fields.original, 80),
                "original text not found in content"
            );
            continue;
        };

        // `original` occurs at `start`, so the span lies inside the content.
        let end = start + char_len(original);
        let position = Position::new(start, end);

        suggestions.push(Suggestion::new(
            fields.improved,
            SuggestionType::from_token(fields.kind.trim_end_matches('.')),
            REMOTE_CATEGORY,
            REMOTE_CONFIDENCE,
            ProviderModel::Remote,
            SuggestionMetadata {
                position,
                context: context_window(content, start, end, CONTEXT_RADIUS),
                original_text: original.to_string(),
            },
        ));
    }

    Ok(suggestions)
}

/// Group non-blank lines into blocks. Code fence lines act as separators.
fn split_blocks(raw: &str) -> Vec<Vec<&str>> {
    let mut blocks = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in raw.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with("```") {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
            continue;
        }
        current.push(trimmed);
    }
    if !current.is_empty() {
        blocks.push(current);
    }

    blocks
}

fn read_block<'a>(lines: &[&'a str], patterns: &FieldPatterns) -> Option<RawBlock<'a>> {
    Some(RawBlock {
        kind: first_field(lines, &patterns.kind)?,
        original: first_field(lines, &patterns.original)?,
        improved: first_field(lines, &patterns.improved)?,
    })
}

/// Value of the first line matching `pattern`, if non-empty
fn first_field<'a>(lines: &[&'a str], pattern: &Regex) -> Option<&'a str> {
    let value = lines
        .iter()
        .find_map(|line| pattern.captures(line).and_then(|c| c.get(1)))?
        .as_str();
    let value = value.trim().trim_matches('*').trim();
    (!value.is_empty()).then_some(value)
}

/// Find the original text in the content, retrying without wrapping quotes or brackets.
fn locate<'a>(original: &'a str, content: &str) -> Option<(&'a str, usize)> {
    let mut candidate = original;
    loop {
        if let Some(start) = find_char_offset(content, candidate) {
            return Some((candidate, start));
        }
        let unwrapped = unwrap_once(candidate)?;
        if unwrapped.is_empty() {
            return None;
        }
        candidate = unwrapped;
    }
}

fn unwrap_once(s: &str) -> Option<&str> {
    const PAIRS: [(char, char); 4] = [('"', '"'), ('\u{201C}', '\u{201D}'), ('[', ']'), ('\'', '\'')];
    let mut chars = s.chars();
    let first = chars.next()?;
    let last = chars.next_back()?;
    PAIRS
        .iter()
        .find(|(open, close)| *open == first && *close == last)
        .map(|_| s[first.len_utf8()..s.len() - last.len_utf8()].trim())
}
