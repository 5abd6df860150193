//! Specialised editorial passes built on the general suggestion call.
//!
//! Each preset contributes a focus directive for the remote prompt and may
//! narrow the ranked result to one suggestion type. Spans are always located
//! in the author's text, never in the directive.

use quill_core::suggest::{SuggestionType, WritingFormat};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Analysis {
    RewriteDialogue { format: WritingFormat },
    AdaptGenre { genre: String },
    CharacterArc { character: String },
    PlotHoles,
    Summarize,
    ThemeConsistency,
    Foreshadowing,
    MotivationStakes,
    SceneBreakdown,
    GenreCliches { genre: String },
    AudienceTone { audience: String },
    RevisionReview { previous_draft: String },
    Ask { question: String },
    TitleLogline,
    ConvertFormat { from: WritingFormat, to: WritingFormat },
}

impl Analysis {
    /// Stable name used in logs and by the CLI
    pub fn name(&self) -> &'static str {
        match self {
            Analysis::RewriteDialogue { .. } => "rewrite-dialogue",
            Analysis::AdaptGenre { .. } => "adapt-genre",
            Analysis::CharacterArc { .. } => "character-arc",
            Analysis::PlotHoles => "plot-holes",
            Analysis::Summarize => "summarize",
            Analysis::ThemeConsistency => "theme-consistency",
            Analysis::Foreshadowing => "foreshadowing",
            Analysis::MotivationStakes => "motivation-stakes",
            Analysis::SceneBreakdown => "scene-breakdown",
            Analysis::GenreCliches { .. } => "genre-cliches",
            Analysis::AudienceTone { .. } => "audience-tone",
            Analysis::RevisionReview { .. } => "revision-review",
            Analysis::Ask { .. } => "ask",
            Analysis::TitleLogline => "title-logline",
            Analysis::ConvertFormat { .. } => "convert-format",
        }
    }

    /// Format the content is presented as
    pub fn format(&self) -> WritingFormat {
        match self {
            Analysis::RewriteDialogue { format } => *format,
            Analysis::ConvertFormat { to, .. } => *to,
            _ => WritingFormat::Novel,
        }
    }

    pub fn focus(&self) -> String {
        match self {
            Analysis::RewriteDialogue { .. } => {
                "Rewrite the dialogue so it sounds natural and reveals character.".to_string()
            }
            Analysis::AdaptGenre { genre } => format!("Rewrite for genre: {}", genre),
            Analysis::CharacterArc { character } => {
                format!("Analyze the arc of character \"{}\".", character)
            }
            Analysis::PlotHoles => "Find plot holes or inconsistencies.".to_string(),
            Analysis::Summarize => "Summarize the content.".to_string(),
            Analysis::ThemeConsistency => "Analyze theme consistency.".to_string(),
            Analysis::Foreshadowing => {
                "Detect missed foreshadowing opportunities and suggest narrative hints.".to_string()
            }
            Analysis::MotivationStakes => {
                "Evaluate character motivations and story stakes, flag unclear or weak elements."
                    .to_string()
            }
            Analysis::SceneBreakdown => {
                "Segment content into scenes, assess pacing, and recommend adjustments.".to_string()
            }
            Analysis::GenreCliches { genre } => format!(
                "Warn about overused tropes/clichés in {} and suggest alternatives.",
                genre
            ),
            Analysis::AudienceTone { audience } => {
                format!("Adapt content to match the tone for {} audience.", audience)
            }
            Analysis::RevisionReview { previous_draft } => format!(
                "Analyze changes between drafts and recommend targeted improvements. Previous draft:\n\"{}\"",
                previous_draft
            ),
            Analysis::Ask { question } => {
                format!("Answer as an expert editor: {}", question)
            }
            Analysis::TitleLogline => {
                "Propose creative titles, loglines and an elevator pitch, each tied to a passage."
                    .to_string()
            }
            Analysis::ConvertFormat { from, to } => format!(
                "Convert this from {} to {} format.",
                from.as_str(),
                to.as_str()
            ),
        }
    }

    /// Only suggestions of this type are kept
    pub fn type_filter(&self) -> Option<SuggestionType> {
        match self {
            Analysis::RewriteDialogue { .. } => Some(SuggestionType::Dialogue),
            Analysis::CharacterArc { .. } => Some(SuggestionType::Character),
            Analysis::PlotHoles => Some(SuggestionType::Plot),
            _ => None,
        }
    }
}
