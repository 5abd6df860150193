use crate::suggest::{ProviderModel, Suggestion, WritingFormat};
use futures::future::BoxFuture;

/// Input to one provider call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestionRequest {
    pub content: String,
    pub format: WritingFormat,
    /// Extra editorial instruction for providers that take a prompt
    pub focus: Option<String>,
}

impl SuggestionRequest {
    pub fn new(content: impl Into<String>, format: WritingFormat) -> Self {
        Self {
            content: content.into(),
            format,
            focus: None,
        }
    }

    pub fn with_focus(mut self, focus: impl Into<String>) -> Self {
        self.focus = Some(focus.into());
        self
    }

    /// Empty or whitespace-only content is never sent to a backend
    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }
}

/// A text-generation backend behind the uniform suggestion contract.
///
/// Implementations absorb their own failures: the future always resolves to
/// a list, possibly empty, possibly the fallback set.
pub trait SuggestionProvider: Send + Sync {
    fn model(&self) -> ProviderModel;

    fn suggest<'a>(&'a self, request: &'a SuggestionRequest) -> BoxFuture<'a, Vec<Suggestion>>;
}
