//! Suggestion engine for Quill.
//!
//! Wires the remote and local providers into a single call that always
//! resolves to a ranked list.

pub mod analysis;
pub mod engine;
pub mod error;
pub mod prompts;
pub mod providers;

pub use analysis::Analysis;
pub use engine::{HealthReport, PerformanceMetrics, SuggestionEngine, SuggestionResponse};
pub use error::{ErrorKind, ProviderError};
