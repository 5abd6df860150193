//! Provider adapters behind [`quill_core::SuggestionProvider`].

pub mod local;
pub mod remote;

pub use local::{EntitySpan, WorkerProvider};
pub use remote::RemoteProvider;
