//! Core domain model and contracts for Quill.

pub mod protocol;
pub mod suggest;
pub mod util;

pub use protocol::*;
