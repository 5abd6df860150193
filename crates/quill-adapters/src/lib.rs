//! Runtime adapters for Quill (config, credentials, subprocess execution).

pub mod config;
pub mod keyring;
pub mod util;
