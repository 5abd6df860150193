//! Configuration management for quill
//!
//! Stores settings in ~/.config/quill/config.json. Environment variables
//! override file values; the API key itself lives in the credential store.

use crate::keyring;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_REMOTE_ENDPOINT: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent";

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_WORKER_TIMEOUT_SECS: u64 = 45;
const DEFAULT_PROVIDER_DEADLINE_SECS: u64 = 60;

const API_KEY_ENV: &str = "GOOGLE_AI_API_KEY";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// `generateContent`-style endpoint
    pub endpoint: String,
    /// Transport timeout for a single request
    pub request_timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_REMOTE_ENDPOINT.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl RemoteConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalConfig {
    pub enabled: bool,
    /// Interpreter or executable used to start the worker
    pub program: String,
    /// Worker script passed as the first argument (skipped when empty)
    pub script: PathBuf,
    /// Model directory handed to the worker via `--model_path`
    pub model_path: PathBuf,
    pub timeout_secs: u64,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            program: "python3".to_string(),
            script: PathBuf::from("scripts/setup_t5.py"),
            model_path: PathBuf::from("models/t5"),
            timeout_secs: DEFAULT_WORKER_TIMEOUT_SECS,
        }
    }
}

impl LocalConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub remote: RemoteConfig,
    pub local: LocalConfig,
    /// Upper bound on each provider call made by the engine
    pub provider_deadline_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            remote: RemoteConfig::default(),
            local: LocalConfig::default(),
            provider_deadline_secs: DEFAULT_PROVIDER_DEADLINE_SECS,
        }
    }
}

impl Config {
    /// Repair values that would make the engine misbehave
    fn sanitize(&mut self) {
        if url::Url::parse(&self.remote.endpoint).is_err() {
            tracing::warn!(
                endpoint = %self.remote.endpoint,
                "invalid remote endpoint in config, using default"
            );
            self.remote.endpoint = DEFAULT_REMOTE_ENDPOINT.to_string();
        }
        if self.remote.request_timeout_secs == 0 {
            self.remote.request_timeout_secs = DEFAULT_REQUEST_TIMEOUT_SECS;
        }
        if self.local.timeout_secs == 0 {
            self.local.timeout_secs = DEFAULT_WORKER_TIMEOUT_SECS;
        }
        if self.provider_deadline_secs == 0 {
            self.provider_deadline_secs = DEFAULT_PROVIDER_DEADLINE_SECS;
        }
        if self.local.program.trim().is_empty() {
            self.local.program = LocalConfig::default().program;
        }
    }

    pub fn provider_deadline(&self) -> Duration {
        Duration::from_secs(self.provider_deadline_secs)
    }

    /// Get the config directory path
    fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("quill"))
    }

    /// Get the config file path (`QUILL_CONFIG_FILE` wins)
    fn config_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("QUILL_CONFIG_FILE") {
            let trimmed = path.trim();
            if !trimmed.is_empty() {
                return Some(PathBuf::from(trimmed));
            }
        }
        Self::config_dir().map(|p| p.join("config.json"))
    }

    /// Load config from disk plus environment overrides, or return defaults
    pub fn load() -> Self {
        let mut config = Self::config_path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default();
        config.apply_env(|key| std::env::var(key).ok());
        config.sanitize();
        config
    }

    /// Load a specific file. Missing files give defaults; corrupt files are
    /// moved aside to `*.json.corrupt`.
    pub fn load_from(path: &Path) -> Self {
        let Ok(content) = fs::read_to_string(path) else {
            return Self::default();
        };
        match serde_json::from_str::<Config>(&content) {
            Ok(mut config) => {
                config.sanitize();
                config
            }
            Err(err) => {
                preserve_corrupt_config(path, &content);
                tracing::warn!(
                    path = %path.display(),
                    error = %err,
                    "config file was corrupted; a backup was saved and defaults were loaded"
                );
                Self::default()
            }
        }
    }

    /// Apply environment overrides through `lookup`
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(endpoint) = non_empty("QUILL_REMOTE_ENDPOINT") {
            self.remote.endpoint = endpoint;
        }
        if let Some(program) = non_empty("QUILL_WORKER_PROGRAM") {
            self.local.program = program;
        }
        if let Some(script) = non_empty("QUILL_WORKER_SCRIPT") {
            self.local.script = PathBuf::from(script);
        }
        if let Some(model_path) = non_empty("T5_MODEL_PATH") {
            self.local.model_path = PathBuf::from(model_path);
        }
        if let Some(secs) = non_empty("QUILL_PROVIDER_DEADLINE_SECS").and_then(|v| v.parse().ok()) {
            self.provider_deadline_secs = secs;
        }
    }

    /// Save config to disk
    pub fn save(&self) -> Result<(), String> {
        let mut sanitized = self.clone();
        sanitized.sanitize();
        let path =
            Self::config_path().ok_or_else(|| "Could not determine config directory".to_string())?;
        let dir = path
            .parent()
            .ok_or_else(|| "Could not determine config directory".to_string())?;

        create_private_dir(dir).map_err(|e| format!("Failed to create config directory: {}", e))?;

        let content = serde_json::to_string_pretty(&sanitized)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;
        write_private_file(&path, &content).map_err(|e| format!("Failed to write config: {}", e))?;

        Ok(())
    }

    /// Get the remote API key (credential store first, environment fallback).
    pub fn get_api_key(&self) -> Option<String> {
        match keyring::get_api_key() {
            Ok(Some(key)) => return Some(key),
            Ok(None) => {}
            Err(err) => keyring::warn_keychain_error_once("API key", &err),
        }
        std::env::var(API_KEY_ENV)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }

    /// Store the API key in the credential store
    pub fn set_api_key(&self, key: &str) -> Result<(), String> {
        keyring::set_api_key(key).map_err(|e| {
            format!(
                "Failed to store API key in {}: {}. \
                 You can set the {} environment variable instead.",
                keyring::credentials_store_label(),
                e,
                API_KEY_ENV
            )
        })
    }

    /// Get the config file location for display
    pub fn config_location() -> String {
        Self::config_path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "~/.config/quill/config.json".to_string())
    }
}

fn preserve_corrupt_config(path: &Path, content: &str) {
    let corrupt_path = path.with_extension("json.corrupt");
    if fs::rename(path, &corrupt_path).is_err() {
        let _ = fs::write(&corrupt_path, content);
    }
}

/// Create `dir` (and parents), owner-only on unix
pub(crate) fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dir)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Err(e) = fs::set_permissions(dir, fs::Permissions::from_mode(0o700)) {
            tracing::warn!(dir = %dir.display(), error = %e, "failed to restrict directory permissions");
        }
    }
    Ok(())
}

/// Replace `path` with `content` via a temp file and rename. The file is
/// owner-only on unix.
pub(crate) fn write_private_file(path: &Path, content: &str) -> std::io::Result<()> {
    let tmp_path = path.with_extension("tmp");
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(&tmp_path)?;
    file.write_all(content.as_bytes())?;
    drop(file);

    if let Err(err) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(err);
    }
    Ok(())
}
