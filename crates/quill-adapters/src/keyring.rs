//! Where the remote API key is kept between runs.
//!
//! The key goes into the system keychain as a bare string. A local
//! `credentials.json` takes over when the keychain is switched off
//! (`QUILL_DISABLE_KEYRING=1`, test builds) or when that file already holds
//! a key, so headless machines never see a keychain prompt.

use crate::config::{create_private_dir, write_private_file};
use keyring::Entry;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

const KEYCHAIN_SERVICE: &str = "quill";
const KEYCHAIN_ACCOUNT: &str = "remote-api-key";

static KEYCHAIN_WARNED: AtomicBool = AtomicBool::new(false);

#[derive(Debug, Default, Serialize, Deserialize)]
struct CredentialsFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    api_key: Option<String>,
}

/// Backend holding the API key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialStore {
    Keychain,
    File(PathBuf),
}

impl CredentialStore {
    /// Pick the backend for this process
    pub fn detect() -> Self {
        let file = credentials_file_path();
        let keychain_off = cfg!(test)
            || std::env::var("QUILL_DISABLE_KEYRING")
                .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false);

        match file {
            Some(path) if keychain_off || matches!(read_file_key(&path), Ok(Some(_))) => {
                CredentialStore::File(path)
            }
            None if keychain_off => {
                CredentialStore::File(std::env::temp_dir().join("quill-credentials.json"))
            }
            _ => CredentialStore::Keychain,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CredentialStore::Keychain => "system keychain",
            CredentialStore::File(_) => "local credentials file",
        }
    }

    pub fn read(&self) -> Result<Option<String>, String> {
        let key = match self {
            CredentialStore::Keychain => match keychain_entry()?.get_password() {
                Ok(key) => Some(key),
                Err(keyring::Error::NoEntry) => None,
                Err(err) => return Err(err.to_string()),
            },
            CredentialStore::File(path) => read_file_key(path)?,
        };
        Ok(key.filter(|k| !k.trim().is_empty()))
    }

    pub fn write(&self, key: &str) -> Result<(), String> {
        let key = key.trim();
        if key.is_empty() {
            return Err("API key is empty".to_string());
        }
        match self {
            CredentialStore::Keychain => keychain_entry()?
                .set_password(key)
                .map_err(|e| e.to_string()),
            CredentialStore::File(path) => write_file_key(path, key),
        }
    }
}

fn keychain_entry() -> Result<Entry, String> {
    Entry::new(KEYCHAIN_SERVICE, KEYCHAIN_ACCOUNT).map_err(|e| e.to_string())
}

/// `QUILL_CREDENTIALS_FILE`, else `<config_dir>/quill/credentials.json`
fn credentials_file_path() -> Option<PathBuf> {
    std::env::var("QUILL_CREDENTIALS_FILE")
        .ok()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
        .or_else(|| dirs::config_dir().map(|p| p.join("quill").join("credentials.json")))
}

fn read_file_key(path: &Path) -> Result<Option<String>, String> {
    let json = match fs::read_to_string(path) {
        Ok(json) => json,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(format!("Failed to read '{}': {}", path.display(), e)),
    };
    serde_json::from_str::<CredentialsFile>(&json)
        .map(|file| file.api_key)
        .map_err(|e| format!("Failed to parse '{}': {}", path.display(), e))
}

fn write_file_key(path: &Path, key: &str) -> Result<(), String> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        create_private_dir(dir).map_err(|e| format!("Failed to create '{}': {}", dir.display(), e))?;
    }
    let json = serde_json::to_string(&CredentialsFile {
        api_key: Some(key.to_string()),
    })
    .map_err(|e| e.to_string())?;
    write_private_file(path, &json).map_err(|e| format!("Failed to write '{}': {}", path.display(), e))
}

/// Label of the backend in use, for CLI messages
pub fn credentials_store_label() -> &'static str {
    CredentialStore::detect().label()
}

/// Log a keychain failure once per process
pub fn warn_keychain_error_once(context: &str, err: &str) {
    if KEYCHAIN_WARNED.swap(true, Ordering::Relaxed) {
        return;
    }
    tracing::warn!(
        context,
        error = err,
        "couldn't access system keychain; set GOOGLE_AI_API_KEY or QUILL_DISABLE_KEYRING=1 to bypass it"
    );
}

pub fn get_api_key() -> Result<Option<String>, String> {
    CredentialStore::detect().read()
}

pub fn set_api_key(key: &str) -> Result<(), String> {
    CredentialStore::detect().write(key)
}
