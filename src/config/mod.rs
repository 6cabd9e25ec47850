//! Configuration management.
//!
//! Everything lives in a **base directory**, `./data` by default or
//! `./test-data` in test mode:
//!
//! - `config.toml`: which folder holds the documents and which deck they sync to
//! - `credentials.toml`: the Mochi API token
//!
//! ```toml
//! # config.toml
//! [sync]
//! path = "cards"
//! deck_id = "AbCdEf12"
//! on_missing_remote = "fail"   # or "recreate"
//! ```
//!
//! Run flags are carried in an explicit [`Settings`] value rather than global
//! state.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::mochi::DEFAULT_API_URL;
use crate::sync::MissingRemotePolicy;

/// Base directory used when nothing else is given.
pub const DEFAULT_BASE: &str = "./data";
/// Base directory used in test mode.
pub const TEST_BASE: &str = "./test-data";

pub const CONFIG_FILE: &str = "config.toml";
pub const CREDENTIALS_FILE: &str = "credentials.toml";

/// Environment variable holding the API token when no credentials file exists.
pub const TOKEN_ENV: &str = "MOCHI_TOKEN";

/// Flags of one invocation that decide where configuration is read from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    /// Explicit base directory (`--base` or `CARDS_BASE`).
    pub base: Option<PathBuf>,
    /// Test mode (`--test`): use the test base directory.
    pub test: bool,
}

impl Settings {
    /// Resolve the base directory.
    ///
    /// Priority:
    /// 1. Explicit base directory
    /// 2. `./test-data` in test mode
    /// 3. `./data`
    #[must_use]
    pub fn base_dir(&self) -> PathBuf {
        match &self.base {
            Some(base) => base.clone(),
            None if self.test => PathBuf::from(TEST_BASE),
            None => PathBuf::from(DEFAULT_BASE),
        }
    }
}

/// Contents of `config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Config {
    pub sync: SyncConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SyncConfig {
    /// Document folder, relative to the base directory.
    pub path: PathBuf,
    pub deck_id: String,
    #[serde(default)]
    pub on_missing_remote: MissingRemotePolicy,
    #[serde(default = "default_api_url")]
    pub api_url: String,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

impl Config {
    /// Load `config.toml` from `base`.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the file is missing and `Toml` if it does not parse.
    pub fn load(base: &Path) -> Result<Self> {
        let path = base.join(CONFIG_FILE);
        if !path.is_file() {
            return Err(Error::Config(format!("No {CONFIG_FILE} found in {}", base.display())));
        }
        let content = fs::read_to_string(&path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {e}", path.display())))?;
        let config: Self = toml::from_str(&content)?;
        debug!(path = %path.display(), deck_id = %config.sync.deck_id, "loaded config");
        Ok(config)
    }

    /// Folder holding the documents.
    #[must_use]
    pub fn documents_root(&self, base: &Path) -> PathBuf {
        base.join(&self.sync.path)
    }
}

/// Contents of `credentials.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    pub mochi: MochiCredentials,
}

#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct MochiCredentials {
    pub token: String,
}

impl std::fmt::Debug for MochiCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MochiCredentials").field("token", &"<redacted>").finish()
    }
}

impl Credentials {
    /// Resolve credentials for `base`.
    ///
    /// Priority:
    /// 1. `<base>/credentials.toml`
    /// 2. `MOCHI_TOKEN` environment variable
    /// 3. `~/.cards/credentials.toml`
    ///
    /// # Errors
    ///
    /// Returns `Config` if none of these provide a token.
    pub fn load(base: &Path) -> Result<Self> {
        let env_token = std::env::var(TOKEN_ENV).ok().filter(|t| !t.is_empty());
        Self::resolve(base, env_token, global_credentials_path().as_deref())
    }

    fn resolve(base: &Path, env_token: Option<String>, global: Option<&Path>) -> Result<Self> {
        let local = base.join(CREDENTIALS_FILE);
        if local.is_file() {
            return Self::read(&local);
        }
        if let Some(token) = env_token {
            debug!("using token from {TOKEN_ENV}");
            return Ok(Self {
                mochi: MochiCredentials { token },
            });
        }
        if let Some(global) = global.filter(|path| path.is_file()) {
            return Self::read(global);
        }
        Err(Error::Config(format!(
            "No Mochi token: create {} or set {TOKEN_ENV}",
            local.display()
        )))
    }

    fn read(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {e}", path.display())))?;
        debug!(path = %path.display(), "loaded credentials");
        Ok(toml::from_str(&content)?)
    }
}

/// Per-user credentials file, shared by every base directory.
#[must_use]
pub fn global_credentials_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".cards").join(CREDENTIALS_FILE))
}
