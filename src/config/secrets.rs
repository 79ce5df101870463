//! Secret storage
//!
//! Secrets come from a `KEY=VALUE` file in the secrets directory and from
//! `CLIMATE_`-prefixed environment variables; the environment wins.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ClimateError, Result};

/// Name of the secrets file inside the secrets directory
pub const SECRETS_FILE: &str = ".secrets";
/// Prefix marking environment variables as secrets
pub const ENV_PREFIX: &str = "CLIMATE_";
/// Default number of clear characters kept by [`SecretsManager::mask`]
pub const DEFAULT_VISIBLE_CHARS: usize = 4;

/// `~/.climate-analyzer`, or `.climate-analyzer` when there is no home directory
#[must_use]
pub fn default_secrets_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".climate-analyzer")
}

fn parse_secrets(content: &str) -> impl Iterator<Item = (String, String)> + '_ {
    content.lines().filter_map(|line| {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }
        let (key, value) = line.split_once('=')?;
        Some((key.trim().to_string(), value.trim().to_string()))
    })
}

/// In-memory view of the configured secrets
#[derive(Clone, Default)]
pub struct SecretsManager {
    secrets_dir: PathBuf,
    secrets: BTreeMap<String, String>,
}

impl std::fmt::Debug for SecretsManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretsManager")
            .field("secrets_dir", &self.secrets_dir)
            .field("keys", &self.secrets.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl SecretsManager {
    /// Load secrets from `secrets_dir` (default [`default_secrets_dir`]) and the process environment
    pub fn new(secrets_dir: Option<PathBuf>) -> Result<Self> {
        Self::with_env(secrets_dir, std::env::vars())
    }

    /// Load secrets from `secrets_dir` and the given environment variables
    pub fn with_env<I>(secrets_dir: Option<PathBuf>, env: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let secrets_dir = secrets_dir.unwrap_or_else(default_secrets_dir);
        let mut secrets = BTreeMap::new();

        let secrets_file = secrets_dir.join(SECRETS_FILE);
        if secrets_file.is_file() {
            let content = fs::read_to_string(&secrets_file).map_err(|e| {
                ClimateError::io_with_source(&secrets_file, "Failed to read secrets file", e)
            })?;
            secrets.extend(parse_secrets(&content));
        }

        secrets.extend(env.into_iter().filter_map(|(key, value)| {
            key.strip_prefix(ENV_PREFIX)
                .map(|stripped| (stripped.to_string(), value))
        }));

        log::debug!("Loaded {} secrets", secrets.len());
        Ok(Self {
            secrets_dir,
            secrets,
        })
    }

    /// Directory holding the secrets file
    #[must_use]
    pub fn secrets_dir(&self) -> &Path {
        &self.secrets_dir
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.secrets.get(key).map(String::as_str)
    }

    /// A secret that must be present
    pub fn require(&self, key: &str) -> Result<&str> {
        self.get(key)
            .ok_or_else(|| ClimateError::MissingSecret(key.to_string()).into())
    }

    /// Set a secret for this process only
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.secrets.insert(key.into(), value.into());
    }

    /// Whether every key is present; missing keys are logged
    pub fn validate_all<S: AsRef<str>>(&self, required_keys: &[S]) -> bool {
        let missing: Vec<&str> = required_keys
            .iter()
            .map(AsRef::as_ref)
            .filter(|key| !self.secrets.contains_key(*key))
            .collect();
        if missing.is_empty() {
            true
        } else {
            log::error!("Missing required secrets: {missing:?}");
            false
        }
    }

    /// Keep the first `visible_chars` characters and star out the rest
    #[must_use]
    pub fn mask(value: &str, visible_chars: usize) -> String {
        let len = value.chars().count();
        if len <= visible_chars {
            return "*".repeat(len);
        }
        value
            .chars()
            .take(visible_chars)
            .chain(std::iter::repeat_n('*', len - visible_chars))
            .collect()
    }
}
