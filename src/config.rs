//! Runtime settings, optionally loaded from a TOML file

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::breach::DEFAULT_RANGE_ENDPOINT;
use crate::error::{ErrorCategory, ErrorKind, Result, SvpError};
use crate::kdf::DEFAULT_ITERATIONS;
use crate::passphrase::DEFAULT_MIN_PASSWORD_LEN;

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub kdf: KdfSettings,
    pub breach: BreachSettings,
    pub policy: PolicySettings,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct KdfSettings {
    /// PBKDF2 rounds. Must match between encryption and decryption.
    pub iterations: u32,
}

impl Default for KdfSettings {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct BreachSettings {
    pub enabled: bool,
    /// Range endpoint; the 5-character hash prefix is appended verbatim.
    pub endpoint: String,
    pub timeout_ms: u64,
}

impl Default for BreachSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: DEFAULT_RANGE_ENDPOINT.to_owned(),
            timeout_ms: 5_000,
        }
    }
}

impl BreachSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct PolicySettings {
    /// Minimum length, in characters, for passwords used to encrypt.
    pub min_password_length: usize,
}

impl Default for PolicySettings {
    fn default() -> Self {
        Self {
            min_password_length: DEFAULT_MIN_PASSWORD_LEN,
        }
    }
}

impl Settings {
    /// Load settings from `path`, or return the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = std::fs::read_to_string(path).map_err(|e| {
            SvpError::with_kind_and_source(
                ErrorCategory::User,
                ErrorKind::Io,
                format!("could not read config file at {}", path.display()),
                e,
            )
        })?;
        Self::from_toml(&content)
            .map_err(|e| e.with_context(format!("invalid config file {}", path.display())))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(content).map_err(|e| {
            SvpError::with_kind_and_source(
                ErrorCategory::User,
                ErrorKind::Validation,
                "failed to parse config",
                e,
            )
        })?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.kdf.iterations == 0 {
            return Err(SvpError::with_kind(
                ErrorCategory::User,
                ErrorKind::KeyDerivation,
                "kdf.iterations must be at least 1",
            ));
        }
        if self.breach.timeout_ms == 0 {
            return Err(SvpError::with_kind(
                ErrorCategory::User,
                ErrorKind::Validation,
                "breach.timeout_ms must be at least 1",
            ));
        }
        Ok(())
    }
}
