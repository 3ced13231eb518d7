//! Configuration file management.
//!
//! Handles reading and validating `.coffer.toml`. Every section is
//! optional; a missing file yields the defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::constants;
use crate::core::owners::Owner;
use crate::error::{ConfigError, Result};

/// Project configuration stored in `.coffer.toml`.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub gpg: GpgConfig,
    #[serde(default)]
    pub age: AgeConfig,
    #[serde(default)]
    pub process: ProcessConfig,
    /// Owners every envelope is encrypted for, in order.
    ///
    /// When empty, the owners already stored in an envelope are kept.
    #[serde(default)]
    pub owners: Vec<Owner>,
}

/// `[gpg]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GpgConfig {
    /// Executable used for the gpg method
    #[serde(default = "default_gpg_program")]
    pub program: String,
}

impl Default for GpgConfig {
    fn default() -> Self {
        Self {
            program: default_gpg_program(),
        }
    }
}

/// `[age]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgeConfig {
    /// Identity files searched when unwrapping (`~/` is expanded)
    #[serde(default)]
    pub identities: Vec<PathBuf>,
}

/// `[process]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProcessConfig {
    /// Deadline for each wrap/unwrap subprocess
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_gpg_program() -> String {
    constants::DEFAULT_GPG_PROGRAM.to_string()
}

fn default_timeout_secs() -> u64 {
    constants::DEFAULT_TIMEOUT_SECS
}

impl Config {
    /// Load configuration from `path`, or the defaults if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ReadFile` or `ConfigError::Parse` if the file
    /// exists but cannot be read or parsed, and a validation error if its
    /// contents are invalid.
    pub fn load(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "loading config");

        if !path.exists() {
            debug!("no config file, using defaults");
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        debug!(
            owners = config.owners.len(),
            identities = config.age.identities.len(),
            "config loaded"
        );

        config.validate()?;
        Ok(config)
    }

    /// Subprocess deadline.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.process.timeout_secs)
    }

    /// Validate the configuration contents.
    ///
    /// Checks:
    /// - the gpg program is not empty
    /// - the timeout is positive
    /// - every owner names at least one method
    /// - method names are lowercase ASCII letters, digits, or `-`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` on the first violation.
    pub fn validate(&self) -> Result<()> {
        if self.gpg.program.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "gpg.program",
                reason: "must not be empty".to_string(),
            }
            .into());
        }

        if self.process.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "process.timeout_secs",
                reason: "must be greater than zero".to_string(),
            }
            .into());
        }

        validate_owners(&self.owners)
    }
}

/// Validate an owner list.
///
/// # Errors
///
/// Returns `ConfigError::InvalidValue` naming the first offending owner.
pub fn validate_owners(owners: &[Owner]) -> Result<()> {
    for (i, owner) in owners.iter().enumerate() {
        if owner.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "owners",
                reason: format!("owner #{} names no method", i + 1),
            }
            .into());
        }
        for method in owner.keys() {
            if !is_valid_method_name(method) {
                return Err(ConfigError::InvalidValue {
                    field: "owners",
                    reason: format!(
                        "owner #{} has invalid method name {:?}: only a-z, 0-9 and '-' are allowed",
                        i + 1,
                        method
                    ),
                }
                .into());
            }
        }
    }
    Ok(())
}

fn is_valid_method_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}
