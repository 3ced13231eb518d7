//! Vault engine.
//!
//! The primary interface for coffer operations: encrypt a source file into
//! its envelope, and decrypt an envelope back to plaintext.
//!
//! Each call reads the envelope from disk, works on it in memory and (for
//! encrypt) atomically replaces it. Nothing is cached between calls.

use std::path::Path;

use tracing::{debug, warn};

use crate::core::cipher::{Context, Registry};
use crate::core::config::{self, Config};
use crate::core::crypto::{self, DataKey};
use crate::core::envelope::{self, Vault};
use crate::core::fsutil;
use crate::core::ordered::OrderedMap;
use crate::core::owners::{self, Owner};
use crate::core::paths;
use crate::error::{ConfigError, Error, Failures, Result, UnwrapError, WrapError};

/// What [`Engine::encrypt`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The envelope already held the current plaintext for the current
    /// owners; the file was not touched.
    Unchanged,
    /// A new data key was generated and the envelope rewritten.
    Rekeyed,
}

/// Why an envelope is being rekeyed.
#[derive(Debug, Clone, Copy)]
enum Reason {
    Empty,
    OwnersChanged,
    Stale,
}

/// Encrypts and decrypts envelopes using a registry of wrap methods.
#[derive(Debug)]
pub struct Engine {
    registry: Registry,
    ctx: Context,
}

impl Engine {
    pub fn new(registry: Registry) -> Self {
        Self {
            registry,
            ctx: Context::new(),
        }
    }

    /// Engine with the built-in methods and the configured subprocess deadline.
    pub fn from_config(config: &Config) -> Self {
        Self::new(Registry::from_config(config))
            .with_context(Context::new().with_timeout(config.timeout()))
    }

    /// Apply a deadline/cancellation context to every subprocess.
    pub fn with_context(mut self, ctx: Context) -> Self {
        self.ctx = ctx;
        self
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encrypt the source file for `owners`.
    ///
    /// `path` may name either the source or its envelope. If the envelope
    /// already holds the same plaintext for the same owners, nothing is
    /// written and [`Outcome::Unchanged`] is returned.
    ///
    /// # Errors
    ///
    /// Returns an error if a file cannot be read or written, the existing
    /// envelope is malformed, or wrapping fails for any method.
    pub fn encrypt(&self, path: &Path, owners: &[Owner]) -> Result<Outcome> {
        self.encrypt_for(path, Some(owners))
    }

    /// Encrypt the source file for the owners already listed in its envelope.
    ///
    /// # Errors
    ///
    /// As [`Engine::encrypt`]; additionally `ConfigError::NoOwners` if the
    /// envelope lists no owners.
    pub fn encrypt_with_stored_owners(&self, path: &Path) -> Result<Outcome> {
        self.encrypt_for(path, None)
    }

    fn encrypt_for(&self, path: &Path, owners: Option<&[Owner]>) -> Result<Outcome> {
        let paths = paths::resolve(path);

        let mut vault = load(&paths.envelope)?.unwrap_or_default();
        let source = std::fs::read(&paths.source).map_err(|source| Error::Read {
            path: paths.source.clone(),
            source,
        })?;

        let owners: Vec<Owner> = match owners {
            Some(owners) => owners.to_vec(),
            None => vault.owners.clone(),
        };
        if owners.is_empty() {
            return Err(ConfigError::NoOwners.into());
        }
        config::validate_owners(&owners)?;

        let checksum = owners::checksum(&owners);

        let reason = if vault.data.is_empty() {
            Reason::Empty
        } else if checksum != vault.owners_checksum {
            Reason::OwnersChanged
        } else if self.is_fresh(&vault, &source) {
            debug!(path = %paths.envelope.display(), "envelope is up to date");
            return Ok(Outcome::Unchanged);
        } else {
            Reason::Stale
        };
        debug!(path = %paths.envelope.display(), ?reason, "rekeying");

        let key = DataKey::generate();
        vault.ciphers = self.wrap_all(&key, &owners)?;
        vault.owners_checksum = checksum;
        vault.owners = owners;
        vault.data = crypto::seal(&source, &key)?;

        let bytes = envelope::marshal(&vault)?;
        if self.ctx.is_cancelled() {
            debug!(path = %paths.envelope.display(), "cancelled before write");
            return Err(WrapError::Cancelled.into());
        }
        fsutil::write_atomic(&paths.envelope, &bytes).map_err(|source| Error::Write {
            path: paths.envelope.clone(),
            source,
        })?;

        debug!(
            path = %paths.envelope.display(),
            ciphers = vault.ciphers.len(),
            bytes = bytes.len(),
            "envelope written"
        );
        Ok(Outcome::Rekeyed)
    }

    /// Decrypt the envelope for `path` and return the plaintext.
    ///
    /// # Errors
    ///
    /// Returns `Error::Read`/`Error::Parse` for a missing or malformed
    /// envelope, `Error::Unwrap` if no method could recover the data key,
    /// and `Error::Crypto` if the payload fails authentication.
    pub fn decrypt(&self, path: &Path) -> Result<Vec<u8>> {
        let paths = paths::resolve(path);

        let bytes = std::fs::read(&paths.envelope).map_err(|source| Error::Read {
            path: paths.envelope.clone(),
            source,
        })?;
        let vault = envelope::unmarshal(&bytes).map_err(|source| Error::Parse {
            path: paths.envelope.clone(),
            source,
        })?;

        let key = self.recover_key(&vault)?;
        let plaintext = crypto::open(&vault.data, &key)?;

        debug!(path = %paths.envelope.display(), bytes = plaintext.len(), "decrypted");
        Ok(plaintext)
    }

    /// Try every wrapped key in stored order and return the first data key
    /// that unwraps.
    ///
    /// Methods without a registered implementation are recorded as
    /// unsupported and skipped.
    ///
    /// # Errors
    ///
    /// Returns `UnwrapError::Exhausted` with every per-method failure if no
    /// method succeeds, or `UnwrapError::Cancelled` once the context is
    /// cancelled.
    pub fn recover_key(&self, vault: &Vault) -> std::result::Result<DataKey, UnwrapError> {
        let mut failures = Vec::new();

        for (name, blob) in vault.ciphers.iter() {
            if self.ctx.is_cancelled() {
                return Err(UnwrapError::Cancelled);
            }
            let Some(method) = self.registry.get(name) else {
                debug!(method = name, "no such method, skipping");
                failures.push(UnwrapError::Unsupported {
                    method: name.to_string(),
                });
                continue;
            };

            let attempt = method.unwrap(blob, &self.ctx).and_then(|text| {
                DataKey::from_encoded(&text).map_err(|_| UnwrapError::MalformedKey {
                    method: name.to_string(),
                })
            });

            match attempt {
                Ok(key) => {
                    debug!(method = name, "data key recovered");
                    return Ok(key);
                }
                Err(err) if self.ctx.is_cancelled() => {
                    debug!(method = name, error = %err, "unwrap cancelled");
                    return Err(UnwrapError::Cancelled);
                }
                Err(err) => {
                    debug!(method = name, error = %err, "unwrap failed");
                    failures.push(err);
                }
            }
        }

        Err(UnwrapError::Exhausted(Failures(failures)))
    }

    /// Whether `vault.data` decrypts to exactly `source`.
    ///
    /// Failing to check is not an error: it only means the envelope cannot
    /// be confirmed fresh, and the caller rekeys.
    fn is_fresh(&self, vault: &Vault, source: &[u8]) -> bool {
        let plaintext = self
            .recover_key(vault)
            .map_err(Error::from)
            .and_then(|key| crypto::open(&vault.data, &key).map_err(Error::from));

        match plaintext {
            Ok(plaintext) => plaintext == source,
            Err(err) => {
                debug!(error = %err, "cannot confirm envelope freshness");
                false
            }
        }
    }

    /// Wrap `key` once per method for that method's recipients.
    fn wrap_all(
        &self,
        key: &DataKey,
        owners: &[Owner],
    ) -> std::result::Result<OrderedMap<Vec<u8>>, WrapError> {
        let grouped = owners::recipients_by_method(owners);
        if grouped.is_empty() {
            return Err(WrapError::NoRecipients);
        }

        let encoded = key.encoded();
        let mut ciphers = OrderedMap::new();

        for (name, recipients) in grouped.iter() {
            if self.ctx.is_cancelled() {
                return Err(WrapError::Cancelled);
            }
            let method = self
                .registry
                .get(name)
                .ok_or_else(|| WrapError::UnknownMethod {
                    method: name.to_string(),
                })?;

            debug!(method = name, recipients = recipients.len(), "wrapping data key");
            let blob = method.wrap(&encoded, recipients, &self.ctx).map_err(|err| {
                if self.ctx.is_cancelled() {
                    WrapError::Cancelled
                } else {
                    err
                }
            })?;

            if contains(&blob, &encoded) || contains(&blob, key.as_bytes()) {
                warn!(method = name, "wrapped key contains the plaintext key");
                return Err(WrapError::PlaintextLeak {
                    method: name.to_string(),
                });
            }

            ciphers.insert(name, blob);
        }

        Ok(ciphers)
    }
}

/// Read and parse an envelope, treating a missing or blank file as absent.
fn load(path: &Path) -> Result<Option<Vault>> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no envelope yet");
            return Ok(None);
        }
        Err(source) => {
            return Err(Error::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    if bytes.trim_ascii().is_empty() {
        debug!(path = %path.display(), "envelope is blank");
        return Ok(None);
    }

    let vault = envelope::unmarshal(&bytes).map_err(|source| Error::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Some(vault))
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    !needle.is_empty() && haystack.windows(needle.len()).any(|w| w == needle)
}
