//! Age key-wrapping method.
//!
//! Wraps data keys with the age format (x25519 keys, ASCII armor) in
//! process. Unwrapping reads `AGE-SECRET-KEY-...` lines from the configured
//! identity files.

use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use ::age::x25519;
use tracing::{trace, warn};
use zeroize::Zeroizing;

use super::process::Context;
use super::Method;
use crate::error::{UnwrapError, WrapError};

const NAME: &str = "age";

/// Age method using x25519 recipients and identity files.
#[derive(Debug, Clone, Default)]
pub struct Age {
    identity_files: Vec<PathBuf>,
}

impl Age {
    pub fn new(identity_files: Vec<PathBuf>) -> Self {
        Self { identity_files }
    }

    /// Load every identity from the configured files.
    ///
    /// Missing files are skipped so one stale path does not hide the rest.
    fn identities(&self) -> Result<Vec<x25519::Identity>, UnwrapError> {
        let mut identities = Vec::new();

        for path in &self.identity_files {
            let contents = match fs::read_to_string(path) {
                Ok(contents) => Zeroizing::new(contents),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    trace!(path = %path.display(), "identity file missing");
                    continue;
                }
                Err(e) => {
                    return Err(backend_error(format!(
                        "could not read {}: {}",
                        path.display(),
                        e
                    )))
                }
            };
            check_permissions(path);

            for line in contents.lines().map(str::trim) {
                if !line.starts_with("AGE-SECRET-KEY-") {
                    continue;
                }
                let identity = line.parse::<x25519::Identity>().map_err(|e: &str| {
                    backend_error(format!("invalid identity in {}: {}", path.display(), e))
                })?;
                identities.push(identity);
            }
        }

        if identities.is_empty() {
            return Err(UnwrapError::NoIdentity {
                method: NAME.to_string(),
            });
        }
        Ok(identities)
    }
}

impl Method for Age {
    fn name(&self) -> &str {
        NAME
    }

    fn wrap(&self, key: &[u8], recipients: &[String], _: &Context) -> Result<Vec<u8>, WrapError> {
        trace!(recipients = recipients.len(), "wrapping with age");

        let parsed = recipients
            .iter()
            .map(|r| parse_recipient(r))
            .collect::<Result<Vec<_>, _>>()?;

        let encrypt_err = |e: &dyn std::fmt::Display| WrapError::Backend {
            method: NAME.to_string(),
            reason: e.to_string(),
        };

        let encryptor =
            ::age::Encryptor::with_recipients(parsed.iter().map(|r| r as &dyn ::age::Recipient))
                .map_err(|e| encrypt_err(&e))?;

        let mut blob = Vec::new();
        let armored = ::age::armor::ArmoredWriter::wrap_output(
            &mut blob,
            ::age::armor::Format::AsciiArmor,
        )
        .map_err(|e| encrypt_err(&e))?;
        let mut writer = encryptor
            .wrap_output(armored)
            .map_err(|e| encrypt_err(&e))?;

        writer.write_all(key).map_err(|e| encrypt_err(&e))?;
        writer
            .finish()
            .and_then(|armored| armored.finish())
            .map_err(|e| encrypt_err(&e))?;

        trace!(blob_len = blob.len(), "wrapped with age");
        Ok(blob)
    }

    fn unwrap(&self, blob: &[u8], _: &Context) -> Result<Zeroizing<Vec<u8>>, UnwrapError> {
        trace!(blob_len = blob.len(), "unwrapping with age");

        let identities = self.identities()?;

        let reader = ::age::armor::ArmoredReader::new(blob);
        let decryptor =
            ::age::Decryptor::new(reader).map_err(|e| backend_error(e.to_string()))?;
        let mut reader = decryptor
            .decrypt(identities.iter().map(|i| i as &dyn ::age::Identity))
            .map_err(|e| backend_error(e.to_string()))?;

        let mut key = Zeroizing::new(Vec::new());
        reader
            .read_to_end(&mut key)
            .map_err(|e| backend_error(e.to_string()))?;
        Ok(key)
    }
}

/// Parse an `age1...` public key into a recipient.
///
/// # Errors
///
/// Returns `WrapError::InvalidRecipient` if the key format is invalid.
pub fn parse_recipient(key: &str) -> Result<x25519::Recipient, WrapError> {
    key.parse::<x25519::Recipient>()
        .map_err(|_| WrapError::InvalidRecipient {
            method: NAME.to_string(),
            recipient: key.to_string(),
        })
}

fn backend_error(reason: String) -> UnwrapError {
    UnwrapError::Backend {
        method: NAME.to_string(),
        reason,
    }
}

/// Warn when an identity file is readable by group or others (Unix only).
#[cfg(unix)]
fn check_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;

    if let Ok(metadata) = fs::metadata(path) {
        let mode = metadata.permissions().mode() & 0o777;
        if mode & 0o077 != 0 {
            warn!(
                path = %path.display(),
                mode = %format!("{:o}", mode),
                "identity file is accessible by other users; run chmod 600"
            );
        }
    }
}

#[cfg(not(unix))]
fn check_permissions(_: &Path) {}

#[cfg(test)]
mod tests {
    use super::*;
    use ::age::secrecy::ExposeSecret;

    fn identity_file(dir: &Path, identities: &[&x25519::Identity]) -> PathBuf {
        let path = dir.join("identity.txt");
        let mut contents = String::from("# created: test\n");
        for identity in identities {
            contents.push_str(identity.to_string().expose_secret());
            contents.push('\n');
        }
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_wrap_unwrap_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let identity = x25519::Identity::generate();
        let age = Age::new(vec![identity_file(dir.path(), &[&identity])]);

        let blob = age
            .wrap(b"data-key", &[identity.to_public().to_string()], &Context::new())
            .unwrap();
        assert!(blob.starts_with(b"-----BEGIN AGE ENCRYPTED FILE-----"));

        let key = age.unwrap(&blob, &Context::new()).unwrap();
        assert_eq!(key.as_slice(), b"data-key");
    }

    #[test]
    fn test_any_recipient_can_unwrap() {
        let dir = tempfile::tempdir().unwrap();
        let alice = x25519::Identity::generate();
        let bob = x25519::Identity::generate();
        let recipients = vec![alice.to_public().to_string(), bob.to_public().to_string()];

        let blob = Age::default()
            .wrap(b"shared", &recipients, &Context::new())
            .unwrap();

        let bob_only = Age::new(vec![identity_file(dir.path(), &[&bob])]);
        assert_eq!(bob_only.unwrap(&blob, &Context::new()).unwrap().as_slice(), b"shared");
    }

    #[test]
    fn test_invalid_recipient() {
        let err = Age::default()
            .wrap(b"k", &["not-an-age-key".to_string()], &Context::new())
            .unwrap_err();
        assert!(matches!(err, WrapError::InvalidRecipient { .. }));
    }

    #[test]
    fn test_unwrap_without_identities() {
        let identity = x25519::Identity::generate();
        let blob = Age::default()
            .wrap(b"k", &[identity.to_public().to_string()], &Context::new())
            .unwrap();

        let age = Age::new(vec![PathBuf::from("/nonexistent/coffer/identity.txt")]);
        let err = age.unwrap(&blob, &Context::new()).unwrap_err();
        assert!(matches!(err, UnwrapError::NoIdentity { .. }));
    }

    #[test]
    fn test_unwrap_with_wrong_identity() {
        let dir = tempfile::tempdir().unwrap();
        let owner = x25519::Identity::generate();
        let stranger = x25519::Identity::generate();
        let blob = Age::default()
            .wrap(b"k", &[owner.to_public().to_string()], &Context::new())
            .unwrap();

        let age = Age::new(vec![identity_file(dir.path(), &[&stranger])]);
        let err = age.unwrap(&blob, &Context::new()).unwrap_err();
        assert!(matches!(err, UnwrapError::Backend { .. }));
    }
}
