//! GPG key-wrapping method.
//!
//! Wraps data keys using GnuPG (GNU Privacy Guard) through its CLI.
//!
//! ## Requirements
//!
//! - `gpg` CLI must be installed (or `[gpg] program` pointed at it)
//! - recipient public keys must be in the keyring for encryption
//! - a matching private key must be in the keyring for decryption
//!
//! ## Usage
//!
//! ```toml
//! [[owners]]
//! gpg = "alice@example.com"
//!
//! [[owners]]
//! gpg = "ABCD1234ABCD1234ABCD1234ABCD1234ABCD1234"
//! ```

use std::sync::Arc;

use tracing::trace;
use zeroize::Zeroizing;

use super::process::{Context, Invocation, Runner, SystemRunner};
use super::Method;
use crate::error::{UnwrapError, WrapError};

const NAME: &str = "gpg";

/// GPG method backed by an external `gpg` executable.
#[derive(Clone)]
pub struct Gpg {
    program: String,
    runner: Arc<dyn Runner>,
}

impl Gpg {
    /// Use `program` as the gpg executable, run as a real subprocess.
    pub fn new(program: impl Into<String>) -> Self {
        Self::with_runner(program, Arc::new(SystemRunner))
    }

    /// Use `program` through a custom runner.
    pub fn with_runner(program: impl Into<String>, runner: Arc<dyn Runner>) -> Self {
        Self {
            program: program.into(),
            runner,
        }
    }

    fn encrypt_invocation(&self, recipients: &[String]) -> Invocation {
        let mut inv = Invocation::new(&self.program).args([
            "--batch", // Non-interactive mode
            "--yes",
            "--quiet",
            "--trust-model",
            "always", // Trust all keys without confirmation
            "--encrypt",
        ]);
        for recipient in recipients {
            inv = inv.args(["--recipient", recipient.as_str()]);
        }
        inv
    }

    fn decrypt_invocation(&self) -> Invocation {
        Invocation::new(&self.program).args(["--batch", "--yes", "--quiet", "--decrypt"])
    }
}

impl std::fmt::Debug for Gpg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gpg").field("program", &self.program).finish()
    }
}

impl Method for Gpg {
    fn name(&self) -> &str {
        NAME
    }

    fn wrap(&self, key: &[u8], recipients: &[String], ctx: &Context) -> Result<Vec<u8>, WrapError> {
        trace!(recipients = recipients.len(), "wrapping with gpg");

        if recipients.is_empty() {
            return Err(WrapError::Backend {
                method: NAME.to_string(),
                reason: "no recipients provided".to_string(),
            });
        }

        let blob = self
            .runner
            .run(&self.encrypt_invocation(recipients), key, ctx)
            .map_err(|source| WrapError::Process {
                method: NAME.to_string(),
                source,
            })?;

        trace!(blob_len = blob.len(), "wrapped with gpg");
        Ok(blob)
    }

    fn unwrap(&self, blob: &[u8], ctx: &Context) -> Result<Zeroizing<Vec<u8>>, UnwrapError> {
        trace!(blob_len = blob.len(), "unwrapping with gpg");

        let key = self
            .runner
            .run(&self.decrypt_invocation(), blob, ctx)
            .map_err(|source| UnwrapError::Process {
                method: NAME.to_string(),
                source,
            })?;

        Ok(Zeroizing::new(key))
    }
}
