//! Encrypt command.

use std::path::PathBuf;

use tracing::debug;

use super::{output, Session};
use crate::core::vault::Outcome;
use crate::error::Result;

/// Encrypt each file in order, stopping at the first failure.
///
/// Owners come from the config file when it lists any, otherwise from the
/// owners already stored in each envelope.
pub fn execute(session: &Session, files: &[PathBuf]) -> Result<()> {
    let owners = &session.config.owners;
    debug!(
        files = files.len(),
        configured_owners = owners.len(),
        "encrypting"
    );

    for file in files {
        let path = session.resolve(file);
        let outcome = if owners.is_empty() {
            session.engine.encrypt_with_stored_owners(&path)?
        } else {
            session.engine.encrypt(&path, owners)?
        };

        let shown = file.display().to_string();
        match outcome {
            Outcome::Unchanged => output::dimmed(&format!("unchanged  {}", shown)),
            Outcome::Rekeyed => {
                output::success(&format!("encrypted  {}", output::path(&shown)))
            }
        }
    }

    Ok(())
}
