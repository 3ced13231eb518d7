//! Decrypt command.

use std::io::Write;
use std::path::Path;

use super::Session;
use crate::error::{Error, Result};

/// Decrypt one envelope and write the raw plaintext to stdout.
pub fn execute(session: &Session, file: &Path) -> Result<()> {
    let plaintext = zeroize::Zeroizing::new(session.engine.decrypt(&session.resolve(file))?);

    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(&plaintext)
        .and_then(|()| stdout.flush())
        .map_err(|source| Error::Write {
            path: "<stdout>".into(),
            source,
        })
}
