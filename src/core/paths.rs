//! Source/envelope path convention.
//!
//! The envelope for `F` is `F.vault-envelope`. Either path may be given;
//! the other is derived from it.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use crate::core::constants::ENVELOPE_SUFFIX;

/// A source file and its envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    pub source: PathBuf,
    pub envelope: PathBuf,
}

/// Resolve `path` into its source and envelope paths.
///
/// Works on the raw OS string, so non-UTF-8 paths resolve unchanged.
pub fn resolve(path: &Path) -> Paths {
    match strip_envelope_suffix(path.as_os_str()) {
        Some(source) => Paths {
            source: PathBuf::from(source),
            envelope: path.to_path_buf(),
        },
        None => {
            let mut envelope = OsString::from(path.as_os_str());
            envelope.push(ENVELOPE_SUFFIX);
            Paths {
                source: path.to_path_buf(),
                envelope: PathBuf::from(envelope),
            }
        }
    }
}

/// `raw` without a trailing envelope suffix, if it has one and something
/// is left.
fn strip_envelope_suffix(raw: &OsStr) -> Option<&OsStr> {
    let bytes = raw.as_encoded_bytes();
    let stem = bytes.strip_suffix(ENVELOPE_SUFFIX.as_bytes())?;
    if stem.is_empty() {
        return None;
    }
    // SAFETY: `stem` is `raw` cut immediately before a non-empty ASCII
    // suffix, which is a valid split point for encoded OS strings.
    Some(unsafe { OsStr::from_encoded_bytes_unchecked(stem) })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_path_gets_suffix() {
        let paths = resolve(Path::new("/srv/app/secrets.env"));
        assert_eq!(paths.source, Path::new("/srv/app/secrets.env"));
        assert_eq!(
            paths.envelope,
            Path::new("/srv/app/secrets.env.vault-envelope")
        );
    }

    #[test]
    fn test_envelope_path_strips_suffix() {
        let paths = resolve(Path::new("/srv/app/secrets.env.vault-envelope"));
        assert_eq!(paths.source, Path::new("/srv/app/secrets.env"));
        assert_eq!(
            paths.envelope,
            Path::new("/srv/app/secrets.env.vault-envelope")
        );
    }

    #[test]
    fn test_both_forms_agree() {
        let a = resolve(Path::new("notes.txt"));
        let b = resolve(&a.envelope);
        assert_eq!(a, b);
    }

    #[test]
    fn test_bare_suffix_is_a_source() {
        let paths = resolve(Path::new(".vault-envelope"));
        assert_eq!(paths.source, Path::new(".vault-envelope"));
        assert_eq!(paths.envelope, Path::new(".vault-envelope.vault-envelope"));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_envelope_path() {
        use std::os::unix::ffi::OsStrExt;

        let raw = OsStr::from_bytes(b"/tmp/caf\xe9.env.vault-envelope");
        let paths = resolve(Path::new(raw));
        assert_eq!(paths.source.as_os_str().as_bytes(), b"/tmp/caf\xe9.env");
        assert_eq!(paths.envelope, Path::new(raw));
        assert_eq!(resolve(&paths.source), paths);
    }
}
