//! Atomic file replacement.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::trace;

/// Replace `path` with `contents` so readers see either the old or the new
/// file, never a partial one.
///
/// The data is written to a temporary file in the same directory, synced,
/// then renamed over `path`. The temporary file is removed on failure.
/// Permissions of an existing target are carried over.
pub fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let tmp = temp_path(path);
    trace!(path = %path.display(), tmp = %tmp.display(), bytes = contents.len(), "atomic write");

    let result = write_and_rename(path, &tmp, contents);
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

fn write_and_rename(path: &Path, tmp: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(tmp)?;
    file.write_all(contents)?;
    file.sync_all()?;

    if let Ok(metadata) = fs::metadata(path) {
        fs::set_permissions(tmp, metadata.permissions())?;
    }
    drop(file);

    fs::rename(tmp, path)
}

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Hidden sibling of `path`, unique per process and call.
fn temp_path(path: &Path) -> PathBuf {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let name = path.file_name().unwrap_or_default().to_string_lossy();
    let seq = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    parent.join(format!(".{}.{}.{}.tmp", name, std::process::id(), seq))
}
