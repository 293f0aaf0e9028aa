use std::io::Write;
use std::path::Path;

use crate::error::FinishError;

/// Replaces the file at `path` with `bytes` without ever exposing a partial
/// file: the new content goes to a sibling temp file which is synced and
/// then renamed over the original.
pub fn replace_file(path: &Path, bytes: &[u8]) -> Result<(), FinishError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = tempfile::Builder::new()
        .prefix(".finishing-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| FinishError::from_io(path, e))?;

    // tempfile creates 0600; keep whatever the original had
    if let Ok(existing) = std::fs::metadata(path) {
        if let Err(e) = tmp.as_file().set_permissions(existing.permissions()) {
            log::debug!("Could not copy permissions onto temp file: {}", e);
        }
    }

    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| FinishError::Io(e.error))?;

    log::trace!("Replaced {:?} ({} bytes)", path, bytes.len());
    Ok(())
}
