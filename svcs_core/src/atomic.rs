//! Atomic file replacement.

use crate::error::{Error, Result};
use std::io::Write;
use std::path::Path;

/// Replace `path` with `contents` atomically.
///
/// The data is written to a temporary file in the destination directory,
/// synced, and renamed over `path`. Readers see either the old file or the
/// new one, never a partial write.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| Error::invalid_path(path.display().to_string(), "no parent directory"))?;
    std::fs::create_dir_all(parent)?;

    let mut temp_file = tempfile::NamedTempFile::new_in(parent)?;
    temp_file.write_all(contents)?;
    temp_file.flush()?;
    temp_file.as_file().sync_all()?;
    temp_file.persist(path)?;

    Ok(())
}
