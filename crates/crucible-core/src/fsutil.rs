//! Small filesystem helpers shared across the pipeline.

use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;

/// Write `contents` to `path` atomically.
///
/// The bytes are staged into a temporary file in the destination
/// directory and renamed into place, so a concurrent reader sees either
/// the old file (or none) or the complete new one, never a partial write.
/// Missing parent directories are created first.
///
/// # Errors
///
/// Returns an error if the parent directory cannot be created, the
/// staging file cannot be written, or the rename fails.
pub fn atomic_write(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .with_context(|| format!("{} has no parent directory", path.display()))?;
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    let mut staged = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to stage a temporary file in {}", dir.display()))?;
    staged.write_all(contents)?;
    staged
        .persist(path)
        .with_context(|| format!("Failed to rename into {}", path.display()))?;
    Ok(())
}

/// Recursively copy a directory tree from `src` into `dst`.
///
/// `dst` must already exist; the contents of `src` land directly inside
/// it, overwriting what is there.
///
/// # Errors
///
/// Returns an error if any file or directory cannot be copied.
pub fn copy_dir_all(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> Result<()> {
    fs_extra::dir::copy(
        src,
        dst,
        &fs_extra::dir::CopyOptions::new()
            .content_only(true)
            .overwrite(true),
    )
    .map_err(|e| anyhow::anyhow!("Copy failed: {e}"))?;
    Ok(())
}
