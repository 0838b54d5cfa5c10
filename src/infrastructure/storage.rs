use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use crate::domain::error::{AppError, Result};

pub fn ensure_dir(path: &Path) -> std::io::Result<PathBuf> {
    if !path.exists() {
        fs::create_dir_all(path)?;
    }
    Ok(path.to_path_buf())
}

/// Replaces `target` with a copy of `source` in one rename, so readers of
/// `target` see either the old or the new file.
pub fn promote_dataset(source: &Path, target: &Path) -> Result<()> {
    let parent = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    ensure_dir(&parent).map_err(|e| {
        AppError::WriteError(format!("Failed to create {}: {}", parent.display(), e))
    })?;

    let mut input = File::open(source).map_err(|e| {
        AppError::DatasetReadError(format!("Failed to open {}: {}", source.display(), e))
    })?;
    let mut staged = tempfile::Builder::new()
        .prefix(".dataset-")
        .tempfile_in(&parent)
        .map_err(|e| AppError::WriteError(format!("Failed to create temp file: {}", e)))?;

    io::copy(&mut input, &mut staged)
        .and_then(|_| staged.as_file().sync_all())
        .map_err(|e| AppError::WriteError(format!("Failed to copy dataset: {}", e)))?;

    staged.persist(target).map_err(|e| {
        AppError::WriteError(format!("Failed to replace {}: {}", target.display(), e.error))
    })?;
    Ok(())
}
