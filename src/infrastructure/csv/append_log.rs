use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use csv::{Terminator, WriterBuilder};
use tracing::{info, warn};

use crate::domain::error::{AppError, Result};

/// Append-only CSV sink whose header row is written exactly once.
///
/// Rows are encoded in memory and land with a single write followed by a sync.
/// A failed append truncates the file back to its previous length, so readers
/// never observe a partial row.
pub struct AppendLog {
    path: PathBuf,
    header: Vec<String>,
    writer: Mutex<()>,
}

impl AppendLog {
    /// Creates the file with its header when absent. An existing file is left untouched.
    pub fn ensure_initialized(path: impl Into<PathBuf>, header: &[&str]) -> Result<Self> {
        let path = path.into();
        let header: Vec<String> = header.iter().map(|h| h.to_string()).collect();
        if header.is_empty() {
            return Err(AppError::ValidationError(
                "append log header needs at least one column".to_string(),
            ));
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                AppError::WriteError(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }

        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                let encoded = encode_row(&header)?;
                if let Err(e) = file.write_all(&encoded).and_then(|_| file.sync_all()) {
                    let _ = fs::remove_file(&path);
                    return Err(AppError::WriteError(format!(
                        "Failed to write header to {}: {}",
                        path.display(),
                        e
                    )));
                }
                info!(path = %path.display(), "Created append log with header");
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
            Err(e) => {
                return Err(AppError::WriteError(format!(
                    "Failed to create {}: {}",
                    path.display(),
                    e
                )))
            }
        }

        Ok(Self {
            path,
            header,
            writer: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Appends one row. The row must have exactly one value per header column.
    pub fn append(&self, row: &[&str]) -> Result<()> {
        if row.len() != self.header.len() {
            return Err(AppError::ValidationError(format!(
                "expected {} columns, got {}",
                self.header.len(),
                row.len()
            )));
        }
        let encoded = encode_row(row)?;

        let _guard = self
            .writer
            .lock()
            .map_err(|_| AppError::Internal("append log lock poisoned".to_string()))?;

        let file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(|e| {
                AppError::WriteError(format!("Failed to open {}: {}", self.path.display(), e))
            })?;
        commit_row(&file, &file, &self.path, &encoded)
    }
}

/// Writes one encoded row through `sink` and syncs `file`. Any failure truncates
/// `file` back to its length before the call.
fn commit_row(file: &File, mut sink: impl Write, path: &Path, encoded: &[u8]) -> Result<()> {
    let original_len = file
        .metadata()
        .map_err(|e| AppError::WriteError(e.to_string()))?
        .len();

    if let Err(e) = sink
        .write_all(encoded)
        .and_then(|_| sink.flush())
        .and_then(|_| file.sync_data())
    {
        rollback(file, path, original_len);
        return Err(AppError::WriteError(format!(
            "Failed to append to {}: {}",
            path.display(),
            e
        )));
    }
    Ok(())
}

fn encode_row<S: AsRef<str>>(values: &[S]) -> Result<Vec<u8>> {
    let mut writer = WriterBuilder::new()
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer
        .write_record(values.iter().map(|v| v.as_ref()))
        .map_err(|e| AppError::WriteError(format!("Failed to encode row: {}", e)))?;
    writer
        .into_inner()
        .map_err(|e| AppError::WriteError(format!("Failed to encode row: {}", e)))
}

fn rollback(file: &File, path: &Path, original_len: u64) {
    if let Err(e) = file.set_len(original_len) {
        warn!(
            error = %e,
            path = %path.display(),
            "Failed to roll back partial append"
        );
    }
}
