use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use zip::ZipArchive;

use crate::domain::error::{AppError, Result};
use crate::domain::export_job::ArchiveArtifact;

/// Files produced by one extraction, relative to `destination`.
#[derive(Debug, Clone)]
pub struct ExtractedArchive {
    pub destination: PathBuf,
    pub entries: Vec<PathBuf>,
    /// Directory entries, including empty ones
    pub directories: Vec<PathBuf>,
}

impl ExtractedArchive {
    /// First extracted file with the given extension (case-insensitive), in archive order.
    pub fn first_with_extension(&self, extension: &str) -> Option<PathBuf> {
        self.entries
            .iter()
            .find(|entry| {
                entry
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .map_or(false, |ext| ext.eq_ignore_ascii_case(extension))
            })
            .map(|entry| self.destination.join(entry))
    }
}

/// Unpacks downloaded zip artifacts.
///
/// The artifact is first written to a temp file next to the destination and
/// synced; only then is it opened for reading. Entries are unpacked into a
/// staging directory and moved into place once every entry decompressed, so a
/// corrupt archive leaves nothing behind in `destination`. A move that fails
/// halfway is undone: moved files are removed, replaced files come back and
/// newly created directories are dropped.
#[derive(Debug, Default, Clone)]
pub struct ArchiveExtractor;

impl ArchiveExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(&self, artifact: &ArchiveArtifact, destination: &Path) -> Result<ExtractedArchive> {
        if artifact.is_empty() {
            return Err(AppError::ExtractionError(format!(
                "artifact {} is empty",
                artifact.file_id
            )));
        }

        let work_dir = match destination.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&work_dir).map_err(|e| {
            AppError::ExtractionError(format!("Failed to create {}: {}", work_dir.display(), e))
        })?;

        let mut download = tempfile::Builder::new()
            .prefix(".download-")
            .suffix(".zip")
            .tempfile_in(&work_dir)
            .map_err(|e| AppError::ExtractionError(format!("Failed to create temp file: {}", e)))?;
        download
            .write_all(&artifact.bytes)
            .and_then(|_| download.flush())
            .and_then(|_| download.as_file().sync_all())
            .map_err(|e| AppError::ExtractionError(format!("Failed to write artifact: {}", e)))?;
        debug!(
            file_id = %artifact.file_id,
            bytes = artifact.len(),
            path = %download.path().display(),
            "Artifact written to temp file"
        );

        let reader = download
            .reopen()
            .map_err(|e| AppError::ExtractionError(format!("Failed to reopen artifact: {}", e)))?;

        let staging = tempfile::Builder::new()
            .prefix(".extract-")
            .tempdir_in(&work_dir)
            .map_err(|e| {
                AppError::ExtractionError(format!("Failed to create staging dir: {}", e))
            })?;
        let unpacked = unpack(reader, staging.path())?;

        let backup = tempfile::Builder::new()
            .prefix(".replaced-")
            .tempdir_in(&work_dir)
            .map_err(|e| AppError::ExtractionError(format!("Failed to create backup dir: {}", e)))?;
        let mut journal = Journal::default();
        if let Err(err) = journal.commit(staging.path(), backup.path(), destination, &unpacked) {
            warn!(
                file_id = %artifact.file_id,
                destination = %destination.display(),
                error = %err,
                "Extraction failed while moving entries; restoring destination"
            );
            journal.undo();
            return Err(err);
        }

        info!(
            file_id = %artifact.file_id,
            destination = %destination.display(),
            entries = unpacked.files.len(),
            directories = unpacked.directories.len(),
            "Archive extracted"
        );

        Ok(ExtractedArchive {
            destination: destination.to_path_buf(),
            entries: unpacked.files,
            directories: unpacked.directories,
        })
    }
}

/// Entry paths decompressed into the staging directory, in archive order.
#[derive(Debug, Default)]
struct Unpacked {
    files: Vec<PathBuf>,
    directories: Vec<PathBuf>,
}

/// Decompresses every entry under `root`. A name repeated in the archive keeps its
/// first position and its last content.
fn unpack(reader: File, root: &Path) -> Result<Unpacked> {
    let mut archive = ZipArchive::new(reader)
        .map_err(|e| AppError::ExtractionError(format!("Failed to open archive: {}", e)))?;

    let mut unpacked = Unpacked::default();
    let mut seen = HashSet::new();
    for i in 0..archive.len() {
        let mut file = archive
            .by_index(i)
            .map_err(|e| AppError::ExtractionError(format!("Failed to read entry {}: {}", i, e)))?;

        let relative = file.enclosed_name().map(Path::to_path_buf).ok_or_else(|| {
            AppError::ExtractionError(format!("Entry escapes destination: {}", file.name()))
        })?;
        let out_path = root.join(&relative);

        if file.is_dir() {
            fs::create_dir_all(&out_path).map_err(|e| {
                AppError::ExtractionError(format!("Failed to create {}: {}", out_path.display(), e))
            })?;
            if seen.insert(relative.clone()) {
                unpacked.directories.push(relative);
            }
            continue;
        }

        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                AppError::ExtractionError(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }
        let mut out = File::create(&out_path).map_err(|e| {
            AppError::ExtractionError(format!("Failed to create {}: {}", out_path.display(), e))
        })?;
        io::copy(&mut file, &mut out).map_err(|e| {
            AppError::ExtractionError(format!("Failed to decompress {}: {}", relative.display(), e))
        })?;

        if seen.insert(relative.clone()) {
            unpacked.files.push(relative);
        } else {
            debug!(entry = %relative.display(), "Duplicate archive entry replaced earlier copy");
        }
    }

    Ok(unpacked)
}

/// Changes made to the destination while committing staged entries, so a failed
/// commit can put the destination back the way it was.
#[derive(Debug, Default)]
struct Journal {
    created_dirs: Vec<PathBuf>,
    /// Moved-in target plus the stashed file it replaced, if any
    moved: Vec<(PathBuf, Option<PathBuf>)>,
}

impl Journal {
    fn commit(
        &mut self,
        staging: &Path,
        backup: &Path,
        destination: &Path,
        unpacked: &Unpacked,
    ) -> Result<()> {
        self.create_dir(destination)?;
        for dir in &unpacked.directories {
            self.create_dir(&destination.join(dir))?;
        }

        for (i, entry) in unpacked.files.iter().enumerate() {
            let target = destination.join(entry);
            if let Some(parent) = target.parent() {
                self.create_dir(parent)?;
            }

            let previous = if target.is_file() {
                let stashed = backup.join(i.to_string());
                fs::rename(&target, &stashed).map_err(|e| {
                    AppError::ExtractionError(format!(
                        "Failed to set aside {}: {}",
                        target.display(),
                        e
                    ))
                })?;
                Some(stashed)
            } else {
                None
            };
            self.moved.push((target.clone(), previous));

            fs::rename(staging.join(entry), &target).map_err(|e| {
                AppError::ExtractionError(format!("Failed to move {}: {}", target.display(), e))
            })?;
        }
        Ok(())
    }

    /// Creates `dir` and records every ancestor that did not exist before.
    fn create_dir(&mut self, dir: &Path) -> Result<()> {
        let missing: Vec<PathBuf> = dir
            .ancestors()
            .take_while(|ancestor| !ancestor.as_os_str().is_empty() && !ancestor.exists())
            .map(Path::to_path_buf)
            .collect();
        self.created_dirs.extend(missing.into_iter().rev());

        fs::create_dir_all(dir).map_err(|e| {
            AppError::ExtractionError(format!("Failed to create {}: {}", dir.display(), e))
        })
    }

    fn undo(self) {
        for (target, previous) in self.moved.into_iter().rev() {
            let _ = fs::remove_file(&target);
            if let Some(stashed) = previous {
                if let Err(e) = fs::rename(&stashed, &target) {
                    warn!(error = %e, path = %target.display(), "Failed to restore replaced file");
                }
            }
        }
        for dir in self.created_dirs.into_iter().rev() {
            let _ = fs::remove_dir(&dir);
        }
    }
}
