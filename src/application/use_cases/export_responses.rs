use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::export_job::ExportJobRunner;
use crate::domain::error::{AppError, Result};
use crate::infrastructure::archive::{ArchiveExtractor, ExtractedArchive};
use crate::infrastructure::csv::StudentDirectory;
use crate::infrastructure::storage::promote_dataset;

/// Outcome of one export-and-ingest run.
#[derive(Debug, Clone)]
pub struct ExportReport {
    pub job_id: Uuid,
    pub progress_id: String,
    pub file_id: String,
    pub polls: u32,
    pub extracted_files: Vec<String>,
    pub dataset_reloaded: bool,
}

/// Runs the export job, extracts its artifact and refreshes the student dataset.
///
/// Only one export runs at a time; a request arriving while another is in
/// flight is rejected with `ExportInProgress`.
pub struct ExportResponsesUseCase {
    runner: ExportJobRunner,
    extractor: ArchiveExtractor,
    directory: Arc<StudentDirectory>,
    extract_dir: PathBuf,
    promote_exports: bool,
    in_flight: Mutex<()>,
}

impl ExportResponsesUseCase {
    pub fn new(
        runner: ExportJobRunner,
        extractor: ArchiveExtractor,
        directory: Arc<StudentDirectory>,
        extract_dir: impl Into<PathBuf>,
        promote_exports: bool,
    ) -> Self {
        Self {
            runner,
            extractor,
            directory,
            extract_dir: extract_dir.into(),
            promote_exports,
            in_flight: Mutex::new(()),
        }
    }

    pub async fn execute(&self) -> Result<ExportReport> {
        let _guard = self.in_flight.try_lock().map_err(|_| {
            warn!("Export requested while another export is running");
            AppError::ExportInProgress
        })?;

        let mut job = self.runner.initiate().await?;
        self.runner.poll(&mut job).await?;
        let artifact = self.runner.retrieve_artifact(&job).await?;

        let extractor = self.extractor.clone();
        let extract_dir = self.extract_dir.clone();
        let extracted = task::spawn_blocking(move || extractor.extract(&artifact, &extract_dir))
            .await
            .map_err(|e| AppError::Internal(format!("Extraction task failed: {}", e)))??;

        let dataset_reloaded = self.refresh_dataset(&extracted).await?;

        Ok(ExportReport {
            job_id: job.id,
            progress_id: job.progress_id.unwrap_or_default(),
            file_id: job.file_id.unwrap_or_default(),
            polls: job.polls,
            extracted_files: extracted
                .entries
                .iter()
                .map(|entry| entry.to_string_lossy().into_owned())
                .collect(),
            dataset_reloaded,
        })
    }

    /// Copies the exported dataset file over the current dataset and reloads lookups.
    async fn refresh_dataset(&self, extracted: &ExtractedArchive) -> Result<bool> {
        if !self.promote_exports {
            return Ok(false);
        }
        let extension = self.runner.format().as_str();
        let Some(source) = extracted.first_with_extension(extension) else {
            warn!(
                destination = %extracted.destination.display(),
                extension,
                "Export contained no dataset file; dataset left unchanged"
            );
            return Ok(false);
        };

        let directory = self.directory.clone();
        task::spawn_blocking(move || -> Result<()> {
            promote_dataset(&source, directory.dataset_path())?;
            directory.reload()?;
            info!(
                source = %source.display(),
                dataset = %directory.dataset_path().display(),
                "Student dataset refreshed from export"
            );
            Ok(())
        })
        .await
        .map_err(|e| AppError::Internal(format!("Dataset refresh task failed: {}", e)))?
        .map_err(|e| {
            error!(error = %e, "Failed to refresh student dataset");
            e
        })?;

        Ok(true)
    }
}
