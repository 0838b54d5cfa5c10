use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::{AppError, Result};

/// Output format requested from the survey platform. Only delimited formats are
/// offered since the exported file becomes the student dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Tsv,
}

impl ExportFormat {
    /// Wire name, also the extension of the file inside the export archive.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Tsv => "tsv",
        }
    }
}

/// Status reported by the survey platform for one progress check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProgressStatus {
    InProgress,
    Complete,
    Failed,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressReport {
    pub status: ProgressStatus,
    #[serde(default)]
    pub file_id: Option<String>,
    #[serde(default)]
    pub percent_complete: Option<f64>,
}

impl ProgressReport {
    pub fn in_progress() -> Self {
        Self {
            status: ProgressStatus::InProgress,
            file_id: None,
            percent_complete: None,
        }
    }

    pub fn complete(file_id: impl Into<String>) -> Self {
        Self {
            status: ProgressStatus::Complete,
            file_id: Some(file_id.into()),
            percent_complete: Some(100.0),
        }
    }

    pub fn failed() -> Self {
        Self {
            status: ProgressStatus::Failed,
            file_id: None,
            percent_complete: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExportStatus {
    Pending,
    InProgress,
    Complete,
    Failed,
}

impl ExportStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExportStatus::Complete | ExportStatus::Failed)
    }
}

/// One export run against the survey platform.
///
/// Status only moves forward: `Pending -> InProgress -> Complete | Failed`. Once a
/// terminal status is reached every further transition is ignored.
#[derive(Debug, Clone)]
pub struct ExportJob {
    pub id: Uuid,
    pub survey_id: String,
    pub progress_id: Option<String>,
    pub status: ExportStatus,
    pub file_id: Option<String>,
    pub polls: u32,
    pub failure: Option<AppError>,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl ExportJob {
    pub fn new(survey_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            survey_id: survey_id.into(),
            progress_id: None,
            status: ExportStatus::Pending,
            file_id: None,
            polls: 0,
            failure: None,
            created_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Moves a pending job into polling once the platform handed out a progress id.
    pub fn begin_polling(&mut self, progress_id: impl Into<String>) -> Result<()> {
        if self.status != ExportStatus::Pending {
            return Err(AppError::InvalidState(format!(
                "cannot start polling from {:?}",
                self.status
            )));
        }
        self.progress_id = Some(progress_id.into());
        self.status = ExportStatus::InProgress;
        Ok(())
    }

    /// Applies one progress report and returns the resulting status.
    pub fn record_progress(&mut self, report: &ProgressReport) -> ExportStatus {
        if self.status != ExportStatus::InProgress {
            return self.status;
        }
        self.polls += 1;

        match report.status {
            ProgressStatus::Complete => match report.file_id.as_deref() {
                Some(file_id) if !file_id.trim().is_empty() => {
                    self.file_id = Some(file_id.to_string());
                    self.finish(ExportStatus::Complete);
                }
                _ => self.fail(AppError::PollError(
                    "export reported complete without a fileId".to_string(),
                )),
            },
            ProgressStatus::Failed => self.fail(AppError::ExportFailed(format!(
                "survey platform reported failure for progress {}",
                self.progress_id.as_deref().unwrap_or("?")
            ))),
            ProgressStatus::InProgress | ProgressStatus::Other => {}
        }

        self.status
    }

    /// Marks the job failed. No-op when the job already reached a terminal status.
    pub fn fail(&mut self, error: AppError) {
        if self.is_terminal() {
            return;
        }
        self.failure = Some(error);
        self.finish(ExportStatus::Failed);
    }

    fn finish(&mut self, status: ExportStatus) {
        self.status = status;
        self.finished_at = Some(Utc::now());
    }
}

/// Compressed export file as downloaded from the platform. Consumed once by extraction.
#[derive(Debug, Clone)]
pub struct ArchiveArtifact {
    pub file_id: String,
    pub bytes: Vec<u8>,
}

impl ArchiveArtifact {
    pub fn new(file_id: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_id: file_id.into(),
            bytes,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
