pub mod qualtrics;

use crate::domain::error::Result;
use crate::domain::export_job::{ExportFormat, ProgressReport};
use async_trait::async_trait;

pub use qualtrics::QualtricsClient;

/// Response-export capability of the external survey platform.
///
/// Implementations report network and protocol problems as `TransportError`;
/// callers decide which stage of the export the failure belongs to.
#[async_trait]
pub trait SurveyClient {
    /// Starts an export and returns its progress id.
    async fn start_export(&self, survey_id: &str, format: ExportFormat) -> Result<String>;
    async fn get_progress(&self, survey_id: &str, progress_id: &str) -> Result<ProgressReport>;
    async fn download_artifact(&self, survey_id: &str, file_id: &str) -> Result<Vec<u8>>;
}
