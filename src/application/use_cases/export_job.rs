use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::domain::error::{AppError, Result};
use crate::domain::export_job::{ArchiveArtifact, ExportFormat, ExportJob, ExportStatus};
use crate::infrastructure::survey_clients::SurveyClient;

/// How long and how often to wait for the platform to finish an export.
///
/// With neither bound set the loop waits until the platform reports a terminal
/// status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: Option<u32>,
    pub max_elapsed: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_attempts: None,
            max_elapsed: None,
        }
    }
}

/// Drives one `ExportJob` through initiate, poll and retrieve against a `SurveyClient`.
pub struct ExportJobRunner {
    client: Arc<dyn SurveyClient + Send + Sync>,
    survey_id: String,
    format: ExportFormat,
    policy: PollPolicy,
}

impl ExportJobRunner {
    pub fn new(
        client: Arc<dyn SurveyClient + Send + Sync>,
        survey_id: impl Into<String>,
        format: ExportFormat,
        policy: PollPolicy,
    ) -> Self {
        Self {
            client,
            survey_id: survey_id.into(),
            format,
            policy,
        }
    }

    pub fn format(&self) -> ExportFormat {
        self.format
    }

    /// Starts the export and returns a job in the polling state.
    pub async fn initiate(&self) -> Result<ExportJob> {
        let mut job = ExportJob::new(&self.survey_id);

        let progress_id = self
            .client
            .start_export(&self.survey_id, self.format)
            .await
            .map_err(|e| AppError::InitiationError(e.to_string()))?;
        job.begin_polling(progress_id)?;

        info!(
            job_id = %job.id,
            survey_id = %job.survey_id,
            progress_id = job.progress_id.as_deref().unwrap_or_default(),
            format = self.format.as_str(),
            "Export initiated"
        );
        Ok(job)
    }

    /// Polls until the job reaches a terminal status.
    ///
    /// Returns `Ok(())` once complete. A job that already finished is not
    /// touched: a completed job returns `Ok(())` again, a failed one returns its
    /// recorded failure.
    pub async fn poll(&self, job: &mut ExportJob) -> Result<()> {
        let started = Instant::now();

        loop {
            match job.status {
                ExportStatus::Complete => return Ok(()),
                ExportStatus::Failed => {
                    return Err(job.failure.clone().unwrap_or_else(|| {
                        AppError::ExportFailed("export failed".to_string())
                    }))
                }
                ExportStatus::Pending => {
                    return Err(AppError::InvalidState(
                        "export has not been initiated".to_string(),
                    ))
                }
                ExportStatus::InProgress => {}
            }

            if let Some(err) = self.budget_exhausted(job, started) {
                warn!(job_id = %job.id, polls = job.polls, error = %err, "Export polling gave up");
                job.fail(err.clone());
                return Err(err);
            }

            sleep(self.policy.interval).await;
            self.poll_once(job).await?;
        }
    }

    /// One progress check. Transport failures are fatal to the job.
    pub async fn poll_once(&self, job: &mut ExportJob) -> Result<ExportStatus> {
        if job.is_terminal() {
            return Ok(job.status);
        }
        let progress_id = job
            .progress_id
            .clone()
            .ok_or_else(|| AppError::InvalidState("export has not been initiated".to_string()))?;

        let report = match self.client.get_progress(&self.survey_id, &progress_id).await {
            Ok(report) => report,
            Err(e) => {
                let err = AppError::PollError(e.to_string());
                warn!(job_id = %job.id, progress_id = %progress_id, error = %err, "Progress check failed");
                job.fail(err.clone());
                return Err(err);
            }
        };

        let status = job.record_progress(&report);
        debug!(
            job_id = %job.id,
            poll = job.polls,
            status = ?report.status,
            percent = report.percent_complete.unwrap_or_default(),
            "Export status"
        );

        match status {
            ExportStatus::Complete => info!(
                job_id = %job.id,
                file_id = job.file_id.as_deref().unwrap_or_default(),
                polls = job.polls,
                "Export complete"
            ),
            ExportStatus::Failed => warn!(
                job_id = %job.id,
                polls = job.polls,
                error = %job.failure.as_ref().map(ToString::to_string).unwrap_or_default(),
                "Export failed"
            ),
            _ => {}
        }
        Ok(status)
    }

    /// Downloads the finished export. Only valid for completed jobs.
    pub async fn retrieve_artifact(&self, job: &ExportJob) -> Result<ArchiveArtifact> {
        let file_id = match (job.status, job.file_id.as_deref()) {
            (ExportStatus::Complete, Some(file_id)) => file_id.to_string(),
            (status, _) => {
                return Err(AppError::InvalidState(format!(
                    "cannot retrieve artifact from {:?} export",
                    status
                )))
            }
        };

        let bytes = self
            .client
            .download_artifact(&self.survey_id, &file_id)
            .await
            .map_err(|e| AppError::RetrievalError(e.to_string()))?;

        info!(job_id = %job.id, file_id = %file_id, bytes = bytes.len(), "Export artifact retrieved");
        Ok(ArchiveArtifact::new(file_id, bytes))
    }

    fn budget_exhausted(&self, job: &ExportJob, started: Instant) -> Option<AppError> {
        if let Some(max) = self.policy.max_attempts {
            if job.polls >= max {
                return Some(AppError::PollTimeout(format!(
                    "no terminal status after {} checks",
                    job.polls
                )));
            }
        }
        if let Some(limit) = self.policy.max_elapsed {
            if started.elapsed() >= limit {
                return Some(AppError::PollTimeout(format!(
                    "no terminal status after {:?}",
                    limit
                )));
            }
        }
        None
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::domain::export_job::ProgressReport;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Survey client replaying a scripted sequence of progress reports.
    pub struct ScriptedClient {
        pub start: Mutex<Option<Result<String>>>,
        pub progress: Mutex<VecDeque<Result<ProgressReport>>>,
        pub artifact: Mutex<Option<Result<Vec<u8>>>>,
        pub progress_calls: Mutex<u32>,
    }

    impl ScriptedClient {
        pub fn new(progress: Vec<Result<ProgressReport>>) -> Self {
            Self {
                start: Mutex::new(Some(Ok("ES_1".to_string()))),
                progress: Mutex::new(progress.into()),
                artifact: Mutex::new(Some(Ok(b"PK-bytes".to_vec()))),
                progress_calls: Mutex::new(0),
            }
        }

        pub fn with_start(self, start: Result<String>) -> Self {
            *self.start.lock().unwrap() = Some(start);
            self
        }

        pub fn with_artifact(self, artifact: Result<Vec<u8>>) -> Self {
            *self.artifact.lock().unwrap() = Some(artifact);
            self
        }

        pub fn progress_calls(&self) -> u32 {
            *self.progress_calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl SurveyClient for ScriptedClient {
        async fn start_export(&self, _survey_id: &str, _format: ExportFormat) -> Result<String> {
            self.start
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Err(AppError::TransportError("start not scripted".into())))
        }

        async fn get_progress(&self, _survey_id: &str, _progress_id: &str) -> Result<ProgressReport> {
            *self.progress_calls.lock().unwrap() += 1;
            self.progress
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(ProgressReport::in_progress()))
        }

        async fn download_artifact(&self, _survey_id: &str, _file_id: &str) -> Result<Vec<u8>> {
            self.artifact
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Err(AppError::TransportError("artifact not scripted".into())))
        }
    }

    pub fn fast_policy() -> PollPolicy {
        PollPolicy {
            interval: Duration::ZERO,
            max_attempts: None,
            max_elapsed: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{fast_policy, ScriptedClient};
    use super::*;
    use crate::domain::export_job::ProgressReport;

    fn runner(client: Arc<ScriptedClient>, policy: PollPolicy) -> ExportJobRunner {
        ExportJobRunner::new(client, "SV_test", ExportFormat::Csv, policy)
    }

    #[tokio::test]
    async fn test_completes_after_exactly_three_polls() {
        let client = Arc::new(ScriptedClient::new(vec![
            Ok(ProgressReport::in_progress()),
            Ok(ProgressReport::in_progress()),
            Ok(ProgressReport::complete("X")),
        ]));
        let runner = runner(client.clone(), fast_policy());

        let mut job = runner.initiate().await.unwrap();
        assert_eq!(job.status, ExportStatus::InProgress);
        runner.poll(&mut job).await.unwrap();

        assert_eq!(job.status, ExportStatus::Complete);
        assert_eq!(job.file_id.as_deref(), Some("X"));
        assert_eq!(job.polls, 3);
        assert_eq!(client.progress_calls(), 3);
    }

    #[tokio::test]
    async fn test_terminal_job_is_not_polled_again() {
        let client = Arc::new(ScriptedClient::new(vec![Ok(ProgressReport::complete("X"))]));
        let runner = runner(client.clone(), fast_policy());

        let mut job = runner.initiate().await.unwrap();
        runner.poll(&mut job).await.unwrap();
        runner.poll(&mut job).await.unwrap();
        assert_eq!(runner.poll_once(&mut job).await.unwrap(), ExportStatus::Complete);

        assert_eq!(client.progress_calls(), 1);
        assert_eq!(job.polls, 1);
    }

    #[tokio::test]
    async fn test_platform_failure_is_export_failed() {
        let client = Arc::new(ScriptedClient::new(vec![
            Ok(ProgressReport::in_progress()),
            Ok(ProgressReport::failed()),
        ]));
        let runner = runner(client.clone(), fast_policy());

        let mut job = runner.initiate().await.unwrap();
        let err = runner.poll(&mut job).await.unwrap_err();
        assert!(matches!(err, AppError::ExportFailed(_)));
        assert_eq!(job.status, ExportStatus::Failed);

        // failed jobs stay failed and are not polled again
        assert!(matches!(runner.poll(&mut job).await, Err(AppError::ExportFailed(_))));
        assert_eq!(client.progress_calls(), 2);
    }

    #[tokio::test]
    async fn test_transport_error_while_polling_is_fatal() {
        let client = Arc::new(ScriptedClient::new(vec![
            Ok(ProgressReport::in_progress()),
            Err(AppError::TransportError("connection reset".into())),
            Ok(ProgressReport::complete("X")),
        ]));
        let runner = runner(client.clone(), fast_policy());

        let mut job = runner.initiate().await.unwrap();
        let err = runner.poll(&mut job).await.unwrap_err();

        assert!(matches!(err, AppError::PollError(ref msg) if msg.contains("connection reset")));
        assert_eq!(job.status, ExportStatus::Failed);
        assert_eq!(client.progress_calls(), 2);
    }

    #[tokio::test]
    async fn test_initiation_errors() {
        let client = Arc::new(
            ScriptedClient::new(vec![])
                .with_start(Err(AppError::TransportError("Response is missing progressId".into()))),
        );
        let err = runner(client, fast_policy()).initiate().await.unwrap_err();
        assert!(matches!(err, AppError::InitiationError(_)));
    }

    #[tokio::test]
    async fn test_max_attempts_surfaces_poll_timeout() {
        let client = Arc::new(ScriptedClient::new(vec![]));
        let policy = PollPolicy {
            max_attempts: Some(4),
            ..fast_policy()
        };
        let runner = runner(client.clone(), policy);

        let mut job = runner.initiate().await.unwrap();
        let err = runner.poll(&mut job).await.unwrap_err();

        assert!(matches!(err, AppError::PollTimeout(_)));
        assert_eq!(job.status, ExportStatus::Failed);
        assert_eq!(client.progress_calls(), 4);
    }

    #[tokio::test]
    async fn test_max_elapsed_surfaces_poll_timeout() {
        let client = Arc::new(ScriptedClient::new(vec![]));
        let policy = PollPolicy {
            interval: Duration::from_millis(5),
            max_attempts: None,
            max_elapsed: Some(Duration::from_millis(30)),
        };
        let runner = runner(client, policy);

        let mut job = runner.initiate().await.unwrap();
        assert!(matches!(
            runner.poll(&mut job).await,
            Err(AppError::PollTimeout(_))
        ));
    }

    #[tokio::test]
    async fn test_retrieve_requires_complete_job() {
        let client = Arc::new(ScriptedClient::new(vec![Ok(ProgressReport::complete("X"))]));
        let runner = runner(client, fast_policy());

        let mut job = runner.initiate().await.unwrap();
        assert!(matches!(
            runner.retrieve_artifact(&job).await,
            Err(AppError::InvalidState(_))
        ));

        runner.poll(&mut job).await.unwrap();
        let artifact = runner.retrieve_artifact(&job).await.unwrap();
        assert_eq!(artifact.file_id, "X");
        assert_eq!(artifact.bytes, b"PK-bytes".to_vec());
    }

    #[tokio::test]
    async fn test_download_failure_is_retrieval_error() {
        let client = Arc::new(
            ScriptedClient::new(vec![Ok(ProgressReport::complete("X"))])
                .with_artifact(Err(AppError::TransportError("timed out".into()))),
        );
        let runner = runner(client, fast_policy());

        let mut job = runner.initiate().await.unwrap();
        runner.poll(&mut job).await.unwrap();
        assert!(matches!(
            runner.retrieve_artifact(&job).await,
            Err(AppError::RetrievalError(_))
        ));
    }
}
