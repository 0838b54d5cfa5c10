use std::sync::Arc;

use tracing::{error, info};

use crate::application::{
    ExportJobRunner, ExportResponsesUseCase, PollPolicy, SelectionUseCase, StudentLookupUseCase,
};
use crate::domain::error::Result;
use crate::domain::export_job::ExportFormat;
use crate::domain::selection::SELECTION_HEADER;
use crate::infrastructure::archive::ArchiveExtractor;
use crate::infrastructure::class_list::ClassListClient;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::csv::{AppendLog, CsvParser, StudentDirectory};
use crate::infrastructure::storage::ensure_dir;
use crate::infrastructure::survey_clients::{QualtricsClient, SurveyClient};
use crate::interfaces::http::HttpState;

/// Builds every component from configuration and wires them into the HTTP state.
pub fn setup(config: &AppConfig) -> Result<HttpState> {
    let storage = &config.storage;
    ensure_dir(&storage.data_dir).map_err(|err| {
        error!(
            error = %err,
            data_dir = %storage.data_dir.display(),
            "Failed to create data dir"
        );
        err
    })?;

    let selections = AppendLog::ensure_initialized(storage.selections_path(), &SELECTION_HEADER)?;

    let parser = match config.survey.format {
        ExportFormat::Tsv => CsvParser::tab_separated(),
        _ => CsvParser::new(),
    };
    let directory = Arc::new(
        StudentDirectory::new(storage.dataset_path(), storage.email_field.clone())
            .with_parser(parser),
    );
    directory.try_preload();

    let survey_client: Arc<dyn SurveyClient + Send + Sync> = Arc::new(QualtricsClient::new(
        &config.survey.data_center,
        config.survey.api_token.clone(),
        config.survey.request_timeout(),
    )?);
    let policy = PollPolicy {
        interval: config.survey.poll_interval(),
        max_attempts: config.survey.max_poll_attempts,
        max_elapsed: config.survey.max_poll_duration(),
    };
    let runner = ExportJobRunner::new(
        survey_client,
        config.survey.survey_id.clone(),
        config.survey.format,
        policy,
    );

    let export_use_case = ExportResponsesUseCase::new(
        runner,
        ArchiveExtractor::new(),
        directory.clone(),
        storage.extract_dir.clone(),
        storage.promote_exports,
    );

    info!(
        survey_id = %config.survey.survey_id,
        data_center = %config.survey.data_center,
        dataset = %storage.dataset_path().display(),
        selections = %storage.selections_path().display(),
        "Components initialized"
    );

    Ok(HttpState {
        export_use_case: Arc::new(export_use_case),
        lookup_use_case: Arc::new(StudentLookupUseCase::new(directory)),
        selection_use_case: Arc::new(SelectionUseCase::new(Arc::new(selections))),
        class_list: Arc::new(ClassListClient::new(
            config.class_list.url.clone(),
            config.survey.request_timeout(),
        )),
    })
}
