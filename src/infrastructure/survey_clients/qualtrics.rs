use super::SurveyClient;
use crate::domain::error::{AppError, Result};
use crate::domain::export_job::{ExportFormat, ProgressReport};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

#[derive(Serialize)]
struct StartExportRequest<'a> {
    format: &'a str,
}

#[derive(Deserialize)]
struct Envelope<T> {
    result: T,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartExportResult {
    progress_id: Option<String>,
}

pub struct QualtricsClient {
    client: reqwest::Client,
    base_url: Url,
    api_token: Option<String>,
}

impl QualtricsClient {
    pub fn new(data_center: &str, api_token: Option<String>, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(&format!("https://{}.qualtrics.com/API/v3/", data_center.trim()))
            .map_err(|e| AppError::ConfigError(format!("Invalid data center: {}", e)))?;
        Ok(Self::with_base_url(base_url, api_token, timeout))
    }

    /// Points the client at an arbitrary API root (must end with `/`).
    pub fn with_base_url(base_url: Url, api_token: Option<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            base_url,
            api_token,
        }
    }

    fn export_url(&self, survey_id: &str, tail: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| AppError::ConfigError("API base URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(["surveys", survey_id, "export-responses"])
            .extend(tail);
        Ok(url)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| AppError::TransportError(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::TransportError(format!(
                "API error ({}): {}",
                status, text
            )));
        }

        Ok(response)
    }
}

#[async_trait]
impl SurveyClient for QualtricsClient {
    async fn start_export(&self, survey_id: &str, format: ExportFormat) -> Result<String> {
        let url = self.export_url(survey_id, &[])?;
        let body = StartExportRequest {
            format: format.as_str(),
        };

        let response = self.send(self.client.post(url).json(&body)).await?;
        let json: Envelope<StartExportResult> = response
            .json()
            .await
            .map_err(|e| AppError::TransportError(format!("Failed to parse JSON: {}", e)))?;

        json.result
            .progress_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| AppError::TransportError("Response is missing progressId".to_string()))
    }

    async fn get_progress(&self, survey_id: &str, progress_id: &str) -> Result<ProgressReport> {
        let url = self.export_url(survey_id, &[progress_id])?;

        let response = self.send(self.client.get(url)).await?;
        let json: Envelope<ProgressReport> = response
            .json()
            .await
            .map_err(|e| AppError::TransportError(format!("Failed to parse JSON: {}", e)))?;

        Ok(json.result)
    }

    async fn download_artifact(&self, survey_id: &str, file_id: &str) -> Result<Vec<u8>> {
        let url = self.export_url(survey_id, &[file_id, "file"])?;

        let response = self.send(self.client.get(url)).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| AppError::TransportError(format!("Failed to read body: {}", e)))?;

        Ok(bytes.to_vec())
    }
}
