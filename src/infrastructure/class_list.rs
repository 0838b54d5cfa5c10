use std::time::Duration;

use crate::domain::error::{AppError, Result};

/// Fetches the published class-list CSV so the front end can read it without CORS issues.
pub struct ClassListClient {
    client: reqwest::Client,
    url: String,
}

impl ClassListClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Raw CSV bytes, passed through unmodified.
    pub async fn fetch(&self) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| AppError::TransportError(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::TransportError(format!(
                "Class list fetch failed with HTTP {}",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AppError::TransportError(format!("Failed to read body: {}", e)))?;
        Ok(bytes.to_vec())
    }
}
