use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    #[error("Export initiation failed: {0}")]
    InitiationError(String),
    #[error("Export progress check failed: {0}")]
    PollError(String),
    #[error("Export polling timed out: {0}")]
    PollTimeout(String),
    #[error("Export failed: {0}")]
    ExportFailed(String),
    #[error("Artifact retrieval failed: {0}")]
    RetrievalError(String),
    #[error("Archive extraction failed: {0}")]
    ExtractionError(String),
    #[error("Dataset read failed: {0}")]
    DatasetReadError(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Write failed: {0}")]
    WriteError(String),
    #[error("Transport error: {0}")]
    TransportError(String),
    #[error("An export is already in progress")]
    ExportInProgress,
    #[error("Invalid export state: {0}")]
    InvalidState(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// True for failures caused by the caller's input rather than the service.
    pub fn is_client_error(&self) -> bool {
        matches!(self, AppError::ValidationError(_))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
