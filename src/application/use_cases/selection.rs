use std::sync::Arc;

use tokio::task;
use tracing::info;

use crate::domain::error::{AppError, Result};
use crate::domain::selection::SelectionEvent;
use crate::infrastructure::csv::AppendLog;

/// Records faculty course selections in the append-only selection log.
pub struct SelectionUseCase {
    log: Arc<AppendLog>,
}

impl SelectionUseCase {
    pub fn new(log: Arc<AppendLog>) -> Self {
        Self { log }
    }

    pub async fn record_selection(&self, email: &str, course_prefix: &str) -> Result<SelectionEvent> {
        let event = SelectionEvent::new(email, course_prefix)?;
        info!(email = %event.email, course_prefix = %event.course_prefix, "Recording selection");

        let log = self.log.clone();
        let row = event.clone();
        task::spawn_blocking(move || log.append(&row.to_row()))
            .await
            .map_err(|e| AppError::Internal(format!("Append task failed: {}", e)))??;

        info!(path = %self.log.path().display(), "Selection recorded");
        Ok(event)
    }

    /// Acknowledges an unselection. The log is append-only, so nothing is removed.
    pub async fn unrecord_selection(&self, email: &str, course_prefix: &str) -> Result<()> {
        info!(email = %email, course_prefix = %course_prefix, "Unselecting");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::selection::SELECTION_HEADER;
    use std::fs;
    use tempfile::TempDir;

    fn use_case(dir: &TempDir) -> (SelectionUseCase, std::path::PathBuf) {
        let path = dir.path().join("FacultyResponses.csv");
        let log = AppendLog::ensure_initialized(&path, &SELECTION_HEADER).unwrap();
        (SelectionUseCase::new(Arc::new(log)), path)
    }

    #[tokio::test]
    async fn test_record_creates_header_and_row() {
        let dir = TempDir::new().unwrap();
        let (use_case, path) = use_case(&dir);

        use_case.record_selection("a@b.com", "COP3530").await.unwrap();

        assert_eq!(
            fs::read_to_string(path).unwrap(),
            "Email,Course Prefix\na@b.com,COP3530\n"
        );
    }

    #[tokio::test]
    async fn test_empty_email_leaves_log_unchanged() {
        let dir = TempDir::new().unwrap();
        let (use_case, path) = use_case(&dir);
        let before = fs::read(&path).unwrap();

        let result = use_case.record_selection("", "COP3530").await;

        assert!(matches!(result, Err(AppError::ValidationError(_))));
        assert_eq!(fs::read(&path).unwrap(), before);
    }

    #[tokio::test]
    async fn test_unrecord_keeps_existing_rows() {
        let dir = TempDir::new().unwrap();
        let (use_case, path) = use_case(&dir);
        use_case.record_selection("a@b.com", "COP3530").await.unwrap();
        let before = fs::read(&path).unwrap();

        use_case.unrecord_selection("a@b.com", "COP3530").await.unwrap();

        assert_eq!(fs::read(&path).unwrap(), before);
    }
}
