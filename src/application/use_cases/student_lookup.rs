use std::sync::Arc;

use tokio::task;

use crate::domain::error::{AppError, Result};
use crate::domain::student::StudentRecord;
use crate::infrastructure::csv::StudentDirectory;

pub struct StudentLookupUseCase {
    directory: Arc<StudentDirectory>,
}

impl StudentLookupUseCase {
    pub fn new(directory: Arc<StudentDirectory>) -> Self {
        Self { directory }
    }

    /// `Ok(None)` when no student carries the email. Blank emails are a validation error.
    pub async fn execute(&self, email: &str) -> Result<Option<StudentRecord>> {
        let email = email.trim().to_string();
        if email.is_empty() {
            return Err(AppError::ValidationError(
                "email query parameter is required".to_string(),
            ));
        }

        // the first lookup may have to parse the dataset from disk
        let directory = self.directory.clone();
        task::spawn_blocking(move || directory.find_by_email(&email))
            .await
            .map_err(|e| AppError::Internal(format!("Lookup task failed: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn use_case_with(content: Option<&str>) -> (TempDir, StudentLookupUseCase) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("students.csv");
        if let Some(content) = content {
            std::fs::write(&path, content).unwrap();
        }
        let directory = Arc::new(StudentDirectory::new(path, "shib_mail"));
        (dir, StudentLookupUseCase::new(directory))
    }

    #[tokio::test]
    async fn test_lookup_scenarios() {
        let (_dir, use_case) = use_case_with(Some(
            "shib_mail,shib_given,shib_sn,GPA\nJane.Doe@ufl.edu,Jane,Doe,3.8\n",
        ));

        let jane = use_case.execute("jane.doe@ufl.edu").await.unwrap().unwrap();
        assert_eq!(jane.get("GPA"), Some("3.8"));
        assert!(use_case.execute("john@ufl.edu").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_blank_email_rejected() {
        let (_dir, use_case) = use_case_with(Some("shib_mail\n"));
        assert!(matches!(
            use_case.execute("   ").await,
            Err(AppError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_dataset_is_read_error() {
        let (_dir, use_case) = use_case_with(None);
        assert!(matches!(
            use_case.execute("jane@ufl.edu").await,
            Err(AppError::DatasetReadError(_))
        ));
    }
}
