use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use tracing::{info, warn};

use super::csv_parser::CsvParser;
use crate::domain::error::{AppError, Result};
use crate::domain::student::{normalize_email, StudentRecord};

/// In-memory snapshot of one student dataset.
#[derive(Debug, Clone)]
pub struct CsvStore {
    records: Vec<StudentRecord>,
    /// Normalized email -> index of the first record carrying it
    by_email: HashMap<String, usize>,
}

impl CsvStore {
    pub fn load(path: &Path, email_field: &str) -> Result<Self> {
        Self::load_with(&CsvParser::new(), path, email_field)
    }

    pub fn load_with(parser: &CsvParser, path: &Path, email_field: &str) -> Result<Self> {
        let parsed = parser.parse_file(path)?;

        let mut by_email = HashMap::with_capacity(parsed.records.len());
        for (position, record) in parsed.records.iter().enumerate() {
            if let Some(key) = record.normalized_key(email_field) {
                by_email.entry(key).or_insert(position);
            }
        }

        Ok(Self {
            records: parsed.records,
            by_email,
        })
    }

    /// First record whose email matches, ignoring case and surrounding whitespace.
    pub fn find_by_email(&self, email: &str) -> Option<&StudentRecord> {
        self.by_email
            .get(&normalize_email(email))
            .and_then(|&position| self.records.get(position))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Holder of the current dataset snapshot.
///
/// Readers clone the `Arc` and keep working on it while a reload swaps in a
/// freshly parsed store.
pub struct StudentDirectory {
    dataset_path: PathBuf,
    email_field: String,
    parser: CsvParser,
    current: RwLock<Option<Arc<CsvStore>>>,
}

impl StudentDirectory {
    pub fn new(dataset_path: impl Into<PathBuf>, email_field: impl Into<String>) -> Self {
        Self {
            dataset_path: dataset_path.into(),
            email_field: email_field.into(),
            parser: CsvParser::new(),
            current: RwLock::new(None),
        }
    }

    pub fn with_parser(mut self, parser: CsvParser) -> Self {
        self.parser = parser;
        self
    }

    pub fn dataset_path(&self) -> &Path {
        &self.dataset_path
    }

    /// Parses the dataset and swaps it in. The previous snapshot stays active on failure.
    pub fn reload(&self) -> Result<Arc<CsvStore>> {
        let store = Arc::new(CsvStore::load_with(
            &self.parser,
            &self.dataset_path,
            &self.email_field,
        )?);
        let mut current = self
            .current
            .write()
            .map_err(|_| AppError::Internal("student directory lock poisoned".to_string()))?;
        *current = Some(store.clone());

        if store.is_empty() {
            warn!(dataset = %self.dataset_path.display(), "Student dataset has no rows");
        }

        info!(
            dataset = %self.dataset_path.display(),
            records = store.len(),
            "Student dataset loaded"
        );
        Ok(store)
    }

    /// Loads at startup; a missing dataset is expected before the first export.
    pub fn try_preload(&self) {
        if let Err(err) = self.reload() {
            warn!(
                error = %err,
                dataset = %self.dataset_path.display(),
                "Student dataset not loaded yet"
            );
        }
    }

    /// Current snapshot, loading it on first use.
    pub fn snapshot(&self) -> Result<Arc<CsvStore>> {
        {
            let current = self
                .current
                .read()
                .map_err(|_| AppError::Internal("student directory lock poisoned".to_string()))?;
            if let Some(store) = current.as_ref() {
                return Ok(store.clone());
            }
        }
        self.reload()
    }

    pub fn find_by_email(&self, email: &str) -> Result<Option<StudentRecord>> {
        let store = self.snapshot()?;
        Ok(store.find_by_email(email).cloned())
    }
}
