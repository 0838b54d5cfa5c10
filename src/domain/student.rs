use std::collections::HashMap;
use std::sync::Arc;

/// Lower-cases and trims an email so lookups ignore case and stray whitespace.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// One row of a student dataset, keyed by header name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentRecord {
    /// Row index within the dataset (0-based, header excluded)
    pub index: usize,

    /// Header names in dataset order, shared by every record of one snapshot
    pub headers: Arc<[String]>,

    /// Field values keyed by header name
    pub fields: HashMap<String, String>,
}

impl StudentRecord {
    pub fn new(index: usize, headers: Arc<[String]>, values: Vec<String>) -> Self {
        let mut fields = HashMap::with_capacity(headers.len());
        for (idx, header) in headers.iter().enumerate() {
            let value = values.get(idx).cloned().unwrap_or_default();
            // first column wins on duplicate header names
            fields.entry(header.clone()).or_insert(value);
        }
        Self {
            index,
            headers,
            fields,
        }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    /// Field value, `None` when the column is absent or blank.
    pub fn non_empty(&self, field: &str) -> Option<&str> {
        self.get(field)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    pub fn normalized_key(&self, key_field: &str) -> Option<String> {
        self.non_empty(key_field).map(normalize_email)
    }
}
