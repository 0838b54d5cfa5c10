// ============================================================
// CSV PARSER
// ============================================================
// Reads header-defined CSV datasets with BOM-aware decoding

use std::path::Path;
use std::sync::Arc;

use csv::{ReaderBuilder, Trim};
use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};

use crate::domain::error::{AppError, Result};
use crate::domain::student::StudentRecord;

/// Header row plus data rows of one parsed file
#[derive(Debug, Clone)]
pub struct ParsedCsv {
    /// Shared with every record in `records`
    pub headers: Arc<[String]>,
    pub records: Vec<StudentRecord>,
}

/// CSV parser with encoding detection
pub struct CsvParser {
    /// Delimiter character (default: comma)
    delimiter: u8,
}

impl Default for CsvParser {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

impl CsvParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tab-separated exports use the same header-row layout.
    pub fn tab_separated() -> Self {
        Self { delimiter: b'\t' }
    }

    /// Parse a CSV file. Unreadable files and missing headers are `DatasetReadError`s.
    pub fn parse_file(&self, path: &Path) -> Result<ParsedCsv> {
        let bytes = std::fs::read(path).map_err(|e| {
            AppError::DatasetReadError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let content = decode(&bytes);
        self.parse_content(&content)
    }

    pub fn parse_content(&self, content: &str) -> Result<ParsedCsv> {
        let mut reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .trim(Trim::None)
            .flexible(true) // Allow rows with different lengths
            .from_reader(content.as_bytes());

        let headers: Arc<[String]> = reader
            .headers()
            .map_err(|e| AppError::DatasetReadError(format!("Failed to read CSV headers: {}", e)))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        if headers.iter().all(|h| h.is_empty()) {
            return Err(AppError::DatasetReadError(
                "CSV header row has no columns".to_string(),
            ));
        }

        let mut records = Vec::new();
        for (index, result) in reader.records().enumerate() {
            let record = result.map_err(|e| {
                AppError::DatasetReadError(format!("Failed to parse CSV row {}: {}", index + 1, e))
            })?;
            let values = record.iter().map(str::to_string).collect();
            records.push(StudentRecord::new(index, Arc::clone(&headers), values));
        }

        Ok(ParsedCsv { headers, records })
    }
}

/// Decode raw file bytes, honouring a BOM when present and falling back to
/// Windows-1252 for files that are not valid UTF-8.
fn decode(bytes: &[u8]) -> String {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        let (content, _) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
        return content.into_owned();
    }

    match UTF_8.decode_without_bom_handling_and_without_replacement(bytes) {
        Some(content) => content.into_owned(),
        None => {
            let (content, _) = WINDOWS_1252.decode_without_bom_handling(bytes);
            content.into_owned()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_csv() {
        let content = "name,age,city\nAlice,30,NYC\nBob,25,LA";
        let parsed = CsvParser::new().parse_content(content).unwrap();

        assert_eq!(&parsed.headers[..], ["name", "age", "city"]);
        assert_eq!(parsed.records.len(), 2);
        assert_eq!(parsed.records[0].get("name"), Some("Alice"));
        assert_eq!(parsed.records[1].get("city"), Some("LA"));
    }

    #[test]
    fn test_records_share_one_header_list() {
        let parsed = CsvParser::new()
            .parse_content("shib_mail,GPA
a@ufl.edu,3.1
b@ufl.edu,3.4
")
            .unwrap();
        assert!(parsed
            .records
            .iter()
            .all(|record| Arc::ptr_eq(&record.headers, &parsed.headers)));
    }

    #[test]
    fn test_quoted_fields_and_ragged_rows() {
        let content = "shib_mail,Interests\n\"a@b.com\",\"Systems, compilers\"\nc@d.com";
        let parsed = CsvParser::new().parse_content(content).unwrap();
        assert_eq!(parsed.records[0].get("Interests"), Some("Systems, compilers"));
        assert_eq!(parsed.records[1].get("Interests"), Some(""));
    }

    #[test]
    fn test_empty_content_is_malformed() {
        let result = CsvParser::new().parse_content("");
        assert!(matches!(result, Err(AppError::DatasetReadError(_))));
    }

    #[test]
    fn test_decode_strips_utf8_bom() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b"shib_mail\njane@ufl.edu\n");
        let parsed = CsvParser::new().parse_content(&decode(&bytes)).unwrap();
        assert_eq!(&parsed.headers[..], ["shib_mail"]);
    }

    #[test]
    fn test_decode_falls_back_to_windows_1252() {
        let bytes = b"name\nJos\xe9\n";
        assert_eq!(decode(bytes), "name\nJos\u{e9}\n");
    }

    #[test]
    fn test_tab_separated() {
        let parsed = CsvParser::tab_separated()
            .parse_content("shib_mail\tGPA\njane@ufl.edu\t3.8\n")
            .unwrap();
        assert_eq!(parsed.records[0].get("GPA"), Some("3.8"));
    }

    #[test]
    fn test_missing_file_is_dataset_read_error() {
        let result = CsvParser::new().parse_file(Path::new("/definitely/not/here.csv"));
        assert!(matches!(result, Err(AppError::DatasetReadError(_))));
    }
}
