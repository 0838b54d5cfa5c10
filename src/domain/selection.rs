use serde::{Deserialize, Serialize};
use validator::Validate;

use super::error::{AppError, Result};

/// Header row of the selection log.
pub const SELECTION_HEADER: [&str; 2] = ["Email", "Course Prefix"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SelectionEvent {
    #[validate(length(min = 1, max = 320))]
    pub email: String,
    #[validate(length(min = 1, max = 64))]
    pub course_prefix: String,
}

impl SelectionEvent {
    /// Builds a validated event. Surrounding whitespace is dropped before validation.
    pub fn new(email: &str, course_prefix: &str) -> Result<Self> {
        let event = Self {
            email: email.trim().to_string(),
            course_prefix: course_prefix.trim().to_string(),
        };
        event
            .validate()
            .map_err(|e| AppError::ValidationError(e.to_string()))?;
        Ok(event)
    }

    /// Row values in `SELECTION_HEADER` order.
    pub fn to_row(&self) -> [&str; 2] {
        [self.email.as_str(), self.course_prefix.as_str()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_selection() {
        let event = SelectionEvent::new(" a@b.com ", "COP3530").unwrap();
        assert_eq!(event.to_row(), ["a@b.com", "COP3530"]);
    }

    #[test]
    fn test_empty_fields_rejected() {
        assert!(matches!(
            SelectionEvent::new("", "COP3530"),
            Err(AppError::ValidationError(_))
        ));
        assert!(matches!(
            SelectionEvent::new("a@b.com", "   "),
            Err(AppError::ValidationError(_))
        ));
    }

    #[test]
    fn test_deserializes_camel_case_body() {
        let event: SelectionEvent =
            serde_json::from_str(r#"{"email":"a@b.com","coursePrefix":"COP3530"}"#).unwrap();
        assert_eq!(event.course_prefix, "COP3530");
    }
}
