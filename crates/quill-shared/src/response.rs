//! Response envelopes that are not tied to a single resource.
//!
//! Errors follow RFC 7807 (problem details), extended with a per-field
//! `errors` map for validation failures.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Plain acknowledgement, e.g. `{"message": "Post deleted successfully"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// RFC 7807 Problem Details for HTTP APIs.
///
/// See: https://datatracker.ietf.org/doc/html/rfc7807
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// A URI reference that identifies the problem type.
    #[serde(rename = "type")]
    pub error_type: String,

    /// A short, human-readable summary of the problem type.
    pub title: String,

    /// The HTTP status code.
    pub status: u16,

    /// A human-readable explanation specific to this occurrence.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub detail: Option<String>,

    /// Request ID for debugging purposes.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub request_id: Option<String>,

    /// Field name to messages, present on validation failures.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub errors: Option<BTreeMap<String, Vec<String>>>,
}

impl ErrorResponse {
    pub fn new(status: u16, title: impl Into<String>) -> Self {
        Self {
            error_type: "about:blank".to_string(),
            title: title.into(),
            status,
            detail: None,
            request_id: None,
            errors: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn with_errors(mut self, errors: BTreeMap<String, Vec<String>>) -> Self {
        self.errors = Some(errors);
        self
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(400, "Bad Request").with_detail(detail)
    }

    pub fn unauthorized() -> Self {
        Self::new(401, "Unauthorized")
    }

    /// Ownership failures answer with the same wording the old controllers used.
    pub fn forbidden() -> Self {
        Self::new(403, "Forbidden").with_detail("Unauthorized")
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::new(404, "Not Found").with_detail(detail)
    }

    pub fn unprocessable(errors: BTreeMap<String, Vec<String>>) -> Self {
        Self::new(422, "Unprocessable Entity")
            .with_detail("The given data was invalid.")
            .with_errors(errors)
    }

    pub fn internal_error() -> Self {
        Self::new(500, "Internal Server Error")
    }

    /// First message for a field, handy in tests and client-side forms.
    pub fn first_error(&self, field: &str) -> Option<&str> {
        self.errors
            .as_ref()?
            .get(field)?
            .first()
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_problem_serializes_errors_map() {
        let mut errors = BTreeMap::new();
        errors.insert(
            "title".to_string(),
            vec!["The title field is required.".to_string()],
        );

        let json = serde_json::to_value(ErrorResponse::unprocessable(errors)).unwrap();

        assert_eq!(json["status"], 422);
        assert_eq!(json["type"], "about:blank");
        assert_eq!(json["errors"]["title"][0], "The title field is required.");
        assert!(json.get("request_id").is_none());
    }

    #[test]
    fn first_error_reads_back_field_message() {
        let mut errors = BTreeMap::new();
        errors.insert("email".to_string(), vec!["taken".to_string()]);
        let problem = ErrorResponse::unprocessable(errors);

        assert_eq!(problem.first_error("email"), Some("taken"));
        assert_eq!(problem.first_error("name"), None);
        assert_eq!(ErrorResponse::unauthorized().first_error("email"), None);
    }
}
