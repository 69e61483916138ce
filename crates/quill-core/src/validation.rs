//! Field-level input validation.
//!
//! Collects every failure instead of stopping at the first one, so a client
//! gets the whole `errors` map in one 422 response. Messages follow the
//! wording users of the old API already see ("The title field is required.").

use std::collections::BTreeMap;
use std::fmt;

use uuid::Uuid;

use crate::error::DomainError;

/// Field name to failure messages, in field order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single failure, for checks that run outside a [`Validator`].
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn into_map(self) -> BTreeMap<String, Vec<String>> {
        self.0
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<&str> = self.0.values().flatten().map(String::as_str).collect();
        write!(f, "{}", messages.join(" "))
    }
}

impl From<ValidationErrors> for DomainError {
    fn from(errors: ValidationErrors) -> Self {
        DomainError::Invalid(errors)
    }
}

/// Turns a field key like `social_links.0.url` into `social links.0.url` for messages.
fn label(field: &str) -> String {
    field.replace('_', " ")
}

/// Accumulates failures while extracting typed values from raw input.
///
/// Strings are trimmed first and empty strings count as missing.
#[derive(Debug, Default)]
pub struct Validator {
    errors: ValidationErrors,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&mut self, field: &str, message: impl Into<String>) {
        self.errors.add(field, message);
    }

    pub fn has_error(&self, field: &str) -> bool {
        self.errors.contains(field)
    }

    /// Trimmed value, or `None` when absent or blank. Never records an error.
    pub fn optional(&self, value: Option<&str>) -> Option<String> {
        value
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    pub fn required(&mut self, field: &str, value: Option<&str>) -> Option<String> {
        let value = self.optional(value);
        if value.is_none() {
            self.fail(field, format!("The {} field is required.", label(field)));
        }
        value
    }

    pub fn max_chars(&mut self, field: &str, value: &str, max: usize) -> bool {
        if value.chars().count() > max {
            self.fail(
                field,
                format!(
                    "The {} field must not be greater than {max} characters.",
                    label(field)
                ),
            );
            return false;
        }
        true
    }

    pub fn min_chars(&mut self, field: &str, value: &str, min: usize) -> bool {
        if value.chars().count() < min {
            self.fail(
                field,
                format!("The {} field must be at least {min} characters.", label(field)),
            );
            return false;
        }
        true
    }

    pub fn email(&mut self, field: &str, value: &str) -> bool {
        if !is_email(value) {
            self.fail(
                field,
                format!("The {} field must be a valid email address.", label(field)),
            );
            return false;
        }
        true
    }

    pub fn url(&mut self, field: &str, value: &str) -> bool {
        let valid = url::Url::parse(value)
            .map(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
            .unwrap_or(false);
        if !valid {
            self.fail(field, format!("The {} field must be a valid URL.", label(field)));
        }
        valid
    }

    pub fn uuid(&mut self, field: &str, value: &str) -> Option<Uuid> {
        match Uuid::parse_str(value) {
            Ok(id) => Some(id),
            Err(_) => {
                self.fail(field, format!("The selected {} is invalid.", label(field)));
                None
            }
        }
    }

    pub fn confirmed(&mut self, field: &str, value: &str, confirmation: Option<&str>) -> bool {
        if confirmation != Some(value) {
            self.fail(
                field,
                format!("The {} field confirmation does not match.", label(field)),
            );
            return false;
        }
        true
    }

    pub fn one_of<'a>(&mut self, field: &str, value: &str, allowed: &[&'a str]) -> Option<&'a str> {
        let found = allowed.iter().copied().find(|a| *a == value);
        if found.is_none() {
            self.fail(field, format!("The selected {} is invalid.", label(field)));
        }
        found
    }

    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    /// `Ok(())` when nothing failed.
    pub fn finish(self) -> Result<(), ValidationErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}

fn is_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && !domain.contains('@')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !value.chars().any(char::is_whitespace)
}
