use std::borrow::Cow;

use thiserror::Error;

/// Top-level error type returned by the search engine.
///
/// Unknown fields, unusable sort tokens and non-numeric page sizes are
/// recovered inside the engine and never show up here.
#[derive(Debug, Error)]
pub enum SearchError {
    /// One or more attribute values failed strict casting.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// A custom filter or sort handler rejected its input.
    #[error("handler for field '{field}' failed: {message}")]
    Handler { field: String, message: String },

    /// The search schema itself is malformed.
    #[error("invalid search schema: {message}")]
    Config { message: Cow<'static, str> },

    /// A typed accessor asked for a type the accepted value cannot convert to.
    #[error("field '{field}' cannot be read as {expected}")]
    Conversion { field: String, expected: &'static str },
}

impl SearchError {
    /// Convenience constructor used by custom handlers.
    pub fn handler(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Handler {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

/// Collection of validation issues encountered while filtering attributes.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{}", render_issues(.issues))]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationError {
    pub fn new<I>(issues: I) -> Self
    where
        I: IntoIterator<Item = ValidationIssue>,
    {
        Self {
            issues: issues.into_iter().collect(),
        }
    }

    /// Convenience helper for constructing a single-field validation error.
    pub fn single(field: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new([ValidationIssue::new(field, code, message)])
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// Names of every offending field, in the order they were reported.
    pub fn fields(&self) -> Vec<&str> {
        self.issues.iter().map(|issue| issue.field.as_str()).collect()
    }
}

/// Detailed validation failure for a single field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub field: String,
    pub code: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(field: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            code: code.into(),
            message: message.into(),
        }
    }
}

fn render_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|issue| format!("{}: {}", issue.field, issue.message))
        .collect::<Vec<_>>()
        .join("; ")
}

pub type SearchResult<T> = Result<T, SearchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_lists_every_issue() {
        let err = ValidationError::new([
            ValidationIssue::new("age", "cast", "expected integer"),
            ValidationIssue::new("born", "cast", "expected date"),
        ]);

        assert_eq!(err.fields(), vec!["age", "born"]);
        assert_eq!(err.to_string(), "age: expected integer; born: expected date");
    }

    #[test]
    fn search_error_wraps_validation() {
        let err: SearchError = ValidationError::single("age", "cast", "expected integer").into();
        assert!(matches!(err, SearchError::Validation(ref inner) if inner.issues.len() == 1));
        assert_eq!(err.to_string(), "validation failed: age: expected integer");
    }
}
