//! Error taxonomy shared by schema assembly, the row pipeline and the result stream.
//!
//! Hard failures (bad configuration, double consumption of a stream, an aborted stream)
//! travel through [`Error`]. Per-row failures are described by [`RowError`]; the pipeline
//! reports them as data and only promotes them to [`Error::Validation`] or [`Error::Cast`]
//! when a schema asks to stop on the first failure.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::value::Value;

/// Convenience result type for parser operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Malformed record definition, or a field whose type has no caster.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A row failed its declared rules, or the record could not be built from it.
    #[error("validation failed: {0}")]
    Validation(RowError),

    /// A cell could not be converted to the declared field type.
    #[error("cast failed: {0}")]
    Cast(RowError),

    /// A [`crate::result::ParseResult`] was consumed more than once.
    #[error("stream state error: {0}")]
    StreamState(&'static str),

    /// The error callback asked the stream to stop.
    #[error("processing aborted at row {row}: {reason}")]
    Aborted { row: usize, reason: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration(message.into())
    }

    /// The row-level failure carried by this error, if any.
    pub fn row_error(&self) -> Option<&RowError> {
        match self {
            Error::Validation(row) | Error::Cast(row) => Some(row),
            _ => None,
        }
    }
}

impl From<RowError> for Error {
    fn from(error: RowError) -> Self {
        match error.kind {
            RowErrorKind::Validation => Error::Validation(error),
            RowErrorKind::Cast => Error::Cast(error),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowErrorKind {
    Validation,
    Cast,
}

/// Failure of a single input row.
///
/// `row` is the zero-based position of the row in the original, unfiltered input, so header
/// rows and skipped rows still count towards it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowError {
    pub row: usize,
    pub kind: RowErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl RowError {
    pub fn validation(row: usize, message: impl Into<String>) -> Self {
        Self {
            row,
            kind: RowErrorKind::Validation,
            message: message.into(),
            field: None,
            expected_type: None,
            value: None,
        }
    }

    pub fn cast(
        row: usize,
        field: &str,
        expected_type: impl Into<String>,
        value: Value,
        details: &str,
    ) -> Self {
        let expected_type = expected_type.into();
        let mut message = format!(
            "Cannot convert value {} to type \"{}\" for field \"{}\"",
            describe_value(&value),
            expected_type,
            field
        );
        if !details.is_empty() {
            message.push_str(". ");
            message.push_str(details);
        }
        Self {
            row,
            kind: RowErrorKind::Cast,
            message,
            field: Some(field.to_string()),
            expected_type: Some(expected_type),
            value: Some(value),
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }
}

impl fmt::Display for RowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {}: {}", self.row, self.message)
    }
}

fn describe_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::String(s) => format!("\"{s}\""),
        other => other.as_display(),
    }
}
