//! Building typed records from cast field values.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::{
    definition::RecordDefinition,
    value::{FieldValues, Value},
};

/// A field could not be assigned while building a record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot assign field `{field}`: {message}")]
pub struct AssignError {
    field: String,
    message: String,
}

impl AssignError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Instantiates a record from the cast values of one row.
///
/// Every bound field is present in `values`, already cast to the field's declared type (or
/// null for nullable fields). Implementations usually call [`FieldValues::take`] once per
/// field.
pub trait FromRow: Sized {
    fn from_row(values: &mut FieldValues) -> Result<Self, AssignError>;
}

/// A record type that carries its own definition.
pub trait Record: FromRow {
    fn definition() -> RecordDefinition;
}

/// A record whose fields are only known at runtime, such as one described by a YAML file.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DynamicRecord {
    values: FieldValues,
}

impl DynamicRecord {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_values(self) -> FieldValues {
        self.values
    }
}

impl FromRow for DynamicRecord {
    fn from_row(values: &mut FieldValues) -> Result<Self, AssignError> {
        Ok(Self {
            values: std::mem::take(values),
        })
    }
}

impl fmt::Display for DynamicRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (name, value) in self.values.iter() {
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            write!(f, "{name}={value}")?;
        }
        Ok(())
    }
}
