//! Per-row state machine: filter, map, validate, cast, instantiate.

use std::{marker::PhantomData, sync::Arc};

use clap::ValueEnum;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    casters::Caster,
    error::RowError,
    record::FromRow,
    schema::Schema,
    validator::Validator,
    value::{FieldValues, Value},
};

/// What counts as an empty cell when checking mandatory columns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EmptyCellPolicy {
    /// Null, `""`, `false`, `0`, `0.0` and `"0"`.
    #[default]
    Falsy,
    /// Only null and `""`.
    Blank,
}

impl EmptyCellPolicy {
    pub fn is_empty(self, value: &Value) -> bool {
        match self {
            EmptyCellPolicy::Falsy => value.is_falsy(),
            EmptyCellPolicy::Blank => value.is_blank(),
        }
    }
}

/// Terminal state of one qualifying row.
#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome<R> {
    Parsed(R),
    Failed(RowError),
}

#[derive(Clone)]
pub(crate) struct Pipeline {
    schema: Arc<Schema>,
    validator: Arc<dyn Validator>,
    empty_cells: EmptyCellPolicy,
    /// One caster per bound field, in schema order. Empty when only validating.
    casters: Vec<Arc<dyn Caster>>,
}

impl Pipeline {
    pub(crate) fn new(
        schema: Arc<Schema>,
        validator: Arc<dyn Validator>,
        empty_cells: EmptyCellPolicy,
    ) -> Self {
        Self {
            schema,
            validator,
            empty_cells,
            casters: Vec::new(),
        }
    }

    pub(crate) fn with_casters(mut self, casters: Vec<Arc<dyn Caster>>) -> Self {
        self.casters = casters;
        self
    }

    pub(crate) fn stop_on_first_failure(&self) -> bool {
        self.schema.stop_on_first_failure
    }

    /// Header rows and rows with an empty mandatory cell are dropped without being counted.
    pub(crate) fn accepts(&self, index: usize, row: &[Value]) -> bool {
        if index < self.schema.header_rows {
            debug!("Skipping header row {index}");
            return false;
        }
        for name in &self.schema.mandatory_fields {
            let column = self.schema.column_index[name];
            let empty = row
                .get(column)
                .is_none_or(|cell| self.empty_cells.is_empty(cell));
            if empty {
                debug!("Skipping row {index}: mandatory field `{name}` is empty");
                return false;
            }
        }
        true
    }

    /// Several fields may read the same column, so cells are cloned rather than moved.
    fn map_row(&self, row: &[Value]) -> FieldValues {
        self.schema
            .fields
            .iter()
            .map(|field| {
                let value = row.get(field.column).cloned().unwrap_or_default();
                (field.name.clone(), value)
            })
            .collect()
    }

    pub(crate) fn validate(&self, index: usize, row: Vec<Value>) -> Result<FieldValues, RowError> {
        let mapped = self.map_row(&row);
        let validation = self.validator.validate(
            &mapped,
            &self.schema.field_rules,
            &self.schema.field_messages,
        );
        if validation.fails() {
            return Err(RowError::validation(index, validation.messages_json()));
        }
        Ok(validation.into_data())
    }

    pub(crate) fn process<R: FromRow>(&self, index: usize, row: Vec<Value>) -> RowOutcome<R> {
        let outcome = self
            .validate(index, row)
            .and_then(|validated| self.cast(index, validated))
            .and_then(|mut values| {
                R::from_row(&mut values).map_err(|err| {
                    RowError::validation(index, err.to_string()).with_field(err.field())
                })
            });
        match outcome {
            Ok(record) => RowOutcome::Parsed(record),
            Err(error) => {
                debug!("Row {index} failed: {}", error.message);
                RowOutcome::Failed(error)
            }
        }
    }

    fn cast(&self, index: usize, mut validated: FieldValues) -> Result<FieldValues, RowError> {
        let mut values = FieldValues::new();
        for (name, default) in &self.schema.unbound_defaults {
            values.insert(name.clone(), default.clone());
        }

        for (field, caster) in self.schema.fields.iter().zip(&self.casters) {
            let mut value = match validated.remove(&field.name) {
                Some(value) if !value.is_null() => value,
                _ => field.default.clone().unwrap_or_default(),
            };
            if field.nullable && matches!(&value, Value::String(s) if s.is_empty()) {
                value = Value::Null;
            }

            if value.is_null() {
                if field.nullable {
                    values.insert(field.name.clone(), Value::Null);
                    continue;
                }
                return Err(RowError::cast(
                    index,
                    &field.name,
                    field.type_key.name(),
                    Value::Null,
                    "Value cannot be null for non-nullable field",
                ));
            }

            let cast = caster
                .cast(&value, field.format.as_deref())
                .map_err(|failure| {
                    RowError::cast(
                        index,
                        &field.name,
                        field.type_key.name(),
                        value.clone(),
                        failure.message(),
                    )
                })?;
            values.insert(field.name.clone(), cast);
        }
        Ok(values)
    }
}

/// Lazily turns source rows into outcomes, tagging each with its index in the source.
pub(crate) struct Rows<'a, R> {
    source: Box<dyn Iterator<Item = Vec<Value>> + 'a>,
    pipeline: Pipeline,
    next_index: usize,
    record: PhantomData<fn() -> R>,
}

impl<'a, R> Rows<'a, R> {
    pub(crate) fn new(source: Box<dyn Iterator<Item = Vec<Value>> + 'a>, pipeline: Pipeline) -> Self {
        Self {
            source,
            pipeline,
            next_index: 0,
            record: PhantomData,
        }
    }

    pub(crate) fn stop_on_first_failure(&self) -> bool {
        self.pipeline.stop_on_first_failure()
    }
}

impl<R: FromRow> Iterator for Rows<'_, R> {
    type Item = (usize, RowOutcome<R>);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let row = self.source.next()?;
            let index = self.next_index;
            self.next_index += 1;
            if self.pipeline.accepts(index, &row) {
                return Some((index, self.pipeline.process(index, row)));
            }
        }
    }
}
