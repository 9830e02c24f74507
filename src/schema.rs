//! Schema assembly.
//!
//! [`Schema::assemble`] checks a [`RecordDefinition`] once and flattens it into the tables
//! the row pipeline reads: column indices, mandatory fields, nullability and the validation
//! rule/message maps.

use std::collections::{BTreeMap, BTreeSet};

use log::debug;

use crate::{
    definition::{ColumnRef, RecordDefinition},
    error::{Error, Result},
    types::TypeKey,
    value::Value,
};

/// A field bound to an input column, in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundField {
    pub name: String,
    pub column: usize,
    pub type_key: TypeKey,
    pub nullable: bool,
    pub mandatory: bool,
    pub format: Option<String>,
    pub caster: Option<String>,
    pub default: Option<Value>,
}

/// Immutable result of assembling a record definition.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    pub header_rows: usize,
    pub stop_on_first_failure: bool,
    pub fields: Vec<BoundField>,
    /// Defaults of declared fields that have no column binding.
    pub unbound_defaults: BTreeMap<String, Value>,
    pub column_index: BTreeMap<String, usize>,
    pub mandatory_fields: Vec<String>,
    pub field_rules: BTreeMap<String, String>,
    pub field_messages: BTreeMap<String, String>,
    pub nullable_fields: BTreeSet<String>,
}

impl Schema {
    pub fn assemble(definition: &RecordDefinition) -> Result<Self> {
        let header = definition.header.as_ref().ok_or_else(|| {
            Error::configuration("record definition declares neither a header nor a headerless layout")
        })?;
        if header.columns.is_empty() {
            return Err(Error::configuration(
                "at least one column must be specified in the header",
            ));
        }

        let mut fields = Vec::new();
        let mut unbound_defaults = BTreeMap::new();
        let mut nullable_fields = BTreeSet::new();

        for spec in &definition.fields {
            let type_key = spec.type_key.clone().ok_or_else(|| {
                Error::configuration(format!(
                    "field `{}` must have an explicitly declared type",
                    spec.name
                ))
            })?;
            if spec.nullable {
                nullable_fields.insert(spec.name.clone());
            }

            let Some(column) = &spec.column else {
                if let Some(default) = &spec.default {
                    unbound_defaults.insert(spec.name.clone(), default.clone());
                }
                continue;
            };

            let reference = header
                .columns
                .iter()
                .find(|(_, field)| field == &spec.name)
                .map(|(reference, _)| reference)
                .ok_or_else(|| {
                    Error::configuration(format!(
                        "field `{}` is not named in the header columns",
                        spec.name
                    ))
                })?;
            let index = resolve_column(reference).map_err(|message| {
                Error::configuration(format!("column for field `{}`: {message}", spec.name))
            })?;

            fields.push(BoundField {
                name: spec.name.clone(),
                column: index,
                type_key,
                nullable: spec.nullable,
                mandatory: column.mandatory,
                format: column.format.clone(),
                caster: column.caster.clone(),
                default: spec.default.clone(),
            });
        }

        if fields.is_empty() {
            return Err(Error::configuration("no field declares a column binding"));
        }
        if header.columns.len() != fields.len() {
            return Err(Error::configuration(format!(
                "header declares {} column(s) but {} field(s) are bound to columns",
                header.columns.len(),
                fields.len()
            )));
        }

        let mut field_rules = BTreeMap::new();
        let mut field_messages = header.messages.clone();
        for (field, column) in definition
            .fields
            .iter()
            .filter_map(|spec| spec.column.as_ref().map(|column| (spec, column)))
        {
            if let Some(rule) = &column.rule {
                field_rules.insert(field.name.clone(), rule.clone());
            }
            for (rule, message) in &column.messages {
                field_messages.insert(format!("{}.{rule}", field.name), message.clone());
            }
        }

        let column_index = fields
            .iter()
            .map(|field| (field.name.clone(), field.column))
            .collect::<BTreeMap<_, _>>();
        let mandatory_fields = fields
            .iter()
            .filter(|field| field.mandatory)
            .map(|field| field.name.clone())
            .collect::<Vec<_>>();

        debug!(
            "Assembled schema: {} header row(s), {} bound field(s), {} mandatory",
            header.rows,
            fields.len(),
            mandatory_fields.len()
        );

        Ok(Self {
            header_rows: header.rows,
            stop_on_first_failure: header.stop_on_first_failure,
            fields,
            unbound_defaults,
            column_index,
            mandatory_fields,
            field_rules,
            field_messages,
            nullable_fields,
        })
    }

    pub fn field(&self, name: &str) -> Option<&BoundField> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn is_nullable(&self, name: &str) -> bool {
        self.nullable_fields.contains(name)
    }
}

/// Resolves a header column reference to a zero-based index.
pub fn resolve_column(reference: &ColumnRef) -> std::result::Result<usize, String> {
    match reference {
        ColumnRef::Index(index) => Ok(*index),
        ColumnRef::Name(name) => {
            let trimmed = name.trim();
            if trimmed.is_empty() {
                return Err("empty column reference".to_string());
            }
            if trimmed.chars().all(|c| c.is_ascii_digit()) {
                return trimmed
                    .parse::<usize>()
                    .map_err(|_| format!("column index `{trimmed}` is too large"));
            }
            column_letters_to_index(trimmed)
        }
    }
}

/// `A` is 0, `Z` is 25, `AA` is 26. Case-insensitive.
pub fn column_letters_to_index(name: &str) -> std::result::Result<usize, String> {
    let mut value: usize = 0;
    for ch in name.chars() {
        if !ch.is_ascii_alphabetic() {
            return Err(format!("cannot resolve column reference `{name}`"));
        }
        let digit = (ch.to_ascii_uppercase() as u8 - b'A' + 1) as usize;
        value = value
            .checked_mul(26)
            .and_then(|v| v.checked_add(digit))
            .ok_or_else(|| format!("column reference `{name}` is too large"))?;
    }
    value
        .checked_sub(1)
        .ok_or_else(|| "empty column reference".to_string())
}
