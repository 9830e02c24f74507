//! Declarative description of a record type: header layout, column bindings, field types,
//! validation rules and caster configuration.
//!
//! A [`RecordDefinition`] is either written in code by a [`crate::record::Record`]
//! implementation or loaded from YAML by [`crate::schema_file`]. Nothing here is checked
//! until [`crate::schema::Schema::assemble`] runs.

use std::{collections::BTreeMap, fmt, sync::Arc};

use crate::{
    casters::Caster,
    types::{CastTarget, TypeKey},
    value::{FieldValue, Value},
};

/// A column reference as written in a header: a zero-based index or a spreadsheet letter
/// name such as `B` or `AA`. Digit-only names are read as indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnRef {
    Index(usize),
    Name(String),
}

impl From<usize> for ColumnRef {
    fn from(value: usize) -> Self {
        ColumnRef::Index(value)
    }
}

impl From<&str> for ColumnRef {
    fn from(value: &str) -> Self {
        ColumnRef::Name(value.to_string())
    }
}

impl From<String> for ColumnRef {
    fn from(value: String) -> Self {
        ColumnRef::Name(value)
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnRef::Index(index) => write!(f, "{index}"),
            ColumnRef::Name(name) => f.write_str(name),
        }
    }
}

/// Header layout of the input: how many rows to skip and which column feeds which field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Header {
    pub rows: usize,
    pub columns: Vec<(ColumnRef, String)>,
    pub messages: BTreeMap<String, String>,
    pub stop_on_first_failure: bool,
}

impl Header {
    /// A header occupying `rows` leading rows.
    pub fn new(rows: usize) -> Self {
        Self {
            rows,
            ..Self::default()
        }
    }

    /// Input without header rows.
    pub fn none() -> Self {
        Self::new(0)
    }

    pub fn column(mut self, column: impl Into<ColumnRef>, field: impl Into<String>) -> Self {
        self.columns.push((column.into(), field.into()));
        self
    }

    /// A message shared by every field, keyed by rule name (`required`) or by
    /// `field.rule`.
    pub fn message(mut self, key: impl Into<String>, message: impl Into<String>) -> Self {
        self.messages.insert(key.into(), message.into());
        self
    }

    pub fn stop_on_first_failure(mut self, stop: bool) -> Self {
        self.stop_on_first_failure = stop;
        self
    }
}

/// Binding of a field to an input column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Column {
    pub rule: Option<String>,
    pub format: Option<String>,
    pub messages: BTreeMap<String, String>,
    /// Rows whose cell for this column is empty are skipped without being counted.
    pub mandatory: bool,
    /// Name of a caster in the definition's caster map, overriding the type lookup.
    pub caster: Option<String>,
}

impl Column {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rule(mut self, rule: impl Into<String>) -> Self {
        self.rule = Some(rule.into());
        self
    }

    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// A message for one of this column's rules, keyed by rule name.
    pub fn message(mut self, rule: impl Into<String>, message: impl Into<String>) -> Self {
        self.messages.insert(rule.into(), message.into());
        self
    }

    pub fn mandatory(mut self) -> Self {
        self.mandatory = true;
        self
    }

    pub fn caster(mut self, alias: impl Into<String>) -> Self {
        self.caster = Some(alias.into());
        self
    }
}

/// A declared record field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: String,
    /// `None` when the field was declared without a type; assembly rejects it.
    pub type_key: Option<TypeKey>,
    pub nullable: bool,
    pub column: Option<Column>,
    /// Used when the row supplies no value for the field.
    pub default: Option<Value>,
}

impl FieldSpec {
    /// A field of Rust type `T`. `Option<T>` fields are nullable.
    pub fn of<T: FieldValue>(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_key: Some(T::type_key()),
            nullable: T::admits_null(),
            column: None,
            default: None,
        }
    }

    /// A field typed by key, for types the caller only knows by name.
    pub fn typed(name: impl Into<String>, key: impl Into<TypeKey>) -> Self {
        Self {
            name: name.into(),
            type_key: Some(key.into()),
            nullable: false,
            column: None,
            default: None,
        }
    }

    pub fn untyped(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_key: None,
            nullable: false,
            column: None,
            default: None,
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn column(mut self, column: Column) -> Self {
        self.column = Some(column);
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }
}

/// Everything needed to assemble a schema for one record type.
#[derive(Clone, Default)]
pub struct RecordDefinition {
    pub header: Option<Header>,
    pub fields: Vec<FieldSpec>,
    /// Casters keyed by alias or by type name. They take precedence over the parser's
    /// registry.
    pub casters: BTreeMap<String, Arc<dyn Caster>>,
}

impl fmt::Debug for RecordDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordDefinition")
            .field("header", &self.header)
            .field("fields", &self.fields)
            .field("casters", &self.casters.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl RecordDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(mut self, header: Header) -> Self {
        self.header = Some(header);
        self
    }

    pub fn field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    /// Registers a caster under an alias or a type name. `date` and `number` expand to
    /// every key of their group and stay usable as column aliases; known type names are
    /// stored under their canonical name.
    pub fn caster(self, key: &str, caster: impl Caster + 'static) -> Self {
        self.shared_caster(key, Arc::new(caster))
    }

    pub fn shared_caster(mut self, key: &str, caster: Arc<dyn Caster>) -> Self {
        let target = CastTarget::from(key);
        if !matches!(target, CastTarget::Key(_)) {
            self.casters
                .insert(TypeKey::parse(key).name().to_string(), Arc::clone(&caster));
        }
        for resolved in target.resolve() {
            self.casters
                .insert(resolved.name().to_string(), Arc::clone(&caster));
        }
        self
    }

    pub fn field_spec(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|field| field.name == name)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::casters::IntCaster;

    #[test]
    fn field_types_come_from_rust_types() {
        let id = FieldSpec::of::<i64>("id");
        assert_eq!(id.type_key, Some(TypeKey::Int));
        assert!(!id.nullable);

        let born = FieldSpec::of::<Option<NaiveDate>>("born");
        assert_eq!(born.type_key, Some(TypeKey::NaiveDate));
        assert!(born.nullable);

        assert!(FieldSpec::typed("price", "Money").nullable().nullable);
        assert_eq!(FieldSpec::untyped("x").type_key, None);
    }

    #[test]
    fn header_builder_keeps_declaration_order() {
        let header = Header::new(2)
            .column("B", "name")
            .column(0usize, "id")
            .message("required", "missing")
            .stop_on_first_failure(true);
        assert_eq!(header.rows, 2);
        assert_eq!(
            header.columns,
            vec![
                (ColumnRef::Name("B".to_string()), "name".to_string()),
                (ColumnRef::Index(0), "id".to_string()),
            ]
        );
        assert!(header.stop_on_first_failure);
        assert_eq!(Header::none().rows, 0);
    }

    #[test]
    fn caster_keys_are_canonicalised() {
        let definition = RecordDefinition::new()
            .caster("Integer", IntCaster::new())
            .caster("number", IntCaster::new())
            .caster("price_usd", IntCaster::new());
        let keys = definition.casters.keys().cloned().collect::<Vec<_>>();
        assert_eq!(keys, vec!["float", "int", "number", "price_usd"]);
    }
}
