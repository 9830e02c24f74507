//! YAML record definitions.
//!
//! ```yaml
//! header:
//!   rows: 1
//!   columns: { A: name, B: age, C: price }
//!   messages: { required: "The :attribute column is empty" }
//! fields:
//!   - { name: name, type: string, rule: required, mandatory: true }
//!   - { name: age, type: "?int", rule: "integer|min:0" }
//!   - { name: price, type: float, caster: price_eu, format: "2" }
//! casters:
//!   price_eu: { kind: float, decimal_separator: ",", thousands_separator: "." }
//! ```
//!
//! `no_header:` takes the same keys as `header:` except `rows`. Field types accept the
//! nullable spellings `?T`, `T|null`, `null|T` and `Option<T>`.

use std::{collections::BTreeMap, fs, path::Path, sync::Arc};

use log::info;
use serde::Deserialize;

use crate::{
    casters::{
        BoolCaster, Caster, DateCaster, FloatCaster, IntCaster, LetterCase, StringCaster,
        parse_utc_offset,
    },
    definition::{Column, ColumnRef, FieldSpec, Header, RecordDefinition},
    error::{Error, Result},
    types::DeclaredType,
    value::Value,
};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DefinitionFile {
    #[serde(default)]
    header: Option<HeaderFile>,
    #[serde(default)]
    no_header: Option<HeaderFile>,
    #[serde(default)]
    fields: Vec<FieldFile>,
    #[serde(default)]
    casters: BTreeMap<String, CasterDef>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct HeaderFile {
    #[serde(default)]
    rows: Option<usize>,
    #[serde(default)]
    columns: serde_yaml::Mapping,
    #[serde(default)]
    messages: BTreeMap<String, String>,
    #[serde(default)]
    stop_on_first_failure: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FieldFile {
    name: String,
    #[serde(default, rename = "type")]
    datatype: Option<String>,
    #[serde(default)]
    rule: Option<String>,
    #[serde(default)]
    format: Option<String>,
    #[serde(default)]
    messages: BTreeMap<String, String>,
    #[serde(default)]
    mandatory: bool,
    #[serde(default)]
    caster: Option<String>,
    #[serde(default)]
    default: Option<Value>,
    /// Set to `false` for fields that only carry a default.
    #[serde(default = "default_bound")]
    column: bool,
}

fn default_bound() -> bool {
    true
}

/// A caster declared in a definition file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CasterDef {
    Int {
        #[serde(default)]
        allow_null: bool,
        #[serde(default)]
        min: Option<i64>,
        #[serde(default)]
        max: Option<i64>,
    },
    Float {
        #[serde(default)]
        allow_null: bool,
        #[serde(default)]
        min: Option<f64>,
        #[serde(default)]
        max: Option<f64>,
        #[serde(default)]
        allow_nan: bool,
        #[serde(default)]
        allow_infinity: bool,
        #[serde(default)]
        decimal_separator: Option<String>,
        #[serde(default)]
        thousands_separator: Option<String>,
        #[serde(default)]
        precision: Option<u32>,
    },
    Bool {
        #[serde(default)]
        strict: Option<bool>,
        #[serde(default)]
        true_values: Option<Vec<String>>,
        #[serde(default)]
        false_values: Option<Vec<String>>,
    },
    String {
        #[serde(default)]
        allow_null: Option<bool>,
        #[serde(default)]
        trim: Option<bool>,
        #[serde(default)]
        case: Option<LetterCase>,
    },
    Date {
        #[serde(default)]
        timezone: Option<String>,
        #[serde(default)]
        fallback_formats: Vec<String>,
    },
}

impl CasterDef {
    pub fn build(&self) -> Result<Arc<dyn Caster>> {
        let caster: Arc<dyn Caster> = match self {
            CasterDef::Int {
                allow_null,
                min,
                max,
            } => Arc::new(IntCaster::new().allow_null(*allow_null).range(*min, *max)),
            CasterDef::Float {
                allow_null,
                min,
                max,
                allow_nan,
                allow_infinity,
                decimal_separator,
                thousands_separator,
                precision,
            } => {
                let mut caster = FloatCaster::new()
                    .allow_null(*allow_null)
                    .allow_nan(*allow_nan)
                    .allow_infinity(*allow_infinity)
                    .separators(
                        decimal_separator.as_deref().unwrap_or("."),
                        thousands_separator.as_deref().unwrap_or(""),
                    )
                    .precision(*precision);
                if let Some(min) = min {
                    caster = caster.min(*min);
                }
                if let Some(max) = max {
                    caster = caster.max(*max);
                }
                Arc::new(caster)
            }
            CasterDef::Bool {
                strict,
                true_values,
                false_values,
            } => {
                let mut caster = BoolCaster::new();
                if true_values.is_some() || false_values.is_some() {
                    let defaults = BoolCaster::new();
                    caster = caster.vocabulary(
                        true_values
                            .clone()
                            .unwrap_or_else(|| defaults.true_values().to_vec()),
                        false_values
                            .clone()
                            .unwrap_or_else(|| defaults.false_values().to_vec()),
                    );
                }
                if let Some(strict) = strict {
                    caster = caster.strict(*strict);
                }
                Arc::new(caster)
            }
            CasterDef::String {
                allow_null,
                trim,
                case,
            } => Arc::new(
                StringCaster::new()
                    .allow_null(allow_null.unwrap_or(true))
                    .trim(trim.unwrap_or(true))
                    .case(*case),
            ),
            CasterDef::Date {
                timezone,
                fallback_formats,
            } => {
                let offset = timezone
                    .as_deref()
                    .map(parse_utc_offset)
                    .transpose()
                    .map_err(Error::Configuration)?;
                Arc::new(
                    DateCaster::new()
                        .timezone(offset)
                        .fallback_formats(fallback_formats.iter().cloned()),
                )
            }
        };
        Ok(caster)
    }
}

/// Reads a record definition from a YAML file.
pub fn load_definition(path: &Path) -> Result<RecordDefinition> {
    let raw = fs::read_to_string(path)?;
    let definition = parse_definition(&raw)?;
    info!(
        "Loaded record definition from {path:?}: {} field(s), {} caster(s)",
        definition.fields.len(),
        definition.casters.len()
    );
    Ok(definition)
}

/// Parses a record definition from YAML text.
pub fn parse_definition(raw: &str) -> Result<RecordDefinition> {
    let file: DefinitionFile = serde_yaml::from_str(raw)?;
    file.into_definition()
}

impl DefinitionFile {
    fn into_definition(self) -> Result<RecordDefinition> {
        let mut definition = RecordDefinition::new();

        definition.header = match (self.header, self.no_header) {
            (Some(_), Some(_)) => {
                return Err(Error::configuration(
                    "a definition cannot declare both `header` and `no_header`",
                ));
            }
            (Some(header), None) => {
                let rows = header.rows.unwrap_or(1);
                Some(header.into_header(rows)?)
            }
            (None, Some(header)) => {
                if header.rows.is_some_and(|rows| rows != 0) {
                    return Err(Error::configuration("`no_header` cannot declare header rows"));
                }
                Some(header.into_header(0)?)
            }
            (None, None) => None,
        };

        for field in self.fields {
            definition = definition.field(field.into_spec()?);
        }
        for (key, caster) in &self.casters {
            definition = definition.shared_caster(key, caster.build()?);
        }
        Ok(definition)
    }
}

impl HeaderFile {
    fn into_header(self, rows: usize) -> Result<Header> {
        let mut header = Header::new(rows).stop_on_first_failure(self.stop_on_first_failure);
        header.messages = self.messages;
        for (column, field) in self.columns {
            let reference = match column {
                serde_yaml::Value::Number(number) => number
                    .as_u64()
                    .and_then(|n| usize::try_from(n).ok())
                    .map(ColumnRef::Index),
                serde_yaml::Value::String(name) => Some(ColumnRef::Name(name)),
                _ => None,
            }
            .ok_or_else(|| {
                Error::configuration("header column keys must be indices or letter names")
            })?;
            let field = match field {
                serde_yaml::Value::String(field) => field,
                _ => {
                    return Err(Error::configuration(format!(
                        "header column `{reference}` must map to a field name"
                    )));
                }
            };
            header = header.column(reference, field);
        }
        Ok(header)
    }
}

impl FieldFile {
    fn into_spec(self) -> Result<FieldSpec> {
        let mut spec = match &self.datatype {
            Some(raw) => {
                let declared: DeclaredType = raw.parse().map_err(|message| {
                    Error::configuration(format!("field `{}`: {message}", self.name))
                })?;
                let spec = FieldSpec::typed(&self.name, declared.key);
                if declared.nullable { spec.nullable() } else { spec }
            }
            None => FieldSpec::untyped(&self.name),
        };
        if self.column {
            let mut column = Column::new();
            column.rule = self.rule;
            column.format = self.format;
            column.messages = self.messages;
            column.mandatory = self.mandatory;
            column.caster = self.caster;
            spec = spec.column(column);
        }
        if let Some(default) = self.default {
            spec = spec.default_value(default);
        }
        Ok(spec)
    }
}
