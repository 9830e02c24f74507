//! Untyped cell values and their conversion into record field types.

use std::{collections::BTreeMap, fmt};

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{record::AssignError, types::TypeKey};

/// A single cell as delivered by a row source, and the result of casting it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    DateTime(DateTime<FixedOffset>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Null or the empty string.
    pub fn is_blank(&self) -> bool {
        match self {
            Value::Null => true,
            Value::String(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Blank, `false`, numeric zero, or the string `"0"`.
    pub fn is_falsy(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Bool(b) => !b,
            Value::Int(i) => *i == 0,
            Value::Float(f) => *f == 0.0,
            Value::String(s) => s.is_empty() || s == "0",
            Value::DateTime(_) => false,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::DateTime(_) => "datetime",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_display(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::String(s) => s.clone(),
            Value::DateTime(dt) => dt.to_rfc3339(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<DateTime<FixedOffset>> for Value {
    fn from(value: DateTime<FixedOffset>) -> Self {
        Value::DateTime(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::DateTime(value.fixed_offset())
    }
}

impl From<NaiveDateTime> for Value {
    fn from(value: NaiveDateTime) -> Self {
        Value::DateTime(value.and_utc().fixed_offset())
    }
}

impl From<NaiveDate> for Value {
    fn from(value: NaiveDate) -> Self {
        Value::from(value.and_time(NaiveTime::MIN))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

/// A Rust type that a record field can be declared as.
///
/// `type_key` selects the caster used for the field; `from_value` accepts the caster's
/// output. `Option<T>` admits null, which is how a record declares a nullable field.
pub trait FieldValue: Sized {
    fn type_key() -> TypeKey;

    fn admits_null() -> bool {
        false
    }

    fn from_value(value: Value) -> Result<Self, String>;
}

fn mismatch(expected: &str, value: &Value) -> String {
    format!("expected {expected}, got {}", value.type_name())
}

macro_rules! int_field_value {
    ($($ty:ty),*) => {
        $(
            impl FieldValue for $ty {
                fn type_key() -> TypeKey {
                    TypeKey::Int
                }

                fn from_value(value: Value) -> Result<Self, String> {
                    match value {
                        Value::Int(i) => <$ty>::try_from(i).map_err(|_| {
                            format!("value {i} is out of range for {}", stringify!($ty))
                        }),
                        other => Err(mismatch("int", &other)),
                    }
                }
            }
        )*
    };
}

int_field_value!(i64, i32, i16, u64, u32, u16, usize);

impl FieldValue for f64 {
    fn type_key() -> TypeKey {
        TypeKey::Float
    }

    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Float(f) => Ok(f),
            Value::Int(i) => Ok(i as f64),
            other => Err(mismatch("float", &other)),
        }
    }
}

impl FieldValue for f32 {
    fn type_key() -> TypeKey {
        TypeKey::Float
    }

    fn from_value(value: Value) -> Result<Self, String> {
        f64::from_value(value).map(|f| f as f32)
    }
}

impl FieldValue for bool {
    fn type_key() -> TypeKey {
        TypeKey::Bool
    }

    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Bool(b) => Ok(b),
            other => Err(mismatch("bool", &other)),
        }
    }
}

impl FieldValue for String {
    fn type_key() -> TypeKey {
        TypeKey::String
    }

    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::String(s) => Ok(s),
            other => Err(mismatch("string", &other)),
        }
    }
}

impl FieldValue for DateTime<FixedOffset> {
    fn type_key() -> TypeKey {
        TypeKey::DateTime
    }

    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::DateTime(dt) => Ok(dt),
            other => Err(mismatch("datetime", &other)),
        }
    }
}

impl FieldValue for DateTime<Utc> {
    fn type_key() -> TypeKey {
        TypeKey::UtcDateTime
    }

    fn from_value(value: Value) -> Result<Self, String> {
        DateTime::<FixedOffset>::from_value(value).map(|dt| dt.with_timezone(&Utc))
    }
}

impl FieldValue for NaiveDateTime {
    fn type_key() -> TypeKey {
        TypeKey::NaiveDateTime
    }

    fn from_value(value: Value) -> Result<Self, String> {
        DateTime::<FixedOffset>::from_value(value).map(|dt| dt.naive_local())
    }
}

impl FieldValue for NaiveDate {
    fn type_key() -> TypeKey {
        TypeKey::NaiveDate
    }

    fn from_value(value: Value) -> Result<Self, String> {
        DateTime::<FixedOffset>::from_value(value).map(|dt| dt.naive_local().date())
    }
}

impl<T: FieldValue> FieldValue for Option<T> {
    fn type_key() -> TypeKey {
        T::type_key()
    }

    fn admits_null() -> bool {
        true
    }

    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

/// Field-name keyed values of one row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldValues {
    values: BTreeMap<String, Value>,
}

impl FieldValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.values.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Removes `name` and converts it into the field type. A missing entry reads as null.
    pub fn take<T: FieldValue>(&mut self, name: &str) -> Result<T, AssignError> {
        let value = self.values.remove(name).unwrap_or_default();
        T::from_value(value).map_err(|message| AssignError::new(name, message))
    }

    pub fn into_inner(self) -> BTreeMap<String, Value> {
        self.values
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for FieldValues {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl IntoIterator for FieldValues {
    type Item = (String, Value);
    type IntoIter = std::collections::btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falsy_and_blank_predicates_differ_on_zero() {
        assert!(Value::from("0").is_falsy());
        assert!(!Value::from("0").is_blank());
        assert!(Value::Int(0).is_falsy());
        assert!(Value::Null.is_blank());
        assert!(Value::from("").is_blank());
        assert!(!Value::from(" ").is_falsy());
    }

    #[test]
    fn option_fields_admit_null() {
        assert!(<Option<i64>>::admits_null());
        assert!(!i64::admits_null());
        assert_eq!(<Option<i64>>::type_key(), TypeKey::Int);
        assert_eq!(<Option<i64>>::from_value(Value::Null), Ok(None));
        assert_eq!(<Option<i64>>::from_value(Value::Int(3)), Ok(Some(3)));
    }

    #[test]
    fn narrow_integer_fields_report_overflow() {
        let err = u16::from_value(Value::Int(70_000)).unwrap_err();
        assert!(err.contains("out of range for u16"));
        assert_eq!(i32::from_value(Value::Int(-5)), Ok(-5));
    }

    #[test]
    fn date_fields_use_wall_clock_of_the_offset() {
        let dt = DateTime::parse_from_rfc3339("2024-05-06T23:30:00-02:00").unwrap();
        let date = NaiveDate::from_value(Value::DateTime(dt)).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 5, 6).unwrap());
        let utc = <DateTime<Utc>>::from_value(Value::DateTime(dt)).unwrap();
        assert_eq!(utc.to_rfc3339(), "2024-05-07T01:30:00+00:00");
    }

    #[test]
    fn take_reports_field_name_on_mismatch() {
        let mut values = FieldValues::new().with("age", "x");
        let err = values.take::<i64>("age").unwrap_err();
        assert_eq!(err.field(), "age");
        assert!(err.to_string().contains("expected int, got string"));
        assert!(!values.contains("age"));
    }
}
