use itertools::Itertools;

use super::{CastFailure, Caster};
use crate::value::Value;

const DEFAULT_TRUE: &[&str] = &["true", "yes", "1", "да", "+", "on", "enabled", "active"];
const DEFAULT_FALSE: &[&str] = &[
    "false", "no", "0", "нет", "-", "off", "disabled", "inactive", "",
];

/// Casts to `bool` using case-insensitive true/false vocabularies.
///
/// Null and blank strings are `false`, numbers are `true` when non-zero. In strict mode
/// (the default) an unrecognized string fails; in lenient mode it reads as `true`.
#[derive(Debug, Clone)]
pub struct BoolCaster {
    true_values: Vec<String>,
    false_values: Vec<String>,
    strict: bool,
}

impl Default for BoolCaster {
    fn default() -> Self {
        Self {
            true_values: DEFAULT_TRUE.iter().map(|s| s.to_string()).collect(),
            false_values: DEFAULT_FALSE.iter().map(|s| s.to_string()).collect(),
            strict: true,
        }
    }
}

impl BoolCaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts only `true 1 yes on` / `false 0 no off` and blank.
    pub fn strict_vocabulary() -> Self {
        Self::new().vocabulary(["true", "1", "yes", "on"], ["false", "0", "no", "off", ""])
    }

    pub fn vocabulary<T, F>(mut self, true_values: T, false_values: F) -> Self
    where
        T: IntoIterator,
        T::Item: Into<String>,
        F: IntoIterator,
        F::Item: Into<String>,
    {
        self.true_values = true_values.into_iter().map(Into::into).collect();
        self.false_values = false_values.into_iter().map(Into::into).collect();
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn true_values(&self) -> &[String] {
        &self.true_values
    }

    pub fn false_values(&self) -> &[String] {
        &self.false_values
    }

    fn cast_str(&self, raw: &str) -> Result<bool, CastFailure> {
        let value = raw.trim();
        let lowered = value.to_lowercase();

        if self.true_values.iter().any(|t| t.to_lowercase() == lowered) {
            return Ok(true);
        }
        if self.false_values.iter().any(|f| f.to_lowercase() == lowered) {
            return Ok(false);
        }
        if value.is_empty() {
            return Ok(false);
        }
        if let Ok(number) = value.parse::<f64>()
            && !number.is_nan()
        {
            return Ok(number != 0.0);
        }
        if self.strict {
            return Err(CastFailure::new(format!(
                "Cannot interpret string \"{value}\" as boolean. Accepted true values: {}. Accepted false values: {}.",
                self.true_values.iter().join(", "),
                self.false_values.iter().join(", ")
            )));
        }
        Ok(true)
    }
}

impl Caster for BoolCaster {
    fn cast(&self, value: &Value, _format: Option<&str>) -> Result<Value, CastFailure> {
        let cast = match value {
            Value::Bool(b) => Ok(*b),
            Value::Null => Ok(false),
            Value::Int(i) => Ok(*i != 0),
            Value::Float(f) => Ok(*f != 0.0),
            Value::String(s) => self.cast_str(s),
            Value::DateTime(_) if self.strict => {
                Err(CastFailure::new("Cannot convert datetime to boolean"))
            }
            Value::DateTime(_) => Ok(true),
        };
        cast.map(Value::Bool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cast(caster: &BoolCaster, value: impl Into<Value>) -> Result<bool, String> {
        match caster.cast(&value.into(), None) {
            Ok(Value::Bool(b)) => Ok(b),
            Ok(other) => panic!("unexpected output {other:?}"),
            Err(err) => Err(err.to_string()),
        }
    }

    #[test]
    fn numbers_use_truthiness() {
        let caster = BoolCaster::new();
        assert_eq!(cast(&caster, 42i64), Ok(true));
        assert_eq!(cast(&caster, -1i64), Ok(true));
        assert_eq!(cast(&caster, 0i64), Ok(false));
        assert_eq!(cast(&caster, 0.1), Ok(true));
        assert_eq!(cast(&caster, 0.0), Ok(false));
        assert_eq!(cast(&caster, Value::Null), Ok(false));
    }

    #[test]
    fn default_vocabulary_is_case_insensitive_and_localized() {
        let caster = BoolCaster::new();
        for truthy in ["true", "TRUE", "tRuE", "yes", "1", "да", "ДА", "+", "on", "active", "  yes  "] {
            assert_eq!(cast(&caster, truthy), Ok(true), "{truthy}");
        }
        for falsy in ["false", "False", "no", "0", "нет", "-", "off", "inactive", "", "   "] {
            assert_eq!(cast(&caster, falsy), Ok(false), "{falsy}");
        }
    }

    #[test]
    fn numeric_strings_fall_back_to_truthiness() {
        let caster = BoolCaster::new();
        assert_eq!(cast(&caster, "2"), Ok(true));
        assert_eq!(cast(&caster, "3.14"), Ok(true));
        assert_eq!(cast(&caster, "0.0"), Ok(false));
        assert_eq!(cast(&caster, "000"), Ok(false));
    }

    #[test]
    fn strictness_controls_unknown_strings() {
        let err = cast(&BoolCaster::new(), "maybe").unwrap_err();
        assert!(err.contains("Cannot interpret string \"maybe\" as boolean"));
        assert!(err.contains("Accepted true values: true, yes"));
        let lenient = BoolCaster::new().strict(false);
        assert_eq!(cast(&lenient, "maybe"), Ok(true));
        assert_eq!(cast(&lenient, "whatever"), Ok(true));
    }

    #[test]
    fn custom_vocabulary_replaces_defaults() {
        let caster = BoolCaster::new().vocabulary(["y", "ok"], ["n", "fail"]);
        assert_eq!(cast(&caster, "Y"), Ok(true));
        assert_eq!(cast(&caster, "fail"), Ok(false));
        assert!(cast(&caster, "yes").is_err());
    }

    #[test]
    fn strict_vocabulary_refuses_localized_words() {
        let caster = BoolCaster::strict_vocabulary();
        assert_eq!(cast(&caster, "on"), Ok(true));
        assert_eq!(cast(&caster, ""), Ok(false));
        assert!(cast(&caster, "да").is_err());
        assert!(cast(&caster, "enabled").is_err());
    }
}
