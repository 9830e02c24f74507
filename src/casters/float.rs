use std::sync::OnceLock;

use regex::Regex;

use super::{CastFailure, Caster, decimal_places, round_half_away};
use crate::value::Value;

const RESIDUAL_SEPARATORS: &[char] = &[' ', ',', '\'', '\u{a0}'];

fn float_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[+-]?(\d+(\.\d*)?|\.\d+)([eE][+-]?\d+)?$").expect("valid float pattern")
    })
}

/// Casts to `f64` with configurable separators.
///
/// Strings are normalized by removing the thousands separator, turning the decimal
/// separator into `.`, then dropping any residual grouping characters (space, comma,
/// apostrophe, no-break space). A numeric format argument rounds the result to that many
/// decimal places.
#[derive(Debug, Clone)]
pub struct FloatCaster {
    allow_null: bool,
    min: Option<f64>,
    max: Option<f64>,
    allow_infinity: bool,
    allow_nan: bool,
    decimal_separator: String,
    thousands_separator: String,
    precision: Option<u32>,
}

impl Default for FloatCaster {
    fn default() -> Self {
        Self {
            allow_null: false,
            min: None,
            max: None,
            allow_infinity: false,
            allow_nan: false,
            decimal_separator: ".".to_string(),
            thousands_separator: String::new(),
            precision: None,
        }
    }
}

impl FloatCaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// `1 234,56`
    pub fn european() -> Self {
        Self::new().separators(",", " ")
    }

    /// `1,234.56`
    pub fn us() -> Self {
        Self::new().separators(".", ",")
    }

    pub fn separators(mut self, decimal: impl Into<String>, thousands: impl Into<String>) -> Self {
        self.decimal_separator = decimal.into();
        self.thousands_separator = thousands.into();
        self
    }

    pub fn allow_null(mut self, allow: bool) -> Self {
        self.allow_null = allow;
        self
    }

    pub fn allow_infinity(mut self, allow: bool) -> Self {
        self.allow_infinity = allow;
        self
    }

    pub fn allow_nan(mut self, allow: bool) -> Self {
        self.allow_nan = allow;
        self
    }

    /// Rounds every result to `places` decimals, after any format-driven rounding.
    pub fn precision(mut self, places: Option<u32>) -> Self {
        self.precision = places;
        self
    }

    pub fn min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    fn check_special(&self, value: f64) -> Result<f64, CastFailure> {
        if value.is_nan() && !self.allow_nan {
            return Err(CastFailure::new("NaN values are not allowed"));
        }
        if value.is_infinite() && !self.allow_infinity {
            return Err(CastFailure::new("Infinity values are not allowed"));
        }
        Ok(value)
    }

    fn cast_str(&self, raw: &str) -> Result<f64, CastFailure> {
        let value = raw.trim();
        if value.is_empty() {
            return Err(CastFailure::new(
                "Empty string cannot be converted to float",
            ));
        }

        match value.to_lowercase().as_str() {
            "nan" => return self.check_special(f64::NAN),
            "inf" | "+inf" | "infinity" | "+infinity" => {
                return self.check_special(f64::INFINITY);
            }
            "-inf" | "-infinity" => return self.check_special(f64::NEG_INFINITY),
            _ => {}
        }

        let normalized = self.normalize(value);
        if !float_pattern().is_match(&normalized) {
            return Err(CastFailure::new(format!(
                "String value \"{value}\" is not a valid float"
            )));
        }
        let parsed = normalized
            .parse::<f64>()
            .map_err(|_| CastFailure::new(format!("String value \"{value}\" is not a valid float")))?;
        self.check_special(parsed)
    }

    fn normalize(&self, value: &str) -> String {
        let mut normalized = value.to_string();
        if !self.thousands_separator.is_empty() {
            normalized = normalized.replace(self.thousands_separator.as_str(), "");
        }
        if self.decimal_separator != "." && !self.decimal_separator.is_empty() {
            normalized = normalized.replace(self.decimal_separator.as_str(), ".");
        }
        normalized.replace(RESIDUAL_SEPARATORS, "")
    }

    fn check_range(&self, value: f64) -> Result<f64, CastFailure> {
        if let Some(min) = self.min
            && value < min
        {
            return Err(CastFailure::new(format!(
                "Value {value} is less than minimum {min}"
            )));
        }
        if let Some(max) = self.max
            && value > max
        {
            return Err(CastFailure::new(format!(
                "Value {value} is greater than maximum {max}"
            )));
        }
        Ok(value)
    }
}

impl Caster for FloatCaster {
    fn cast(&self, value: &Value, format: Option<&str>) -> Result<Value, CastFailure> {
        let mut result = match value {
            Value::Null if self.allow_null => 0.0,
            Value::Null => return Err(CastFailure::new("Cannot convert null to float")),
            Value::Float(f) => self.check_special(*f)?,
            Value::Int(i) => *i as f64,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::String(s) => self.cast_str(s)?,
            Value::DateTime(_) => {
                return Err(CastFailure::new("Cannot convert datetime to float"));
            }
        };
        if let Some(places) = decimal_places(format) {
            result = round_half_away(result, places);
        }
        if let Some(places) = self.precision {
            result = round_half_away(result, places);
        }
        self.check_range(result).map(Value::Float)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cast(caster: &FloatCaster, value: impl Into<Value>) -> Result<f64, String> {
        cast_with(caster, value, None)
    }

    fn cast_with(
        caster: &FloatCaster,
        value: impl Into<Value>,
        format: Option<&str>,
    ) -> Result<f64, String> {
        match caster.cast(&value.into(), format) {
            Ok(Value::Float(f)) => Ok(f),
            Ok(other) => panic!("unexpected output {other:?}"),
            Err(err) => Err(err.to_string()),
        }
    }

    #[test]
    fn converts_native_values() {
        let caster = FloatCaster::new();
        assert_eq!(cast(&caster, 3.14), Ok(3.14));
        assert_eq!(cast(&caster, 42i64), Ok(42.0));
        assert_eq!(cast(&caster, true), Ok(1.0));
        assert_eq!(cast(&caster, false), Ok(0.0));
    }

    #[test]
    fn default_separators_read_us_grouping() {
        let caster = FloatCaster::new();
        assert_eq!(cast(&caster, "1,234.56"), Ok(1234.56));
        assert_eq!(cast(&caster, "1,234,567.89"), Ok(1234567.89));
        assert_eq!(cast(&caster, "1 000.5"), Ok(1000.5));
        assert_eq!(cast(&caster, "-10.5"), Ok(-10.5));
    }

    #[test]
    fn european_separators_swap_interpretation() {
        let caster = FloatCaster::new().separators(",", ".");
        assert_eq!(cast(&caster, "3,14"), Ok(3.14));
        assert_eq!(cast(&caster, "1.234,56"), Ok(1234.56));
        assert_eq!(cast(&caster, "1.234.567,89"), Ok(1234567.89));
        assert_eq!(cast(&caster, "1,234.56"), Ok(1.23456));
        assert_eq!(cast(&FloatCaster::european(), "1 234,56"), Ok(1234.56));
    }

    #[test]
    fn parses_scientific_notation() {
        let caster = FloatCaster::new();
        assert_eq!(cast(&caster, "1.23e3"), Ok(1230.0));
        assert_eq!(cast(&caster, "1.23e-3"), Ok(0.00123));
        assert_eq!(cast(&caster, "-1.23E3"), Ok(-1230.0));
    }

    #[test]
    fn special_values_are_opt_in() {
        let strict = FloatCaster::new();
        assert_eq!(
            cast(&strict, f64::NAN).unwrap_err(),
            "NaN values are not allowed"
        );
        assert_eq!(
            cast(&strict, "inf").unwrap_err(),
            "Infinity values are not allowed"
        );
        assert_eq!(
            cast(&strict, "1e400").unwrap_err(),
            "Infinity values are not allowed"
        );
        assert_eq!(
            cast(&strict, "-1e400").unwrap_err(),
            "Infinity values are not allowed"
        );
        let lenient = FloatCaster::new().allow_nan(true).allow_infinity(true);
        assert!(cast(&lenient, "NaN").unwrap().is_nan());
        assert_eq!(cast(&lenient, "1e400"), Ok(f64::INFINITY));
        assert_eq!(cast(&lenient, "Infinity"), Ok(f64::INFINITY));
        assert_eq!(cast(&lenient, "-inf"), Ok(f64::NEG_INFINITY));
    }

    #[test]
    fn rejects_garbage_and_null() {
        let caster = FloatCaster::new();
        assert!(cast(&caster, "not a number").unwrap_err().contains("is not a valid float"));
        assert!(cast(&caster, "1.2.3").is_err());
        assert_eq!(
            cast(&caster, Value::Null).unwrap_err(),
            "Cannot convert null to float"
        );
        assert_eq!(cast(&FloatCaster::new().allow_null(true), Value::Null), Ok(0.0));
    }

    #[test]
    fn format_rounds_after_conversion() {
        let caster = FloatCaster::new();
        assert_eq!(cast_with(&caster, 3.14159, Some("2")), Ok(3.14));
        assert_eq!(cast_with(&caster, "3.14159", Some("0")), Ok(3.0));
        assert_eq!(cast_with(&caster, 2.675, Some("2")), Ok(2.68));
        assert_eq!(cast_with(&caster, 42i64, Some("2")), Ok(42.0));
        assert_eq!(cast_with(&caster, 3.14159, Some("n/a")), Ok(3.14159));
    }

    #[test]
    fn precision_applies_without_a_format() {
        let caster = FloatCaster::new().precision(Some(2));
        assert_eq!(cast(&caster, "3.14159"), Ok(3.14));
        assert_eq!(cast_with(&caster, 3.14159, Some("3")), Ok(3.14));
        assert_eq!(cast(&caster, "-2.675"), Ok(-2.68));
    }

    #[test]
    fn enforces_range_after_rounding() {
        let caster = FloatCaster::new().min(0.0).max(100.0);
        assert_eq!(cast(&caster, 100.0), Ok(100.0));
        assert!(cast(&caster, -5.0).unwrap_err().contains("is less than minimum"));
        assert!(cast(&caster, "150").unwrap_err().contains("is greater than maximum"));
        assert_eq!(cast_with(&caster, 100.004, Some("2")), Ok(100.0));
    }
}
