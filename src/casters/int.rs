use std::sync::OnceLock;

use regex::Regex;

use super::{CastFailure, Caster};
use crate::value::Value;

const GROUP_SEPARATORS: &[char] = &[' ', ',', '.', '\'', '\u{a0}'];

fn decimal_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^([+-]?\d+)\.(\d+)$").expect("valid decimal pattern"))
}

fn integer_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[+-]?\d+$").expect("valid integer pattern"))
}

/// Casts to `i64`.
///
/// Whole-number floats and strings with grouping separators are accepted; anything with a
/// fractional part is refused rather than truncated.
#[derive(Debug, Clone, Default)]
pub struct IntCaster {
    allow_null: bool,
    min: Option<i64>,
    max: Option<i64>,
}

impl IntCaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Null and blank strings become `0` instead of failing.
    pub fn allow_null(mut self, allow: bool) -> Self {
        self.allow_null = allow;
        self
    }

    pub fn min(mut self, min: i64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn max(mut self, max: i64) -> Self {
        self.max = Some(max);
        self
    }

    pub fn range(mut self, min: Option<i64>, max: Option<i64>) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    fn cast_float(&self, value: f64) -> Result<i64, CastFailure> {
        if !value.is_finite() || value < i64::MIN as f64 || value >= i64::MAX as f64 {
            return Err(CastFailure::new(format!(
                "Float value \"{value}\" is out of integer range"
            )));
        }
        if value.fract() != 0.0 {
            return Err(CastFailure::new(format!(
                "Float value \"{value}\" has decimal part"
            )));
        }
        self.check_range(value as i64)
    }

    fn cast_str(&self, raw: &str) -> Result<i64, CastFailure> {
        let value = raw.trim();
        if value.is_empty() {
            if self.allow_null {
                return Ok(0);
            }
            return Err(CastFailure::new(
                "Empty string cannot be converted to integer",
            ));
        }

        // `1.000` reads as a grouped thousand, `12.00` as a whole decimal, `10.5` is refused.
        let cleaned = if let Some(caps) = decimal_pattern().captures(value) {
            let (whole, fraction) = (&caps[1], &caps[2]);
            if fraction.chars().any(|c| c != '0') {
                return Err(CastFailure::new(format!(
                    "String value \"{value}\" has decimal part"
                )));
            }
            if fraction.len() == 3 {
                format!("{whole}{fraction}")
            } else {
                whole.to_string()
            }
        } else {
            value.replace(GROUP_SEPARATORS, "")
        };

        if !integer_pattern().is_match(&cleaned) {
            return Err(CastFailure::new(format!(
                "String value \"{value}\" is not numeric"
            )));
        }
        let parsed = cleaned.parse::<i64>().map_err(|_| {
            CastFailure::new(format!("Value \"{value}\" causes integer overflow"))
        })?;
        self.check_range(parsed)
    }

    fn check_range(&self, value: i64) -> Result<i64, CastFailure> {
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

impl Caster for IntCaster {
    fn cast(&self, value: &Value, _format: Option<&str>) -> Result<Value, CastFailure> {
        let cast = match value {
            Value::Null if self.allow_null => Ok(0),
            Value::Null => Err(CastFailure::new("Cannot convert null to integer")),
            Value::Int(i) => self.check_range(*i),
            Value::Bool(b) => Ok(i64::from(*b)),
            Value::Float(f) => self.cast_float(*f),
            Value::String(s) => self.cast_str(s),
            Value::DateTime(_) => Err(CastFailure::new("Cannot convert datetime to integer")),
        };
        cast.map(Value::Int)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cast(caster: &IntCaster, value: impl Into<Value>) -> Result<i64, String> {
        match caster.cast(&value.into(), None) {
            Ok(Value::Int(i)) => Ok(i),
            Ok(other) => panic!("unexpected output {other:?}"),
            Err(err) => Err(err.to_string()),
        }
    }

    #[test]
    fn converts_native_values() {
        let caster = IntCaster::new();
        assert_eq!(cast(&caster, 42i64), Ok(42));
        assert_eq!(cast(&caster, true), Ok(1));
        assert_eq!(cast(&caster, false), Ok(0));
        assert_eq!(cast(&caster, 10.0), Ok(10));
        assert_eq!(cast(&caster, -5.0), Ok(-5));
    }

    #[test]
    fn rejects_fractional_values() {
        let caster = IntCaster::new();
        assert!(cast(&caster, 10.5).unwrap_err().contains("has decimal part"));
        assert!(cast(&caster, "10.5").unwrap_err().contains("has decimal part"));
        assert!(cast(&caster, f64::NAN).unwrap_err().contains("out of integer range"));
    }

    #[test]
    fn strips_thousands_separators() {
        let caster = IntCaster::new();
        assert_eq!(cast(&caster, "1,000"), Ok(1000));
        assert_eq!(cast(&caster, "1 000"), Ok(1000));
        assert_eq!(cast(&caster, "1.000"), Ok(1000));
        assert_eq!(cast(&caster, "1,000,000"), Ok(1_000_000));
        assert_eq!(cast(&caster, "1'000"), Ok(1000));
        assert_eq!(cast(&caster, " -10 "), Ok(-10));
        assert_eq!(cast(&caster, "12.00"), Ok(12));
    }

    #[test]
    fn reports_non_numeric_and_overflow() {
        let caster = IntCaster::new();
        assert!(cast(&caster, "not a number").unwrap_err().contains("is not numeric"));
        let huge = format!("{}0", i64::MAX);
        assert!(cast(&caster, huge).unwrap_err().contains("integer overflow"));
    }

    #[test]
    fn null_and_blank_follow_allow_null() {
        let strict = IntCaster::new();
        assert_eq!(
            cast(&strict, Value::Null).unwrap_err(),
            "Cannot convert null to integer"
        );
        assert!(cast(&strict, "  ").unwrap_err().contains("Empty string"));
        let lenient = IntCaster::new().allow_null(true);
        assert_eq!(cast(&lenient, Value::Null), Ok(0));
        assert_eq!(cast(&lenient, ""), Ok(0));
    }

    #[test]
    fn enforces_range() {
        let caster = IntCaster::new().min(0).max(100);
        assert_eq!(cast(&caster, 0i64), Ok(0));
        assert_eq!(cast(&caster, "100"), Ok(100));
        assert!(cast(&caster, -5i64).unwrap_err().contains("is less than minimum 0"));
        assert!(cast(&caster, 150.0).unwrap_err().contains("is greater than maximum 100"));
    }
}
