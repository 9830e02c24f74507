use std::{borrow::Cow, fmt::Write as _};

use serde::{Deserialize, Serialize};

use super::{CastFailure, Caster, decimal_places, format_fixed};
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LetterCase {
    Lower,
    Upper,
}

/// Casts any scalar to `String`.
///
/// Numbers accept a format argument meaning "decimal places". Null becomes the empty
/// string unless nulls are disallowed.
#[derive(Debug, Clone)]
pub struct StringCaster {
    allow_null: bool,
    trim: bool,
    case: Option<LetterCase>,
}

impl Default for StringCaster {
    fn default() -> Self {
        Self {
            allow_null: true,
            trim: true,
            case: None,
        }
    }
}

impl StringCaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow_null(mut self, allow: bool) -> Self {
        self.allow_null = allow;
        self
    }

    pub fn trim(mut self, trim: bool) -> Self {
        self.trim = trim;
        self
    }

    pub fn case(mut self, case: Option<LetterCase>) -> Self {
        self.case = case;
        self
    }

    fn finish(&self, text: &str) -> String {
        let text = if self.trim { text.trim() } else { text };
        let folded: Cow<'_, str> = match self.case {
            Some(LetterCase::Lower) => Cow::Owned(text.to_lowercase()),
            Some(LetterCase::Upper) => Cow::Owned(text.to_uppercase()),
            None => Cow::Borrowed(text),
        };
        folded.into_owned()
    }
}

impl Caster for StringCaster {
    fn cast(&self, value: &Value, format: Option<&str>) -> Result<Value, CastFailure> {
        let text = match value {
            Value::Null if self.allow_null => String::new(),
            Value::Null => {
                return Err(CastFailure::new(
                    "Cannot convert null to string when null is not allowed",
                ));
            }
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => match decimal_places(format) {
                Some(places) => format_fixed(*i as f64, places),
                None => i.to_string(),
            },
            Value::Float(f) => match decimal_places(format) {
                Some(places) => format_fixed(*f, places),
                None => f.to_string(),
            },
            Value::String(s) => self.finish(s),
            Value::DateTime(dt) => match format {
                Some(pattern) => {
                    let mut rendered = String::new();
                    write!(rendered, "{}", dt.format(pattern)).map_err(|_| {
                        CastFailure::new(format!("Invalid date format \"{pattern}\""))
                    })?;
                    self.finish(&rendered)
                }
                None => self.finish(&dt.to_rfc3339()),
            },
        };
        Ok(Value::String(text))
    }
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;

    use super::*;

    fn cast(caster: &StringCaster, value: impl Into<Value>, format: Option<&str>) -> Result<String, String> {
        match caster.cast(&value.into(), format) {
            Ok(Value::String(s)) => Ok(s),
            Ok(other) => panic!("unexpected output {other:?}"),
            Err(err) => Err(err.to_string()),
        }
    }

    #[test]
    fn trims_strings_by_default() {
        let caster = StringCaster::new();
        assert_eq!(cast(&caster, "  hello  ", None), Ok("hello".to_string()));
        let raw = StringCaster::new().trim(false);
        assert_eq!(cast(&raw, "  hello  ", None), Ok("  hello  ".to_string()));
    }

    #[test]
    fn stringifies_scalars() {
        let caster = StringCaster::new();
        assert_eq!(cast(&caster, 42i64, None), Ok("42".to_string()));
        assert_eq!(cast(&caster, 3.14, None), Ok("3.14".to_string()));
        assert_eq!(cast(&caster, 3.0, None), Ok("3".to_string()));
        assert_eq!(cast(&caster, true, None), Ok("true".to_string()));
    }

    #[test]
    fn numeric_format_sets_decimal_places() {
        let caster = StringCaster::new();
        assert_eq!(cast(&caster, 3.14159, Some("2")), Ok("3.14".to_string()));
        assert_eq!(cast(&caster, 42i64, Some("2")), Ok("42.00".to_string()));
        assert_eq!(cast(&caster, 1234.5, Some("0")), Ok("1235".to_string()));
    }

    #[test]
    fn null_handling_follows_allow_null() {
        assert_eq!(cast(&StringCaster::new(), Value::Null, None), Ok(String::new()));
        let err = cast(&StringCaster::new().allow_null(false), Value::Null, None).unwrap_err();
        assert!(err.contains("null is not allowed"));
    }

    #[test]
    fn case_folding_applies_after_trim() {
        let lower = StringCaster::new().case(Some(LetterCase::Lower));
        assert_eq!(cast(&lower, "  MiXeD ", None), Ok("mixed".to_string()));
        let upper = StringCaster::new().case(Some(LetterCase::Upper));
        assert_eq!(cast(&upper, "straße", None), Ok("STRASSE".to_string()));
    }

    #[test]
    fn dates_render_with_optional_pattern() {
        let dt = DateTime::parse_from_rfc3339("2024-01-15T10:30:00+00:00").unwrap();
        let caster = StringCaster::new();
        assert_eq!(
            cast(&caster, dt, Some("%d.%m.%Y")),
            Ok("15.01.2024".to_string())
        );
        assert_eq!(
            cast(&caster, dt, None),
            Ok("2024-01-15T10:30:00+00:00".to_string())
        );
    }
}
