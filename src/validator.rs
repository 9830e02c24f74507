//! Row validation.
//!
//! The pipeline hands every mapped row to a [`Validator`] together with the schema's rule
//! and message tables. [`RuleValidator`] understands a small pipe-separated rule syntax
//! (`required|integer|min:18`); callers with their own rule engine implement the trait or
//! pass a closure.

use std::{collections::BTreeMap, sync::OnceLock};

use regex::Regex;

use crate::{casters::Caster, casters::DateCaster, value::FieldValues, value::Value};

pub type Rules = BTreeMap<String, String>;
pub type Messages = BTreeMap<String, String>;

/// Outcome of validating one row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Validation {
    errors: BTreeMap<String, Vec<String>>,
    data: FieldValues,
}

impl Validation {
    pub fn passed(data: FieldValues) -> Self {
        Self {
            errors: BTreeMap::new(),
            data,
        }
    }

    pub fn with_errors(data: FieldValues, errors: BTreeMap<String, Vec<String>>) -> Self {
        Self { errors, data }
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    pub fn fails(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn messages(&self) -> &BTreeMap<String, Vec<String>> {
        &self.errors
    }

    /// Messages as a JSON object of field name to message list.
    pub fn messages_json(&self) -> String {
        serde_json::to_string(&self.errors).unwrap_or_else(|_| format!("{:?}", self.errors))
    }

    pub fn data(&self) -> &FieldValues {
        &self.data
    }

    pub fn into_data(self) -> FieldValues {
        self.data
    }
}

pub trait Validator {
    fn validate(&self, data: &FieldValues, rules: &Rules, messages: &Messages) -> Validation;
}

impl<F> Validator for F
where
    F: Fn(&FieldValues, &Rules, &Messages) -> Validation,
{
    fn validate(&self, data: &FieldValues, rules: &Rules, messages: &Messages) -> Validation {
        self(data, rules, messages)
    }
}

/// Accepts every row unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl Validator for AcceptAll {
    fn validate(&self, data: &FieldValues, _rules: &Rules, _messages: &Messages) -> Validation {
        Validation::passed(data.clone())
    }
}

/// Built-in rule engine.
///
/// Supported rules: `required`, `nullable`, `integer`, `numeric`, `boolean`, `string`,
/// `email`, `date`, `min:N`, `max:N` and `in:a,b,c`. A blank value on a field without
/// `required` skips every other rule. `min`/`max` compare numbers when the value is numeric
/// or the field also declares `integer`/`numeric`, and character counts otherwise.
///
/// Messages are looked up as `field.rule`, then `rule`, falling back to a built-in text;
/// `:attribute` in a message is replaced by the field name.
#[derive(Debug, Clone, Default)]
pub struct RuleValidator;

impl RuleValidator {
    pub fn new() -> Self {
        Self
    }
}

impl Validator for RuleValidator {
    fn validate(&self, data: &FieldValues, rules: &Rules, messages: &Messages) -> Validation {
        let mut validation = Validation::passed(data.clone());
        for (field, raw_rules) in rules {
            let value = data.get(field).unwrap_or(&Value::Null);
            let parsed = raw_rules
                .split('|')
                .map(str::trim)
                .filter(|rule| !rule.is_empty())
                .map(Rule::parse)
                .collect::<Vec<_>>();
            let numeric_context = parsed
                .iter()
                .any(|rule| matches!(rule, Rule::Integer | Rule::Numeric));
            let blank = is_blank(value);

            for rule in &parsed {
                if blank && !matches!(rule, Rule::Required) {
                    continue;
                }
                if let Some(failure) = rule.check(value, numeric_context) {
                    let message = messages
                        .get(&format!("{field}.{}", rule.name()))
                        .or_else(|| messages.get(rule.name()))
                        .cloned()
                        .unwrap_or(failure);
                    validation.add_error(field.clone(), message.replace(":attribute", field));
                }
            }
        }
        validation
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Rule {
    Required,
    Nullable,
    Integer,
    Numeric,
    Boolean,
    String,
    Email,
    Date,
    Min(f64),
    Max(f64),
    In(Vec<String>),
    Unknown(String),
}

impl Rule {
    fn parse(raw: &str) -> Self {
        let (name, argument) = match raw.split_once(':') {
            Some((name, argument)) => (name.trim(), Some(argument.trim())),
            None => (raw, None),
        };
        let bound = || argument.and_then(|arg| arg.parse::<f64>().ok());
        match name.to_ascii_lowercase().as_str() {
            "required" => Rule::Required,
            "nullable" => Rule::Nullable,
            "integer" | "int" => Rule::Integer,
            "numeric" => Rule::Numeric,
            "boolean" | "bool" => Rule::Boolean,
            "string" => Rule::String,
            "email" => Rule::Email,
            "date" => Rule::Date,
            "min" => bound().map_or_else(|| Rule::Unknown(raw.to_string()), Rule::Min),
            "max" => bound().map_or_else(|| Rule::Unknown(raw.to_string()), Rule::Max),
            "in" => Rule::In(
                argument
                    .unwrap_or_default()
                    .split(',')
                    .map(|item| item.trim().to_string())
                    .collect(),
            ),
            _ => Rule::Unknown(raw.to_string()),
        }
    }

    fn name(&self) -> &str {
        match self {
            Rule::Required => "required",
            Rule::Nullable => "nullable",
            Rule::Integer => "integer",
            Rule::Numeric => "numeric",
            Rule::Boolean => "boolean",
            Rule::String => "string",
            Rule::Email => "email",
            Rule::Date => "date",
            Rule::Min(_) => "min",
            Rule::Max(_) => "max",
            Rule::In(_) => "in",
            Rule::Unknown(raw) => raw,
        }
    }

    /// Returns the default failure message, or `None` when the value passes.
    fn check(&self, value: &Value, numeric_context: bool) -> Option<String> {
        let passes = match self {
            Rule::Required => !is_blank(value),
            Rule::Nullable => true,
            Rule::Integer => is_integer(value),
            Rule::Numeric => as_number(value).is_some(),
            Rule::Boolean => is_boolean(value),
            Rule::String => matches!(value, Value::String(_)),
            Rule::Email => value.as_str().is_some_and(|s| email_pattern().is_match(s.trim())),
            Rule::Date => DateCaster::new().cast(value, None).is_ok(),
            Rule::Min(min) => size(value, numeric_context) >= *min,
            Rule::Max(max) => size(value, numeric_context) <= *max,
            Rule::In(allowed) => allowed.iter().any(|item| item == &value.as_display()),
            Rule::Unknown(_) => false,
        };
        if passes {
            return None;
        }
        let text_size = !numeric_context && !matches!(value, Value::Int(_) | Value::Float(_));
        Some(match self {
            Rule::Required => "The :attribute field is required.".to_string(),
            Rule::Integer => "The :attribute field must be an integer.".to_string(),
            Rule::Numeric => "The :attribute field must be a number.".to_string(),
            Rule::Boolean => "The :attribute field must be true or false.".to_string(),
            Rule::String => "The :attribute field must be a string.".to_string(),
            Rule::Email => "The :attribute field must be a valid email address.".to_string(),
            Rule::Date => "The :attribute field must be a valid date.".to_string(),
            Rule::Min(min) if text_size => {
                format!("The :attribute field must be at least {min} characters.")
            }
            Rule::Min(min) => format!("The :attribute field must be at least {min}."),
            Rule::Max(max) if text_size => {
                format!("The :attribute field must not be greater than {max} characters.")
            }
            Rule::Max(max) => format!("The :attribute field must not be greater than {max}."),
            Rule::In(_) => "The selected :attribute is invalid.".to_string(),
            Rule::Nullable => String::new(),
            Rule::Unknown(raw) => format!("The :attribute field uses unsupported rule `{raw}`."),
        })
    }
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email pattern")
    })
}

fn integer_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[+-]?\d+$").expect("valid integer pattern"))
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn is_integer(value: &Value) -> bool {
    match value {
        Value::Int(_) => true,
        Value::String(s) => integer_pattern().is_match(s.trim()),
        _ => false,
    }
}

fn is_boolean(value: &Value) -> bool {
    match value {
        Value::Bool(_) => true,
        Value::Int(i) => *i == 0 || *i == 1,
        Value::String(s) => matches!(s.trim(), "0" | "1" | "true" | "false"),
        _ => false,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Int(i) => Some(*i as f64),
        Value::Float(f) if f.is_finite() => Some(*f),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

fn size(value: &Value, numeric_context: bool) -> f64 {
    match value {
        Value::Int(_) | Value::Float(_) => as_number(value).unwrap_or(f64::NAN),
        Value::String(_) if numeric_context => as_number(value).unwrap_or(f64::NAN),
        Value::String(s) => s.chars().count() as f64,
        other => other.as_display().chars().count() as f64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules(pairs: &[(&str, &str)]) -> Rules {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn validate(data: FieldValues, rule_pairs: &[(&str, &str)], messages: &Messages) -> Validation {
        RuleValidator::new().validate(&data, &rules(rule_pairs), messages)
    }

    #[test]
    fn required_flags_blank_values() {
        let data = FieldValues::new().with("name", "  ").with("age", Value::Null);
        let result = validate(data, &[("name", "required"), ("age", "required")], &Messages::new());
        assert!(result.fails());
        assert_eq!(
            result.messages()["name"],
            vec!["The name field is required.".to_string()]
        );
        assert_eq!(result.messages().len(), 2);
    }

    #[test]
    fn optional_blank_values_skip_other_rules() {
        let data = FieldValues::new().with("age", "");
        let result = validate(data, &[("age", "integer|min:18")], &Messages::new());
        assert!(!result.fails());
    }

    #[test]
    fn type_rules_check_raw_cells() {
        let data = FieldValues::new()
            .with("age", "abc")
            .with("score", "12.5")
            .with("flag", "yes")
            .with("email", "not-an-email")
            .with("born", "2024-01-15");
        let result = validate(
            data,
            &[
                ("age", "integer"),
                ("score", "numeric"),
                ("flag", "boolean"),
                ("email", "email"),
                ("born", "date"),
            ],
            &Messages::new(),
        );
        let failed = result.messages().keys().cloned().collect::<Vec<_>>();
        assert_eq!(failed, vec!["age", "email", "flag"]);
    }

    #[test]
    fn min_and_max_depend_on_numeric_context() {
        let data = FieldValues::new().with("age", "9").with("code", "abcdef");
        let result = validate(
            data,
            &[("age", "integer|min:18"), ("code", "string|max:3")],
            &Messages::new(),
        );
        assert_eq!(
            result.messages()["age"],
            vec!["The age field must be at least 18.".to_string()]
        );
        assert_eq!(
            result.messages()["code"],
            vec!["The code field must not be greater than 3 characters.".to_string()]
        );
    }

    #[test]
    fn in_rule_compares_display_form() {
        let data = FieldValues::new().with("status", "active").with("level", 3i64);
        let result = validate(
            data,
            &[("status", "in:active,inactive"), ("level", "in:1,2")],
            &Messages::new(),
        );
        assert_eq!(result.messages().keys().collect::<Vec<_>>(), vec!["level"]);
    }

    #[test]
    fn custom_messages_prefer_field_specific_keys() {
        let messages = [
            ("age.integer", "Age must be whole"),
            ("required", ":attribute is mandatory"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect::<Messages>();
        let data = FieldValues::new().with("age", "x").with("name", "");
        let result = validate(data, &[("age", "integer"), ("name", "required")], &messages);
        assert_eq!(result.messages()["age"], vec!["Age must be whole".to_string()]);
        assert_eq!(result.messages()["name"], vec!["name is mandatory".to_string()]);
        assert_eq!(
            result.messages_json(),
            r#"{"age":["Age must be whole"],"name":["name is mandatory"]}"#
        );
    }

    #[test]
    fn unknown_rules_fail_loudly() {
        let data = FieldValues::new().with("name", "x");
        let result = validate(data, &[("name", "uuid")], &Messages::new());
        assert!(result.messages()["name"][0].contains("unsupported rule `uuid`"));
    }

    #[test]
    fn closures_and_accept_all_are_validators() {
        let data = FieldValues::new().with("a", 1i64);
        assert!(!AcceptAll.validate(&data, &Rules::new(), &Messages::new()).fails());
        let reject = |data: &FieldValues, _: &Rules, _: &Messages| {
            let mut validation = Validation::passed(data.clone());
            validation.add_error("a", "nope");
            validation
        };
        let result = reject.validate(&data, &Rules::new(), &Messages::new());
        assert!(result.fails());
        assert_eq!(result.data(), &data);
    }
}
