use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};

use super::{CastFailure, Caster};
use crate::value::Value;

/// Serial dates count days from 1899-12-30; 25569 is 1970-01-01.
const SERIAL_UNIX_EPOCH: f64 = 25569.0;
const SERIAL_MIN_EXCLUSIVE: f64 = 60.0;
const SERIAL_MAX_EXCLUSIVE: f64 = 2_958_465.0;
const SECONDS_PER_DAY: f64 = 86_400.0;

const OFFSET_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S %z",
    "%Y-%m-%d %H:%M:%S%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%d/%m/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%d/%m/%Y",
    "%m/%d/%Y",
    "%Y/%m/%d",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
];

/// Casts to `DateTime<FixedOffset>`.
///
/// Strings try the caller's format, then the configured fallback formats, then a fixed set
/// of common layouts. Formats use `strftime` syntax; values without an offset are read as
/// UTC. Numbers between 60 and 2958465 (exclusive) are spreadsheet serial dates, anything
/// else is a Unix timestamp. A configured timezone converts every result to that offset.
#[derive(Debug, Clone, Default)]
pub struct DateCaster {
    timezone: Option<FixedOffset>,
    fallback_formats: Vec<String>,
}

impl DateCaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timezone(mut self, timezone: Option<FixedOffset>) -> Self {
        self.timezone = timezone;
        self
    }

    pub fn fallback_formats<I>(mut self, formats: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.fallback_formats = formats.into_iter().map(Into::into).collect();
        self
    }

    fn apply_timezone(&self, value: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
        match self.timezone {
            Some(offset) => value.with_timezone(&offset),
            None => value,
        }
    }

    fn from_timestamp(&self, timestamp: f64) -> Result<DateTime<FixedOffset>, CastFailure> {
        if !timestamp.is_finite() {
            return Err(CastFailure::new(format!(
                "Timestamp {timestamp} is not a finite number"
            )));
        }
        let seconds = if timestamp > SERIAL_MIN_EXCLUSIVE && timestamp < SERIAL_MAX_EXCLUSIVE {
            ((timestamp - SERIAL_UNIX_EPOCH) * SECONDS_PER_DAY).round()
        } else {
            timestamp.trunc()
        };
        if seconds < i64::MIN as f64 || seconds >= i64::MAX as f64 {
            return Err(CastFailure::new(format!(
                "Timestamp {timestamp} is out of range"
            )));
        }
        let utc = DateTime::<Utc>::from_timestamp(seconds as i64, 0).ok_or_else(|| {
            CastFailure::new(format!("Timestamp {timestamp} is out of range"))
        })?;
        Ok(self.apply_timezone(utc.fixed_offset()))
    }

    fn from_str(&self, raw: &str, format: Option<&str>) -> Result<DateTime<FixedOffset>, CastFailure> {
        let value = raw.trim();
        if value.is_empty() {
            return Err(CastFailure::new("Empty string cannot be converted to date"));
        }

        let explicit = format.into_iter().chain(self.fallback_formats.iter().map(String::as_str));
        for pattern in explicit {
            if let Some(parsed) = parse_with_format(value, pattern) {
                return Ok(self.apply_timezone(parsed));
            }
        }

        parse_free_form(value)
            .map(|parsed| self.apply_timezone(parsed))
            .ok_or_else(|| CastFailure::new(format!("Cannot parse date string \"{value}\"")))
    }
}

impl Caster for DateCaster {
    fn cast(&self, value: &Value, format: Option<&str>) -> Result<Value, CastFailure> {
        let parsed = match value {
            Value::Null => return Err(CastFailure::new("Cannot convert null to date")),
            Value::Bool(_) => return Err(CastFailure::new("Cannot convert boolean to date")),
            Value::DateTime(dt) => self.apply_timezone(*dt),
            Value::Int(i) => self.from_timestamp(*i as f64)?,
            Value::Float(f) => self.from_timestamp(*f)?,
            Value::String(s) => self.from_str(s, format)?,
        };
        Ok(Value::DateTime(parsed))
    }
}

fn parse_with_format(value: &str, pattern: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(parsed) = DateTime::parse_from_str(value, pattern) {
        return Some(parsed);
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(value, pattern) {
        return Some(parsed.and_utc().fixed_offset());
    }
    NaiveDate::parse_from_str(value, pattern)
        .ok()
        .map(|date| date.and_time(NaiveTime::MIN).and_utc().fixed_offset())
}

fn parse_free_form(value: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed);
    }
    if let Ok(parsed) = DateTime::parse_from_rfc2822(value) {
        return Some(parsed);
    }
    for pattern in OFFSET_DATETIME_FORMATS {
        if let Ok(parsed) = DateTime::parse_from_str(value, pattern) {
            return Some(parsed);
        }
    }
    for pattern in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, pattern) {
            return Some(parsed.and_utc().fixed_offset());
        }
    }
    for pattern in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(value, pattern) {
            return Some(parsed.and_time(NaiveTime::MIN).and_utc().fixed_offset());
        }
    }
    None
}

/// Parses `UTC`, `Z`, `GMT`, `+03:00`, `-0530` or `+05` into a fixed offset.
pub fn parse_utc_offset(raw: &str) -> Result<FixedOffset, String> {
    let trimmed = raw.trim();
    if ["utc", "z", "gmt"].contains(&trimmed.to_ascii_lowercase().as_str()) {
        return FixedOffset::east_opt(0).ok_or_else(|| "invalid zero offset".to_string());
    }
    let (sign, rest) = match trimmed.chars().next() {
        Some('+') => (1, &trimmed[1..]),
        Some('-') => (-1, &trimmed[1..]),
        _ => return Err(format!("Unrecognized timezone offset '{raw}'")),
    };
    let digits = rest.replace(':', "");
    if digits.is_empty() || digits.len() > 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(format!("Unrecognized timezone offset '{raw}'"));
    }
    let (hours, minutes) = if digits.len() <= 2 {
        (digits.as_str(), "0")
    } else {
        digits.split_at(digits.len() - 2)
    };
    let hours: i32 = hours
        .parse()
        .map_err(|_| format!("Unrecognized timezone offset '{raw}'"))?;
    let minutes: i32 = minutes
        .parse()
        .map_err(|_| format!("Unrecognized timezone offset '{raw}'"))?;
    if minutes >= 60 {
        return Err(format!("Unrecognized timezone offset '{raw}'"));
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
        .ok_or_else(|| format!("Timezone offset '{raw}' is out of range"))
}
