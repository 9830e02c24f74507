//! Casters convert an untyped cell into the value a field's declared type expects.
//!
//! A [`Caster`] is a pure function of `(value, format)`. The built-in implementations cover
//! the primitive and date/time keys; callers plug in their own through
//! [`crate::registry::CasterRegistry::with_cast`] or [`from_fn`].

mod boolean;
mod date;
mod float;
mod int;
mod string;

use std::{fmt, str::FromStr};

use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use thiserror::Error;

use crate::value::Value;

pub use boolean::BoolCaster;
pub use date::{DateCaster, parse_utc_offset};
pub use float::FloatCaster;
pub use int::IntCaster;
pub use string::{LetterCase, StringCaster};

pub trait Caster: fmt::Debug + Send + Sync {
    fn cast(&self, value: &Value, format: Option<&str>) -> Result<Value, CastFailure>;
}

/// Why a caster refused a value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct CastFailure(String);

impl CastFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

/// A caster backed by a closure.
pub struct FnCaster<F> {
    name: &'static str,
    func: F,
}

impl<F> fmt::Debug for FnCaster<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnCaster").field("name", &self.name).finish()
    }
}

impl<F> Caster for FnCaster<F>
where
    F: Fn(&Value, Option<&str>) -> Result<Value, CastFailure> + Send + Sync,
{
    fn cast(&self, value: &Value, format: Option<&str>) -> Result<Value, CastFailure> {
        (self.func)(value, format)
    }
}

pub fn from_fn<F>(name: &'static str, func: F) -> FnCaster<F>
where
    F: Fn(&Value, Option<&str>) -> Result<Value, CastFailure> + Send + Sync,
{
    FnCaster { name, func }
}

/// Reads a format argument meaning "number of decimal places".
pub(crate) fn decimal_places(format: Option<&str>) -> Option<u32> {
    format.and_then(|raw| u32::from_str(raw.trim()).ok())
}

/// Rounds half away from zero on the shortest decimal representation of `value`, so that
/// `2.675` rounds to `2.68` the way a spreadsheet user expects.
pub(crate) fn round_half_away(value: f64, places: u32) -> f64 {
    match shortest_decimal(value) {
        Some(decimal) => decimal
            .round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero)
            .to_f64()
            .unwrap_or(value),
        None => round_float(value, places),
    }
}

/// Formats with exactly `places` decimals, rounding half away from zero.
pub(crate) fn format_fixed(value: f64, places: u32) -> String {
    match shortest_decimal(value) {
        Some(decimal) => {
            let mut rounded =
                decimal.round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero);
            rounded.rescale(places);
            rounded.to_string()
        }
        None => format!("{:.precision$}", value, precision = places as usize),
    }
}

fn shortest_decimal(value: f64) -> Option<Decimal> {
    if !value.is_finite() {
        return None;
    }
    Decimal::from_str(&value.to_string()).ok()
}

fn round_float(value: f64, places: u32) -> f64 {
    if places == 0 {
        value.round()
    } else {
        let factor = 10f64.powi(places as i32);
        (value * factor).round() / factor
    }
}
