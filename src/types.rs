//! Type keys used to look up casters, and the aliases that expand to groups of them.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Identifies the declared type of a field.
///
/// The built-in variants cover the primitives and the date/time types the default casters
/// produce. `Custom` carries the name of any other type a caller registers a caster for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TypeKey {
    Int,
    Float,
    Bool,
    String,
    /// `DateTime<FixedOffset>`, the canonical date/time type.
    DateTime,
    UtcDateTime,
    NaiveDateTime,
    NaiveDate,
    Custom(String),
}

impl TypeKey {
    pub const DATE_TYPES: [TypeKey; 4] = [
        TypeKey::DateTime,
        TypeKey::UtcDateTime,
        TypeKey::NaiveDateTime,
        TypeKey::NaiveDate,
    ];

    pub fn custom(name: impl Into<String>) -> Self {
        TypeKey::Custom(name.into())
    }

    pub fn name(&self) -> &str {
        match self {
            TypeKey::Int => "int",
            TypeKey::Float => "float",
            TypeKey::Bool => "bool",
            TypeKey::String => "string",
            TypeKey::DateTime => "datetime",
            TypeKey::UtcDateTime => "datetime_utc",
            TypeKey::NaiveDateTime => "naive_datetime",
            TypeKey::NaiveDate => "naive_date",
            TypeKey::Custom(name) => name,
        }
    }

    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            TypeKey::Int | TypeKey::Float | TypeKey::Bool | TypeKey::String
        )
    }

    pub fn is_date(&self) -> bool {
        Self::DATE_TYPES.contains(self)
    }

    pub fn is_number(&self) -> bool {
        matches!(self, TypeKey::Int | TypeKey::Float)
    }

    /// Maps a type name to a key. Known names match case-insensitively; anything else is
    /// kept verbatim as a custom key.
    pub fn parse(name: &str) -> Self {
        let trimmed = name.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "int" | "integer" | "i64" => TypeKey::Int,
            "float" | "double" | "f64" => TypeKey::Float,
            "bool" | "boolean" => TypeKey::Bool,
            "string" | "str" => TypeKey::String,
            "datetime" | "datetime<fixedoffset>" => TypeKey::DateTime,
            "datetime_utc" | "datetime<utc>" => TypeKey::UtcDateTime,
            "naive_datetime" | "naivedatetime" => TypeKey::NaiveDateTime,
            "naive_date" | "naivedate" => TypeKey::NaiveDate,
            _ => TypeKey::Custom(trimmed.to_string()),
        }
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<String> for TypeKey {
    fn from(value: String) -> Self {
        TypeKey::parse(&value)
    }
}

impl From<&str> for TypeKey {
    fn from(value: &str) -> Self {
        TypeKey::parse(value)
    }
}

impl From<TypeKey> for String {
    fn from(value: TypeKey) -> Self {
        value.name().to_string()
    }
}

/// What a caster registration applies to: a single key or an alias group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CastTarget {
    Key(TypeKey),
    /// Every date/time key.
    Date,
    /// `Int` and `Float`.
    Number,
}

impl CastTarget {
    pub fn resolve(&self) -> Vec<TypeKey> {
        match self {
            CastTarget::Key(key) => vec![key.clone()],
            CastTarget::Date => TypeKey::DATE_TYPES.to_vec(),
            CastTarget::Number => vec![TypeKey::Int, TypeKey::Float],
        }
    }
}

impl From<TypeKey> for CastTarget {
    fn from(value: TypeKey) -> Self {
        CastTarget::Key(value)
    }
}

impl From<&str> for CastTarget {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "date" => CastTarget::Date,
            "number" => CastTarget::Number,
            _ => CastTarget::Key(TypeKey::parse(value)),
        }
    }
}

/// A declared type as written in a record definition file, e.g. `?float` or `int|null`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredType {
    pub key: TypeKey,
    pub nullable: bool,
}

impl FromStr for DeclaredType {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err("type name cannot be empty".to_string());
        }
        if let Some(inner) = trimmed.strip_prefix('?') {
            return Self::nullable(trimmed, inner);
        }
        if let Some(inner) = trimmed
            .strip_prefix("Option<")
            .and_then(|rest| rest.strip_suffix('>'))
        {
            return Self::nullable(trimmed, inner);
        }
        let parts = trimmed.split('|').map(str::trim).collect::<Vec<_>>();
        let (nulls, types): (Vec<&str>, Vec<&str>) = parts
            .into_iter()
            .partition(|part| part.eq_ignore_ascii_case("null"));
        match types.as_slice() {
            [single] if !single.is_empty() => Ok(Self {
                key: TypeKey::parse(single),
                nullable: !nulls.is_empty(),
            }),
            [] => Err(format!("type '{trimmed}' does not name a concrete type")),
            _ => Err(format!(
                "type '{trimmed}' names more than one concrete type"
            )),
        }
    }
}

impl DeclaredType {
    fn nullable(raw: &str, inner: &str) -> Result<Self, String> {
        if inner.trim().is_empty() {
            return Err(format!("type '{raw}' does not name a concrete type"));
        }
        Ok(Self {
            key: TypeKey::parse(inner),
            nullable: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_parse_case_insensitively_with_aliases() {
        assert_eq!(TypeKey::parse("Integer"), TypeKey::Int);
        assert_eq!(TypeKey::parse("DOUBLE"), TypeKey::Float);
        assert_eq!(TypeKey::parse("boolean"), TypeKey::Bool);
        assert_eq!(TypeKey::parse("Money"), TypeKey::custom("Money"));
    }

    #[test]
    fn aliases_expand_to_groups() {
        assert_eq!(CastTarget::from("date").resolve().len(), 4);
        assert_eq!(
            CastTarget::from("number").resolve(),
            vec![TypeKey::Int, TypeKey::Float]
        );
        assert_eq!(CastTarget::from("int").resolve(), vec![TypeKey::Int]);
    }

    #[test]
    fn declared_types_detect_null_admitting_forms() {
        let plain: DeclaredType = "float".parse().unwrap();
        assert!(!plain.nullable);
        for raw in ["?float", "float|null", "null | float", "Option<float>"] {
            let parsed: DeclaredType = raw.parse().unwrap();
            assert_eq!(parsed.key, TypeKey::Float, "{raw}");
            assert!(parsed.nullable, "{raw}");
        }
        assert!("int|string".parse::<DeclaredType>().is_err());
        assert!("null".parse::<DeclaredType>().is_err());
        assert!("?".parse::<DeclaredType>().is_err());
        assert!("Option< >".parse::<DeclaredType>().is_err());
    }
}
