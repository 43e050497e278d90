//! Typed attribute values produced by casting.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::errors::SearchError;

/// A value accepted from the raw attributes, after casting.
///
/// Fields without a declared cast keep their original JSON value as [`SearchValue::Raw`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum SearchValue {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    String(String),
    Timestamp(DateTime<Utc>),
    Date(NaiveDate),
    Array(Vec<SearchValue>),
    Raw(JsonValue),
}

impl SearchValue {
    /// Short name of the variant, used in logs and conversion errors.
    pub const fn kind(&self) -> &'static str {
        match self {
            SearchValue::Integer(_) => "integer",
            SearchValue::Float(_) => "float",
            SearchValue::Boolean(_) => "boolean",
            SearchValue::String(_) => "string",
            SearchValue::Timestamp(_) => "timestamp",
            SearchValue::Date(_) => "date",
            SearchValue::Array(_) => "array",
            SearchValue::Raw(_) => "raw",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SearchValue::String(value) => Some(value),
            SearchValue::Raw(JsonValue::String(value)) => Some(value),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SearchValue::Integer(value) => Some(*value),
            SearchValue::Raw(value) => value.as_i64(),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[SearchValue]> {
        match self {
            SearchValue::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Plain JSON form, without the variant tag.
    pub fn to_json(&self) -> JsonValue {
        match self {
            SearchValue::Integer(value) => JsonValue::from(*value),
            SearchValue::Float(value) => JsonValue::from(*value),
            SearchValue::Boolean(value) => JsonValue::Bool(*value),
            SearchValue::String(value) => JsonValue::String(value.clone()),
            SearchValue::Timestamp(value) => JsonValue::String(value.to_rfc3339()),
            SearchValue::Date(value) => JsonValue::String(value.format("%Y-%m-%d").to_string()),
            SearchValue::Array(items) => JsonValue::Array(items.iter().map(SearchValue::to_json).collect()),
            SearchValue::Raw(value) => value.clone(),
        }
    }
}

impl fmt::Display for SearchValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchValue::Integer(value) => write!(f, "{value}"),
            SearchValue::Float(value) => write!(f, "{value}"),
            SearchValue::Boolean(value) => write!(f, "{value}"),
            SearchValue::String(value) => write!(f, "'{value}'"),
            SearchValue::Timestamp(value) => write!(f, "'{}'", value.to_rfc3339()),
            SearchValue::Date(value) => write!(f, "'{}'", value.format("%Y-%m-%d")),
            SearchValue::Array(items) => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str(")")
            }
            SearchValue::Raw(JsonValue::String(value)) => write!(f, "'{value}'"),
            SearchValue::Raw(value) => write!(f, "{value}"),
        }
    }
}

impl From<&str> for SearchValue {
    fn from(value: &str) -> Self {
        SearchValue::String(value.to_string())
    }
}

impl From<String> for SearchValue {
    fn from(value: String) -> Self {
        SearchValue::String(value)
    }
}

impl From<i64> for SearchValue {
    fn from(value: i64) -> Self {
        SearchValue::Integer(value)
    }
}

impl From<i32> for SearchValue {
    fn from(value: i32) -> Self {
        SearchValue::Integer(value.into())
    }
}

impl From<f64> for SearchValue {
    fn from(value: f64) -> Self {
        SearchValue::Float(value)
    }
}

impl From<bool> for SearchValue {
    fn from(value: bool) -> Self {
        SearchValue::Boolean(value)
    }
}

/// Uncast input, kept as it arrived.
impl From<JsonValue> for SearchValue {
    fn from(value: JsonValue) -> Self {
        SearchValue::Raw(value)
    }
}

/// Conversion from an accepted [`SearchValue`] into a concrete Rust type.
///
/// Implemented for the types the `Searchable` derive understands, so generated
/// `from_accepted` bodies can read every field with one call.
pub trait FromSearchValue: Sized {
    /// Type name reported in [`SearchError::Conversion`].
    const EXPECTED: &'static str;

    fn from_search_value(value: &SearchValue) -> Option<Self>;

    fn read(field: &str, value: &SearchValue) -> Result<Self, SearchError> {
        Self::from_search_value(value).ok_or_else(|| SearchError::Conversion {
            field: field.to_string(),
            expected: Self::EXPECTED,
        })
    }
}

macro_rules! impl_from_search_value_int {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FromSearchValue for $ty {
                const EXPECTED: &'static str = stringify!($ty);

                fn from_search_value(value: &SearchValue) -> Option<Self> {
                    value.as_i64().and_then(|v| <$ty>::try_from(v).ok())
                }
            }
        )*
    };
}

impl_from_search_value_int!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl FromSearchValue for f64 {
    const EXPECTED: &'static str = "f64";

    fn from_search_value(value: &SearchValue) -> Option<Self> {
        match value {
            SearchValue::Float(v) => Some(*v),
            SearchValue::Integer(v) => Some(*v as f64),
            SearchValue::Raw(v) => v.as_f64(),
            _ => None,
        }
    }
}

impl FromSearchValue for f32 {
    const EXPECTED: &'static str = "f32";

    fn from_search_value(value: &SearchValue) -> Option<Self> {
        f64::from_search_value(value).map(|v| v as f32)
    }
}

impl FromSearchValue for bool {
    const EXPECTED: &'static str = "bool";

    fn from_search_value(value: &SearchValue) -> Option<Self> {
        match value {
            SearchValue::Boolean(v) => Some(*v),
            SearchValue::Raw(v) => v.as_bool(),
            _ => None,
        }
    }
}

impl FromSearchValue for String {
    const EXPECTED: &'static str = "String";

    fn from_search_value(value: &SearchValue) -> Option<Self> {
        value.as_str().map(str::to_string)
    }
}

impl FromSearchValue for DateTime<Utc> {
    const EXPECTED: &'static str = "DateTime<Utc>";

    fn from_search_value(value: &SearchValue) -> Option<Self> {
        match value {
            SearchValue::Timestamp(v) => Some(*v),
            _ => None,
        }
    }
}

impl FromSearchValue for NaiveDate {
    const EXPECTED: &'static str = "NaiveDate";

    fn from_search_value(value: &SearchValue) -> Option<Self> {
        match value {
            SearchValue::Date(v) => Some(*v),
            SearchValue::Timestamp(v) => Some(v.date_naive()),
            _ => None,
        }
    }
}

impl FromSearchValue for JsonValue {
    const EXPECTED: &'static str = "serde_json::Value";

    fn from_search_value(value: &SearchValue) -> Option<Self> {
        Some(value.to_json())
    }
}

impl FromSearchValue for SearchValue {
    const EXPECTED: &'static str = "SearchValue";

    fn from_search_value(value: &SearchValue) -> Option<Self> {
        Some(value.clone())
    }
}

impl<T: FromSearchValue> FromSearchValue for Vec<T> {
    const EXPECTED: &'static str = "Vec";

    fn from_search_value(value: &SearchValue) -> Option<Self> {
        match value {
            SearchValue::Array(items) => items.iter().map(T::from_search_value).collect(),
            other => T::from_search_value(other).map(|single| vec![single]),
        }
    }
}
