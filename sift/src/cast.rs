//! Value casting for accepted attributes.
//!
//! Each whitelisted field may declare a [`CastKind`]. Raw request values are JSON
//! (query strings arrive as strings), so every cast accepts both the native JSON
//! shape and its textual form.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::errors::SearchError;
use crate::value::SearchValue;

/// Target type for a whitelisted field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CastKind {
    Integer,
    Float,
    Boolean,
    String,
    Date,
    Timestamp,
    Array(Box<CastKind>),
}

impl CastKind {
    /// Array of the given element kind.
    pub fn array_of(inner: CastKind) -> Self {
        CastKind::Array(Box::new(inner))
    }
}

impl fmt::Display for CastKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CastKind::Integer => f.write_str("integer"),
            CastKind::Float => f.write_str("float"),
            CastKind::Boolean => f.write_str("boolean"),
            CastKind::String => f.write_str("string"),
            CastKind::Date => f.write_str("date"),
            CastKind::Timestamp => f.write_str("timestamp"),
            CastKind::Array(inner) => write!(f, "array<{inner}>"),
        }
    }
}

impl FromStr for CastKind {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        if let Some(inner) = normalized
            .strip_prefix("array<")
            .or_else(|| normalized.strip_prefix("list<"))
            .and_then(|rest| rest.strip_suffix('>'))
        {
            return Ok(CastKind::array_of(inner.parse()?));
        }

        match normalized.as_str() {
            "int" | "integer" => Ok(CastKind::Integer),
            "float" | "double" | "decimal" | "real" => Ok(CastKind::Float),
            "bool" | "boolean" => Ok(CastKind::Boolean),
            "string" | "str" | "text" => Ok(CastKind::String),
            "date" => Ok(CastKind::Date),
            "datetime" | "timestamp" => Ok(CastKind::Timestamp),
            "array" | "list" => Ok(CastKind::array_of(CastKind::String)),
            other => Err(SearchError::config(format!("unknown cast type '{other}'"))),
        }
    }
}

impl Serialize for CastKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CastKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A raw value that could not be converted to its declared type.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("expected {expected}, got {found}")]
pub struct CastFailure {
    pub expected: String,
    pub found: String,
}

impl CastFailure {
    fn new(expected: &CastKind, found: &JsonValue) -> Self {
        let mut found = found.to_string();
        if found.chars().count() > 64 {
            found = found.chars().take(61).chain("...".chars()).collect();
        }
        Self {
            expected: expected.to_string(),
            found,
        }
    }
}

/// Casts `raw` to `kind`. Without a declared kind the value passes through as [`SearchValue::Raw`].
pub fn cast(raw: &JsonValue, kind: Option<&CastKind>) -> Result<SearchValue, CastFailure> {
    match kind {
        None => Ok(SearchValue::Raw(raw.clone())),
        Some(kind) => cast_to(raw, kind),
    }
}

fn cast_to(raw: &JsonValue, kind: &CastKind) -> Result<SearchValue, CastFailure> {
    let fail = || CastFailure::new(kind, raw);
    match kind {
        CastKind::Integer => parse_integer(raw).map(SearchValue::Integer).ok_or_else(fail),
        CastKind::Float => parse_float(raw).map(SearchValue::Float).ok_or_else(fail),
        CastKind::Boolean => parse_boolean(raw).map(SearchValue::Boolean).ok_or_else(fail),
        CastKind::String => parse_string(raw).map(SearchValue::String).ok_or_else(fail),
        CastKind::Date => parse_date(raw).map(SearchValue::Date).ok_or_else(fail),
        CastKind::Timestamp => parse_timestamp(raw).map(SearchValue::Timestamp).ok_or_else(fail),
        CastKind::Array(inner) => {
            let elements: Vec<JsonValue> = match raw {
                JsonValue::Array(items) => items.clone(),
                JsonValue::String(text) => text
                    .split(',')
                    .map(str::trim)
                    .filter(|segment| !segment.is_empty())
                    .map(|segment| JsonValue::String(segment.to_string()))
                    .collect(),
                JsonValue::Object(_) | JsonValue::Null => return Err(fail()),
                scalar => vec![scalar.clone()],
            };
            elements
                .iter()
                .map(|element| cast_to(element, inner))
                .collect::<Result<Vec<_>, _>>()
                .map(SearchValue::Array)
                .map_err(|_| fail())
        }
    }
}

/// Parses an integer from a JSON number or trimmed decimal string.
pub fn parse_integer(raw: &JsonValue) -> Option<i64> {
    match raw {
        JsonValue::Number(number) => number.as_i64().or_else(|| {
            number
                .as_f64()
                .filter(|v| v.fract() == 0.0 && *v >= i64::MIN as f64 && *v < i64::MAX as f64)
                .map(|v| v as i64)
        }),
        JsonValue::String(text) => text.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn parse_float(raw: &JsonValue) -> Option<f64> {
    match raw {
        JsonValue::Number(number) => number.as_f64(),
        JsonValue::String(text) => text.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

fn parse_boolean(raw: &JsonValue) -> Option<bool> {
    match raw {
        JsonValue::Bool(value) => Some(*value),
        JsonValue::Number(number) => match number.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        JsonValue::String(text) => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Some(true),
            "false" | "0" | "no" | "off" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn parse_string(raw: &JsonValue) -> Option<String> {
    match raw {
        JsonValue::String(text) => Some(text.clone()),
        JsonValue::Number(number) => Some(number.to_string()),
        JsonValue::Bool(value) => Some(value.to_string()),
        _ => None,
    }
}

fn parse_date(raw: &JsonValue) -> Option<NaiveDate> {
    let text = raw.as_str()?.trim();
    NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()
}

fn parse_timestamp(raw: &JsonValue) -> Option<DateTime<Utc>> {
    match raw {
        JsonValue::Number(number) => number.as_i64().and_then(|secs| Utc.timestamp_opt(secs, 0).single()),
        JsonValue::String(text) => {
            let text = text.trim();
            if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
                return Some(parsed.with_timezone(&Utc));
            }
            if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S") {
                return Some(naive.and_utc());
            }
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc())
        }
        _ => None,
    }
}
