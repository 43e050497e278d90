//! Raw request attributes and the whitelisted, cast subset derived from them.

use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value as JsonValue};
use tracing::{debug, trace};

use crate::cast::cast;
use crate::errors::{SearchError, ValidationError, ValidationIssue};
use crate::schema::SearchSchema;
use crate::value::{FromSearchValue, SearchValue};

/// The untouched request input, in arrival order.
///
/// Paging and sorting read from here rather than from [`AcceptedAttributes`],
/// since neither the sort token nor the page size is a whitelisted field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawAttributes {
    entries: Vec<(String, JsonValue)>,
}

impl RawAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<JsonValue>,
    {
        let mut raw = Self::new();
        for (key, value) in pairs {
            raw.insert(key, value);
        }
        raw
    }

    /// Parse a form-urlencoded query string (`a=1&tags[]=x&tags[]=y`).
    ///
    /// Keys suffixed with `[]` and keys that repeat collect their values into an array.
    pub fn from_query_string(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut raw = Self::new();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            let (key, is_list) = match key.strip_suffix("[]") {
                Some(stripped) => (stripped.to_string(), true),
                None => (key.into_owned(), false),
            };
            let value = JsonValue::String(value.into_owned());

            match raw.entries.iter_mut().find(|(existing, _)| *existing == key) {
                Some((_, JsonValue::Array(items))) => items.push(value),
                Some((_, existing)) => {
                    let first = existing.take();
                    *existing = JsonValue::Array(vec![first, value]);
                }
                None if is_list => raw.entries.push((key, JsonValue::Array(vec![value]))),
                None => raw.entries.push((key, value)),
            }
        }
        raw
    }

    /// Set `key`, replacing an existing entry with the exact same key in place.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<JsonValue>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Exact-key lookup.
    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &JsonValue)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<Map<String, JsonValue>> for RawAttributes {
    fn from(map: Map<String, JsonValue>) -> Self {
        Self {
            entries: map.into_iter().collect(),
        }
    }
}

impl<K, V> FromIterator<(K, V)> for RawAttributes
where
    K: Into<String>,
    V: Into<JsonValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from_pairs(iter)
    }
}

impl Serialize for RawAttributes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for RawAttributes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Map::<String, JsonValue>::deserialize(deserializer).map(Self::from)
    }
}

/// Whitelisted attributes after casting, keyed by declared field name.
///
/// Entries keep the order in which their keys first appeared in the input.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AcceptedAttributes {
    entries: Vec<(String, SearchValue)>,
}

impl AcceptedAttributes {
    fn insert(&mut self, name: &str, value: SearchValue) {
        match self.entries.iter_mut().find(|(existing, _)| existing == name) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((name.to_string(), value)),
        }
    }

    /// Case-insensitive lookup by declared field name.
    pub fn get(&self, name: &str) -> Option<&SearchValue> {
        self.entries
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    }

    /// Typed lookup. `Ok(None)` when the field was not accepted, an error when
    /// it was accepted with a value that does not convert to `T`.
    pub fn get_as<T: FromSearchValue>(&self, name: &str) -> Result<Option<T>, SearchError> {
        self.get(name).map(|value| T::read(name, value)).transpose()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SearchValue)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for AcceptedAttributes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, &value.to_json())?;
        }
        map.end()
    }
}

/// Keep only whitelisted, present attributes and cast them.
///
/// Unknown keys and null values are dropped silently. Empty strings and empty
/// arrays are dropped unless the schema keeps empties. Cast failures drop the
/// field, or in strict mode fail the call with every offending field listed.
pub fn filter_attributes(raw: &RawAttributes, schema: &SearchSchema) -> Result<AcceptedAttributes, SearchError> {
    let mut accepted = AcceptedAttributes::default();
    let mut issues = Vec::new();

    for (key, value) in raw.iter() {
        let Some(field) = schema.resolve(key) else {
            trace!(key, "dropping attribute outside the whitelist");
            continue;
        };

        if is_absent(value, schema.keep_empty()) {
            trace!(field = field.name(), "dropping empty attribute");
            continue;
        }

        match cast(value, field.spec().cast.as_ref()) {
            Ok(cast_value) => accepted.insert(field.name(), cast_value),
            Err(failure) if schema.strict_casts() => {
                issues.push(ValidationIssue::new(field.name(), "cast", failure.to_string()));
            }
            Err(failure) => {
                debug!(field = field.name(), %failure, "dropping attribute that failed to cast");
            }
        }
    }

    if !issues.is_empty() {
        return Err(ValidationError::new(issues).into());
    }

    Ok(accepted)
}

fn is_absent(value: &JsonValue, keep_empty: bool) -> bool {
    match value {
        JsonValue::Null => true,
        _ if keep_empty => false,
        JsonValue::String(text) => text.trim().is_empty(),
        JsonValue::Array(items) => items.is_empty(),
        JsonValue::Object(map) => map.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cast::CastKind;
    use crate::schema::FieldSpec;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn schema() -> SearchSchema {
        SearchSchema::builder()
            .field("name")
            .field(FieldSpec::new("status").alias("state"))
            .field(FieldSpec::new("age").cast(CastKind::Integer))
            .field(FieldSpec::new("born").cast(CastKind::Date))
            .build()
            .expect("schema should build")
    }

    #[test]
    fn drops_unknown_and_alias_target_keys() {
        let raw = RawAttributes::from_pairs([
            ("name", json!("a")),
            ("password", json!("hunter2")),
            ("state", json!("active")),
        ]);

        let accepted = filter_attributes(&raw, &schema()).unwrap();
        assert_eq!(accepted.keys().collect::<Vec<_>>(), vec!["name"]);
    }

    #[test]
    fn stores_under_declared_name_in_input_order() {
        let raw = RawAttributes::from_pairs([("AGE", json!("30")), ("Status", json!("active")), ("NAME", json!("a"))]);

        let accepted = filter_attributes(&raw, &schema()).unwrap();
        assert_eq!(accepted.keys().collect::<Vec<_>>(), vec!["age", "status", "name"]);
        assert_eq!(accepted.get("age"), Some(&SearchValue::Integer(30)));
        assert_eq!(accepted.get("status"), Some(&SearchValue::Raw(json!("active"))));
    }

    #[test]
    fn repeated_field_keeps_first_position_and_last_value() {
        let raw = RawAttributes::from_pairs([("name", json!("first")), ("age", json!(1)), ("Name", json!("second"))]);

        let accepted = filter_attributes(&raw, &schema()).unwrap();
        assert_eq!(accepted.keys().collect::<Vec<_>>(), vec!["name", "age"]);
        assert_eq!(accepted.get_as::<String>("name").unwrap(), Some("second".to_string()));
    }

    #[test]
    fn drops_null_and_empty_values_by_default() {
        let raw = RawAttributes::from_pairs([("name", json!("  ")), ("status", JsonValue::Null), ("age", json!([]))]);
        assert!(filter_attributes(&raw, &schema()).unwrap().is_empty());
    }

    #[test]
    fn keep_empty_retains_empty_strings_but_not_nulls() {
        let schema = SearchSchema::builder().field("name").field("status").keep_empty(true).build().unwrap();
        let raw = RawAttributes::from_pairs([("name", json!("")), ("status", JsonValue::Null)]);

        let accepted = filter_attributes(&raw, &schema).unwrap();
        assert_eq!(accepted.keys().collect::<Vec<_>>(), vec!["name"]);
    }

    #[test]
    fn permissive_mode_drops_failed_casts() {
        let raw = RawAttributes::from_pairs([("age", json!("old")), ("name", json!("a"))]);

        let accepted = filter_attributes(&raw, &schema()).unwrap();
        assert_eq!(accepted.keys().collect::<Vec<_>>(), vec!["name"]);
    }

    #[test]
    fn strict_mode_reports_every_failed_field() {
        let schema = SearchSchema::builder()
            .field(FieldSpec::new("age").cast(CastKind::Integer))
            .field(FieldSpec::new("born").cast(CastKind::Date))
            .field("name")
            .strict_casts(true)
            .build()
            .unwrap();
        let raw = RawAttributes::from_pairs([("age", json!("old")), ("name", json!("a")), ("born", json!("yesterday"))]);

        let err = filter_attributes(&raw, &schema).unwrap_err();
        let SearchError::Validation(validation) = err else {
            panic!("expected validation error, got {err:?}");
        };
        assert_eq!(validation.fields(), vec!["age", "born"]);
        assert!(validation.issues.iter().all(|issue| issue.code == "cast"));
    }

    #[test]
    fn get_as_reports_conversion_errors() {
        let raw = RawAttributes::from_pairs([("name", json!("a")), ("age", json!(5))]);
        let accepted = filter_attributes(&raw, &schema()).unwrap();

        assert_eq!(accepted.get_as::<i64>("age").unwrap(), Some(5));
        assert_eq!(accepted.get_as::<i64>("born").unwrap(), None);
        assert!(matches!(
            accepted.get_as::<bool>("name"),
            Err(SearchError::Conversion { expected: "bool", .. })
        ));
    }

    #[test]
    fn query_string_collects_lists() {
        let raw = RawAttributes::from_query_string("?name=a%20b&tags[]=x&tags[]=y&id=1&id=2&sort=-id");

        assert_eq!(raw.get("name"), Some(&json!("a b")));
        assert_eq!(raw.get("tags"), Some(&json!(["x", "y"])));
        assert_eq!(raw.get("id"), Some(&json!(["1", "2"])));
        assert_eq!(raw.get("sort"), Some(&json!("-id")));
        assert_eq!(raw.iter().map(|(key, _)| key).collect::<Vec<_>>(), vec!["name", "tags", "id", "sort"]);
    }

    #[test]
    fn raw_attributes_keep_json_object_order() {
        let map = json!({"z": 1, "a": 2, "m": 3});
        let JsonValue::Object(map) = map else { unreachable!() };
        let raw = RawAttributes::from(map);
        assert_eq!(raw.iter().map(|(key, _)| key).collect::<Vec<_>>(), vec!["z", "a", "m"]);
    }

    #[test]
    fn accepted_serializes_as_plain_map() {
        let raw = RawAttributes::from_pairs([("age", json!("4")), ("name", json!("a"))]);
        let accepted = filter_attributes(&raw, &schema()).unwrap();
        assert_eq!(serde_json::to_value(&accepted).unwrap(), json!({"age": 4, "name": "a"}));
    }
}
