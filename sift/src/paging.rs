//! Page size clamping.

use tracing::trace;

use crate::attributes::RawAttributes;
use crate::cast::parse_integer;
use crate::query::SearchQuery;
use crate::schema::SearchSchema;

/// Requested page size, if the request carries a numeric one.
pub fn requested_page_size(raw: &RawAttributes, schema: &SearchSchema) -> Option<i64> {
    raw.get(schema.page_size_param()).and_then(parse_integer)
}

/// Effective page size: the requested size (or `default`), capped at the
/// schema maximum and raised to the schema minimum.
///
/// ```
/// use sift::{RawAttributes, SearchSchema};
/// use sift::paging::normalize_page_size;
///
/// let schema = SearchSchema::builder().max_page_size(50).build().unwrap();
/// let raw = RawAttributes::from_pairs([("per_page", "500")]);
/// assert_eq!(normalize_page_size(&raw, &schema, 15), 50);
/// assert_eq!(normalize_page_size(&RawAttributes::new(), &schema, 15), 15);
/// ```
pub fn normalize_page_size(raw: &RawAttributes, schema: &SearchSchema, default: u64) -> u64 {
    let requested = match requested_page_size(raw, schema) {
        Some(size) => u64::try_from(size).unwrap_or(0),
        None => default,
    };
    requested.min(schema.max_page_size()).max(schema.min_page_size())
}

/// Normalize the page size and set it on the query.
pub fn apply_paging<Q: SearchQuery + ?Sized>(raw: &RawAttributes, schema: &SearchSchema, query: &mut Q) -> u64 {
    let size = normalize_page_size(raw, schema, query.default_page_size());
    trace!(size, "setting page size");
    query.set_page_size(size);
    size
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::QueryPlan;
    use serde_json::json;

    fn schema() -> SearchSchema {
        SearchSchema::builder().max_page_size(100).build().unwrap()
    }

    fn request(value: serde_json::Value) -> RawAttributes {
        RawAttributes::from_pairs([("per_page", value)])
    }

    #[test]
    fn caps_at_maximum() {
        assert_eq!(normalize_page_size(&request(json!(500)), &schema(), 15), 100);
        assert_eq!(normalize_page_size(&request(json!("100")), &schema(), 15), 100);
        assert_eq!(normalize_page_size(&request(json!(" 42 ")), &schema(), 15), 42);
    }

    #[test]
    fn zero_and_negative_requests_are_raised_to_minimum() {
        assert_eq!(normalize_page_size(&request(json!(0)), &schema(), 15), 1);
        assert_eq!(normalize_page_size(&request(json!(-5)), &schema(), 15), 1);
    }

    #[test]
    fn non_numeric_requests_use_the_default() {
        assert_eq!(normalize_page_size(&request(json!("lots")), &schema(), 15), 15);
        assert_eq!(normalize_page_size(&request(json!(null)), &schema(), 15), 15);
        assert_eq!(normalize_page_size(&RawAttributes::new(), &schema(), 250), 100);
    }

    #[test]
    fn custom_parameter_name_is_honoured() {
        let schema = SearchSchema::builder().page_size_param("limit").build().unwrap();
        let raw = RawAttributes::from_pairs([("limit", json!(7)), ("per_page", json!(9))]);
        assert_eq!(normalize_page_size(&raw, &schema, 15), 7);
    }

    #[test]
    fn apply_paging_sets_the_query() {
        let mut plan = QueryPlan::new(20);
        assert_eq!(apply_paging(&RawAttributes::new(), &schema(), &mut plan), 20);
        assert_eq!(plan.page_size(), 20);
    }
}
