//! Tests for the `Searchable` derive macro.

use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use serde_json::json;
use sift::query::{QueryOp, QueryPlan, SortDirection};
use sift::{CastKind, FieldSpec, RawAttributes, SchemaSearch, Search, SearchError, Searchable};

#[derive(Debug, Default, PartialEq, Searchable)]
#[search(table = "users", default_sort = "-created_at", max_page_size = 50)]
struct UserFilters {
    name: Option<String>,
    #[search(alias = "state")]
    status: Option<String>,
    #[search(no_sort)]
    age: Option<u32>,
    born: Option<NaiveDate>,
    tags: Vec<String>,
    #[search(rename = "verified", cast = "bool")]
    is_verified: Option<bool>,
    #[search(skip)]
    cache_key: String,
}

#[derive(Debug, Default, Searchable)]
#[search(strict, page_size_param = "limit", min_page_size = 5)]
struct StrictFilters {
    score: Option<f64>,
}

fn raw(value: serde_json::Value) -> RawAttributes {
    serde_json::from_value(value).unwrap()
}

#[test_log::test]
fn schema_reflects_field_types_and_attributes() {
    let schema = UserFilters::search_schema().unwrap();

    assert_eq!(
        schema.fields(),
        &[
            FieldSpec::new("name").cast(CastKind::String),
            FieldSpec::new("status").alias("state").cast(CastKind::String),
            FieldSpec::new("age").cast(CastKind::Integer).unsortable(),
            FieldSpec::new("born").cast(CastKind::Date),
            FieldSpec::new("tags").cast(CastKind::array_of(CastKind::String)),
            FieldSpec::new("verified").cast(CastKind::Boolean),
        ]
    );
    assert_eq!(schema.table(), Some("users"));
    assert_eq!(schema.default_sort(), Some("-created_at"));
    assert_eq!(schema.max_page_size(), 50);
    assert!(!schema.strict_casts());
}

#[test_log::test]
fn container_flags_reach_the_schema() {
    let schema = StrictFilters::search_schema().unwrap();
    assert!(schema.strict_casts());
    assert_eq!(schema.page_size_param(), "limit");
    assert_eq!(schema.min_page_size(), 5);
}

#[test_log::test]
fn accepted_attributes_read_back_into_the_struct() {
    let search = SchemaSearch::<QueryPlan>::of::<UserFilters>().unwrap();
    let accepted = Search::new(&search)
        .filter(&raw(json!({
            "name": "ada",
            "age": "36",
            "born": "1815-12-10",
            "tags": "math, poetry",
            "verified": "yes",
            "cache_key": "ignored",
        })))
        .unwrap();

    let filters = UserFilters::from_accepted(&accepted).unwrap();

    assert_eq!(
        filters,
        UserFilters {
            name: Some("ada".into()),
            status: None,
            age: Some(36),
            born: NaiveDate::from_ymd_opt(1815, 12, 10),
            tags: vec!["math".into(), "poetry".into()],
            is_verified: Some(true),
            cache_key: String::new(),
        }
    );
}

#[test_log::test]
fn derived_schema_drives_the_engine() {
    let search = SchemaSearch::<QueryPlan>::of::<UserFilters>().unwrap();
    let plan = sift::apply(
        &search,
        QueryPlan::default(),
        &raw(json!({ "status": "active", "sort": "age", "per_page": 80 })),
    )
    .unwrap();

    assert_eq!(
        plan.ops(),
        &[
            QueryOp::equals("users.state", "active"),
            QueryOp::order_by("users.created_at", SortDirection::Desc),
        ]
    );
    assert_eq!(plan.page_size(), 50);
}

#[test_log::test]
fn out_of_range_values_fail_conversion() {
    let search = SchemaSearch::<QueryPlan>::of::<UserFilters>().unwrap();
    let accepted = Search::new(&search).filter(&raw(json!({ "age": -4 }))).unwrap();

    let err = UserFilters::from_accepted(&accepted).unwrap_err();
    assert!(matches!(err, SearchError::Conversion { ref field, expected: "u32" } if field == "age"));
}

#[test_log::test]
fn strict_derived_schemas_reject_bad_casts() {
    let search = SchemaSearch::<QueryPlan>::of::<StrictFilters>().unwrap();
    let err = sift::apply(&search, QueryPlan::default(), &raw(json!({ "score": "high" }))).unwrap_err();
    assert!(matches!(err, SearchError::Validation(_)));
}
