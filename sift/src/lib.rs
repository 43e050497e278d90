//! Sift core library.
//!
//! Turns untyped request attributes into predicates, an ordering and a page
//! size on a caller-supplied query. Only fields a [`SearchSchema`] declares can
//! reach the query; everything else is dropped before assembly.
//!
//! ```
//! use serde_json::json;
//! use sift::query::{QueryOp, QueryPlan, SortDirection};
//! use sift::{RawAttributes, SchemaSearch, SearchSchema};
//!
//! let users = SchemaSearch::<QueryPlan>::new(
//!     SearchSchema::builder().table("users").field("name").default_sort("-id").build().unwrap(),
//! );
//! let raw = RawAttributes::from_query_string("name=ada&admin=1&per_page=500");
//!
//! let plan = sift::apply(&users, QueryPlan::default(), &raw).unwrap();
//! assert_eq!(
//!     plan.ops(),
//!     &[QueryOp::equals("users.name", json!("ada")), QueryOp::order_by("users.id", SortDirection::Desc)]
//! );
//! assert_eq!(plan.page_size(), 100);
//! ```

extern crate self as sift;

pub mod assembler;
pub mod attributes;
pub mod cast;
pub mod config;
pub mod definition;
pub mod engine;
pub mod errors;
pub mod handlers;
pub mod paging;
pub mod query;
pub mod schema;
pub mod sort;
pub mod value;

pub use attributes::{AcceptedAttributes, RawAttributes, filter_attributes};
pub use cast::CastKind;
pub use definition::{SchemaSearch, SearchDefinition, Searchable};
pub use engine::{Search, SearchOutcome, apply, apply_source};
pub use errors::*;
pub use handlers::{FilterHandler, Handlers, SortHandler, handler_key};
pub use query::{QueryPlan, QuerySource, SearchQuery, SortDirection};
pub use schema::{FieldSpec, SearchSchema, SearchSchemaBuilder};
pub use sift_macros::Searchable;
pub use sort::SortDirective;
pub use value::{FromSearchValue, SearchValue};
