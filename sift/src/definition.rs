//! Search definitions: a schema plus optional per-field handlers.

use std::fmt;
use std::marker::PhantomData;

use crate::attributes::AcceptedAttributes;
use crate::errors::SearchError;
use crate::handlers::Handlers;
use crate::query::SearchQuery;
use crate::schema::SearchSchema;

/// A concrete search: which fields it accepts, and how it overrides them.
///
/// Handlers are registered explicitly rather than discovered by name:
///
/// ```
/// use sift::query::{Comparison, QueryPlan};
/// use sift::{Handlers, SearchDefinition, SearchError, SearchSchema, SearchValue};
///
/// struct UserSearch {
///     schema: SearchSchema,
/// }
///
/// impl UserSearch {
///     fn name(&self, query: &mut QueryPlan, value: &SearchValue) -> Result<(), SearchError> {
///         query.where_op("users.name", Comparison::Like, format!("{}%", value.as_str().unwrap_or_default()));
///         Ok(())
///     }
/// }
///
/// impl SearchDefinition for UserSearch {
///     type Query = QueryPlan;
///
///     fn schema(&self) -> &SearchSchema {
///         &self.schema
///     }
///
///     fn register(&self, handlers: &mut Handlers<Self>) {
///         handlers.filter("name", Self::name);
///     }
/// }
/// ```
pub trait SearchDefinition: Sized {
    type Query: SearchQuery;

    fn schema(&self) -> &SearchSchema;

    /// Register custom filter and sort handlers. The default registers none.
    fn register(&self, _handlers: &mut Handlers<Self>) {}
}

/// Types that declare a whitelist through `#[derive(Searchable)]`.
///
/// The derived struct doubles as a typed view of the accepted attributes.
pub trait Searchable: Sized {
    fn search_schema() -> Result<SearchSchema, SearchError>;

    fn from_accepted(accepted: &AcceptedAttributes) -> Result<Self, SearchError>;
}

/// A definition with no handlers, for searches that only need the generic rules.
pub struct SchemaSearch<Q> {
    schema: SearchSchema,
    _query: PhantomData<fn() -> Q>,
}

impl<Q: SearchQuery> SchemaSearch<Q> {
    pub fn new(schema: SearchSchema) -> Self {
        Self {
            schema,
            _query: PhantomData,
        }
    }

    /// Build from a derived [`Searchable`] declaration.
    pub fn of<S: Searchable>() -> Result<Self, SearchError> {
        S::search_schema().map(Self::new)
    }
}

impl<Q> Clone for SchemaSearch<Q> {
    fn clone(&self) -> Self {
        Self {
            schema: self.schema.clone(),
            _query: PhantomData,
        }
    }
}

impl<Q> fmt::Debug for SchemaSearch<Q> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaSearch").field("schema", &self.schema).finish()
    }
}

impl<Q: SearchQuery> SearchDefinition for SchemaSearch<Q> {
    type Query = Q;

    fn schema(&self) -> &SearchSchema {
        &self.schema
    }
}
