//! Per-field overrides for filtering and sorting.
//!
//! A definition registers handlers in [`SearchDefinition::register`]; a
//! registered handler replaces the generic equality predicate (or ordering) for
//! its field. Lookup keys go through [`handler_key`], so `"created_at"`,
//! `"createdAt"` and `"CreatedAt"` all name the same handler.

use std::collections::HashMap;
use std::fmt;

use crate::definition::SearchDefinition;
use crate::errors::SearchError;
use crate::query::SortDirection;
use crate::value::SearchValue;

/// Replaces the generic equality predicate for one field.
pub type FilterHandler<D> =
    fn(&D, &mut <D as SearchDefinition>::Query, &SearchValue) -> Result<(), SearchError>;

/// Replaces the generic ordering for one field. Receives the resolved direction.
pub type SortHandler<D> = fn(&D, &mut <D as SearchDefinition>::Query, SortDirection) -> Result<(), SearchError>;

/// Normalized lookup key: ASCII lowercase with `_` and `-` removed.
///
/// Schemas whose field names share a key are rejected at build time.
pub fn handler_key(field: &str) -> String {
    field
        .chars()
        .filter(|c| *c != '_' && *c != '-')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

pub struct Handlers<D: SearchDefinition> {
    filters: HashMap<String, FilterHandler<D>>,
    sorts: HashMap<String, SortHandler<D>>,
}

impl<D: SearchDefinition> Default for Handlers<D> {
    fn default() -> Self {
        Self {
            filters: HashMap::new(),
            sorts: HashMap::new(),
        }
    }
}

impl<D: SearchDefinition> fmt::Debug for Handlers<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut filters: Vec<_> = self.filters.keys().collect();
        let mut sorts: Vec<_> = self.sorts.keys().collect();
        filters.sort();
        sorts.sort();
        f.debug_struct("Handlers")
            .field("filters", &filters)
            .field("sorts", &sorts)
            .finish()
    }
}

impl<D: SearchDefinition> Handlers<D> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect the handlers a definition registers.
    pub fn for_definition(definition: &D) -> Self {
        let mut handlers = Self::new();
        definition.register(&mut handlers);
        handlers
    }

    /// Register a filter handler for `field`. A later registration for the same key wins.
    pub fn filter(&mut self, field: &str, handler: FilterHandler<D>) -> &mut Self {
        self.filters.insert(handler_key(field), handler);
        self
    }

    /// Register a sort handler for `field`. A later registration for the same key wins.
    pub fn sort(&mut self, field: &str, handler: SortHandler<D>) -> &mut Self {
        self.sorts.insert(handler_key(field), handler);
        self
    }

    pub fn filter_for(&self, field: &str) -> Option<FilterHandler<D>> {
        self.filters.get(&handler_key(field)).copied()
    }

    pub fn sort_for(&self, field: &str) -> Option<SortHandler<D>> {
        self.sorts.get(&handler_key(field)).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty() && self.sorts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Comparison, QueryPlan};
    use crate::schema::SearchSchema;

    struct Fixture {
        schema: SearchSchema,
    }

    impl Fixture {
        fn created_at(&self, query: &mut QueryPlan, value: &SearchValue) -> Result<(), SearchError> {
            query.where_op("created_at", Comparison::Gte, value.clone());
            Ok(())
        }

        fn sort_created_at(&self, query: &mut QueryPlan, direction: SortDirection) -> Result<(), SearchError> {
            query.order_by("created_at", direction);
            Ok(())
        }
    }

    impl SearchDefinition for Fixture {
        type Query = QueryPlan;

        fn schema(&self) -> &SearchSchema {
            &self.schema
        }

        fn register(&self, handlers: &mut Handlers<Self>) {
            handlers
                .filter("createdAt", Self::created_at)
                .sort("created_at", Self::sort_created_at);
        }
    }

    #[test]
    fn handler_key_ignores_case_and_separators() {
        assert_eq!(handler_key("created_at"), "createdat");
        assert_eq!(handler_key("createdAt"), "createdat");
        assert_eq!(handler_key("Created-At"), "createdat");
    }

    #[test]
    fn registered_handlers_are_found_by_any_spelling() {
        let fixture = Fixture {
            schema: SearchSchema::builder().field("created_at").build().unwrap(),
        };
        let handlers = Handlers::for_definition(&fixture);

        assert!(handlers.filter_for("created_at").is_some());
        assert!(handlers.filter_for("CREATED_AT").is_some());
        assert!(handlers.sort_for("createdAt").is_some());
        assert!(handlers.filter_for("updated_at").is_none());
        assert_eq!(
            format!("{handlers:?}"),
            r#"Handlers { filters: ["createdat"], sorts: ["createdat"] }"#
        );
    }
}
