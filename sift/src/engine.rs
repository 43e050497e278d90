//! Entry points: filter, assemble, sort and paginate in one call.

use serde::Serialize;
use tracing::debug;

use crate::assembler::build_predicates;
use crate::attributes::{AcceptedAttributes, RawAttributes, filter_attributes};
use crate::definition::SearchDefinition;
use crate::errors::SearchResult;
use crate::handlers::Handlers;
use crate::paging::apply_paging;
use crate::query::QuerySource;
use crate::sort::{SortDirective, build_sort};

/// What a search decided, for callers that want to inspect more than the query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchOutcome {
    pub accepted: AcceptedAttributes,
    pub sort: Option<SortDirective>,
    pub page_size: u64,
}

/// A definition bound to its registered handlers.
///
/// Building a `Search` collects the handlers once, so it is the cheaper option
/// when the same definition serves many requests.
pub struct Search<'d, D: SearchDefinition> {
    definition: &'d D,
    handlers: Handlers<D>,
}

impl<'d, D: SearchDefinition> Search<'d, D> {
    pub fn new(definition: &'d D) -> Self {
        Self {
            definition,
            handlers: Handlers::for_definition(definition),
        }
    }

    /// Whitelist and cast the request without touching a query.
    pub fn filter(&self, raw: &RawAttributes) -> SearchResult<AcceptedAttributes> {
        filter_attributes(raw, self.definition.schema())
    }

    /// Apply the request to `query` and hand the same query back.
    pub fn apply(&self, query: D::Query, raw: &RawAttributes) -> SearchResult<D::Query> {
        self.apply_with_outcome(query, raw).map(|(query, _)| query)
    }

    pub fn apply_with_outcome(
        &self,
        mut query: D::Query,
        raw: &RawAttributes,
    ) -> SearchResult<(D::Query, SearchOutcome)> {
        let outcome = self.apply_in_place(&mut query, raw)?;
        Ok((query, outcome))
    }

    /// Apply the request to a query the caller keeps ownership of.
    pub fn apply_in_place(&self, query: &mut D::Query, raw: &RawAttributes) -> SearchResult<SearchOutcome> {
        let schema = self.definition.schema();
        debug!(attributes = raw.len(), fields = schema.fields().len(), "applying search");

        let accepted = self.filter(raw)?;
        build_predicates(self.definition, &self.handlers, &accepted, query)?;
        let sort = build_sort(self.definition, &self.handlers, raw, query)?;
        let page_size = apply_paging(raw, schema, query);

        let ordering = sort.as_ref().map(|directive| format!("{} {}", directive.column, directive.direction));
        debug!(accepted = accepted.len(), ordering = ?ordering, page_size, "search applied");

        Ok(SearchOutcome {
            accepted,
            sort,
            page_size,
        })
    }
}

/// Apply `raw` to an existing query.
///
/// ```
/// use serde_json::json;
/// use sift::query::{QueryOp, QueryPlan, SortDirection};
/// use sift::{FieldSpec, RawAttributes, SchemaSearch, SearchSchema};
///
/// let search = SchemaSearch::<QueryPlan>::new(
///     SearchSchema::builder()
///         .field("name")
///         .field(FieldSpec::new("status").alias("state"))
///         .build()
///         .unwrap(),
/// );
/// let raw = RawAttributes::from_pairs([("status", "active"), ("sort", "-name"), ("page", "2")]);
///
/// let plan = sift::apply(&search, QueryPlan::default(), &raw).unwrap();
/// assert_eq!(
///     plan.ops(),
///     &[QueryOp::equals("state", json!("active")), QueryOp::order_by("name", SortDirection::Desc)]
/// );
/// ```
pub fn apply<D: SearchDefinition>(definition: &D, query: D::Query, raw: &RawAttributes) -> SearchResult<D::Query> {
    Search::new(definition).apply(query, raw)
}

/// Apply `raw` to a fresh query obtained from `source`.
pub fn apply_source<D, S>(definition: &D, source: &S, raw: &RawAttributes) -> SearchResult<D::Query>
where
    D: SearchDefinition,
    S: QuerySource<Query = D::Query> + ?Sized,
{
    apply(definition, source.query(), raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::SchemaSearch;
    use crate::query::{QueryOp, QueryPlan, SortDirection};
    use crate::schema::SearchSchema;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    struct Table;

    impl QuerySource for Table {
        type Query = QueryPlan;

        fn query(&self) -> QueryPlan {
            QueryPlan::new(30)
        }
    }

    fn search() -> SchemaSearch<QueryPlan> {
        SchemaSearch::new(SearchSchema::builder().field("name").default_sort("-id").build().unwrap())
    }

    #[test]
    fn apply_source_starts_from_a_fresh_query() {
        let plan = apply_source(&search(), &Table, &RawAttributes::from_pairs([("name", "ada")])).unwrap();

        assert_eq!(
            plan.ops(),
            &[QueryOp::equals("name", json!("ada")), QueryOp::order_by("id", SortDirection::Desc)]
        );
        assert_eq!(plan.page_size(), 30);
    }

    #[test]
    fn outcome_reports_each_stage() {
        let definition = search();
        let search = Search::new(&definition);
        let raw = RawAttributes::from_pairs([("NAME", "ada"), ("per_page", "5"), ("sort", "name")]);

        let (_, outcome) = search.apply_with_outcome(QueryPlan::default(), &raw).unwrap();

        assert_eq!(outcome.accepted.keys().collect::<Vec<_>>(), vec!["name"]);
        assert_eq!(outcome.sort.map(|sort| sort.direction), Some(SortDirection::Asc));
        assert_eq!(outcome.page_size, 5);
    }

    #[test]
    fn apply_in_place_keeps_existing_operations() {
        let definition = search();
        let mut plan = QueryPlan::default();
        plan.join("teams", "teams.id = users.team_id");

        Search::new(&definition)
            .apply_in_place(&mut plan, &RawAttributes::new())
            .unwrap();

        assert_eq!(plan.ops().len(), 2);
        assert!(matches!(plan.ops()[0], QueryOp::Join { .. }));
    }
}
