//! Turns accepted attributes into predicates on the query.

use tracing::trace;

use crate::attributes::AcceptedAttributes;
use crate::definition::SearchDefinition;
use crate::errors::SearchError;
use crate::handlers::Handlers;
use crate::query::SearchQuery;

/// Add one predicate per accepted attribute, in acceptance order.
///
/// A registered filter handler takes over its field entirely; everything else
/// becomes an equality predicate on the field's (prefixed) column. The first
/// handler error aborts assembly and is returned unchanged.
pub fn build_predicates<D: SearchDefinition>(
    definition: &D,
    handlers: &Handlers<D>,
    accepted: &AcceptedAttributes,
    query: &mut D::Query,
) -> Result<(), SearchError> {
    let schema = definition.schema();

    for (name, value) in accepted.iter() {
        if let Some(handler) = handlers.filter_for(name) {
            trace!(field = name, "delegating predicate to custom handler");
            handler(definition, query, value)?;
            continue;
        }

        let Some(field) = schema.resolve(name) else {
            continue;
        };
        let column = schema.qualify(field.column());
        trace!(field = name, column = %column, %value, "adding equality predicate");
        query.add_equality_predicate(&column, value);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::{RawAttributes, filter_attributes};
    use crate::query::{Comparison, QueryOp, QueryPlan};
    use crate::schema::{FieldSpec, SearchSchema};
    use crate::value::SearchValue;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    struct Users {
        schema: SearchSchema,
    }

    impl Users {
        fn name(&self, query: &mut QueryPlan, value: &SearchValue) -> Result<(), SearchError> {
            let prefix = value.as_str().unwrap_or_default();
            query.where_op("name", Comparison::Like, format!("{prefix}%"));
            Ok(())
        }

        fn role(&self, _query: &mut QueryPlan, _value: &SearchValue) -> Result<(), SearchError> {
            Err(SearchError::handler("role", "role lookups are disabled"))
        }
    }

    impl SearchDefinition for Users {
        type Query = QueryPlan;

        fn schema(&self) -> &SearchSchema {
            &self.schema
        }

        fn register(&self, handlers: &mut Handlers<Self>) {
            handlers.filter("name", Self::name).filter("role", Self::role);
        }
    }

    fn users() -> Users {
        Users {
            schema: SearchSchema::builder()
                .table("users")
                .field("name")
                .field("role")
                .field(FieldSpec::new("status").alias("state"))
                .build()
                .unwrap(),
        }
    }

    fn assemble(definition: &Users, raw: serde_json::Value) -> Result<QueryPlan, SearchError> {
        let raw = RawAttributes::from(raw.as_object().cloned().unwrap());
        let accepted = filter_attributes(&raw, definition.schema())?;
        let handlers = Handlers::for_definition(definition);
        let mut plan = QueryPlan::default();
        build_predicates(definition, &handlers, &accepted, &mut plan)?;
        Ok(plan)
    }

    #[test]
    fn handler_replaces_generic_predicate_and_skips_prefix() {
        let users = users();
        let plan = assemble(&users, json!({ "status": "active", "name": "Jo" })).unwrap();

        assert_eq!(
            plan.ops(),
            &[
                QueryOp::equals("users.state", json!("active")),
                QueryOp::Where {
                    column: "name".into(),
                    comparison: Comparison::Like,
                    value: "Jo%".into(),
                },
            ]
        );
    }

    #[test]
    fn handler_errors_propagate() {
        let users = users();
        let err = assemble(&users, json!({ "role": "admin" })).unwrap_err();
        assert!(matches!(err, SearchError::Handler { ref field, .. } if field == "role"));
    }
}
