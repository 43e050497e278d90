//! Sort token resolution.
//!
//! The request names one field under the `sort` key; a leading `-` flips the
//! direction to descending. A token that does not resolve to a sortable field
//! falls back to the schema's default sort.

use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::{debug, trace};

use crate::attributes::RawAttributes;
use crate::definition::SearchDefinition;
use crate::errors::SearchError;
use crate::handlers::Handlers;
use crate::query::{SearchQuery, SortDirection};
use crate::schema::SearchSchema;

/// The ordering the engine settled on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SortDirective {
    /// Declared field name, or the bare default token when it names no field.
    pub field: String,
    /// Unprefixed column the generic ordering uses.
    pub column: String,
    pub direction: SortDirection,
    /// Set once a custom sort handler has taken over the ordering.
    pub custom: bool,
}

impl SortDirective {
    fn new(field: &str, column: &str, token: &str) -> Self {
        Self {
            field: field.to_string(),
            column: column.to_string(),
            direction: SortDirection::from_token(token),
            custom: false,
        }
    }
}

/// Work out which ordering a request asks for, without touching a query.
///
/// `None` means no usable request token and no default sort.
pub fn resolve_sort(raw: &RawAttributes, schema: &SearchSchema) -> Option<SortDirective> {
    let token = raw
        .get(schema.sort_param())
        .and_then(JsonValue::as_str)
        .map(str::trim)
        .unwrap_or_default();

    if let Some(directive) = resolve_requested(token, schema) {
        return Some(directive);
    }
    if !token.is_empty() {
        debug!(token, "sort token rejected, falling back to default sort");
    }

    schema.default_sort().map(|token| resolve_default(token, schema))
}

fn resolve_requested(token: &str, schema: &SearchSchema) -> Option<SortDirective> {
    let bare = strip_direction(token);
    if bare.is_empty() {
        return None;
    }
    let field = schema.resolve(bare)?;
    if !field.spec().sortable {
        trace!(field = field.name(), "field is not sortable");
        return None;
    }
    Some(SortDirective::new(field.name(), field.column(), token))
}

// The default sort is trusted configuration: it may name a plain column that
// is not part of the whitelist, and it ignores the sortable flag.
fn resolve_default(token: &str, schema: &SearchSchema) -> SortDirective {
    let bare = strip_direction(token);
    match schema.resolve(bare) {
        Some(field) => SortDirective::new(field.name(), field.column(), token),
        None => SortDirective::new(bare, bare, token),
    }
}

fn strip_direction(token: &str) -> &str {
    token.strip_prefix('-').unwrap_or(token).trim()
}

/// Resolve the ordering and apply it, through a sort handler when one is registered.
pub fn build_sort<D: SearchDefinition>(
    definition: &D,
    handlers: &Handlers<D>,
    raw: &RawAttributes,
    query: &mut D::Query,
) -> Result<Option<SortDirective>, SearchError> {
    let schema = definition.schema();
    let Some(mut directive) = resolve_sort(raw, schema) else {
        trace!("no sort requested and no default configured");
        return Ok(None);
    };

    match handlers.sort_for(&directive.field) {
        Some(handler) => {
            trace!(field = %directive.field, direction = %directive.direction, "delegating sort to custom handler");
            handler(definition, query, directive.direction)?;
            directive.custom = true;
        }
        None => {
            let column = schema.qualify(&directive.column);
            trace!(column = %column, direction = %directive.direction, "adding ordering");
            query.add_order_by(&column, directive.direction);
        }
    }

    Ok(Some(directive))
}
