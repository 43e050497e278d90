//! The query object the engine writes into.
//!
//! The engine never executes anything. It only issues predicate, ordering and
//! paging calls through [`SearchQuery`], so any query builder can be adapted by
//! implementing that trait. [`QueryPlan`] is a recording implementation that
//! keeps every call in order, which is what tests and the CLI use.

use std::fmt;

use serde::{Deserialize, Serialize};

#[cfg(feature = "utoipa")]
use utoipa::ToSchema;

use crate::value::SearchValue;

/// Page size a fresh [`QueryPlan`] reports before anything sets one.
pub const DEFAULT_PAGE_SIZE: u64 = 15;

#[cfg_attr(feature = "utoipa", derive(ToSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }

    /// `Desc` when the token carries a leading `-`.
    #[inline]
    pub fn from_token(token: &str) -> Self {
        if token.starts_with('-') {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operations the engine needs from a query object.
pub trait SearchQuery {
    fn add_equality_predicate(&mut self, column: &str, value: &SearchValue);

    fn add_order_by(&mut self, column: &str, direction: SortDirection);

    fn set_page_size(&mut self, size: u64);

    /// Page size in effect when the request does not ask for one.
    fn default_page_size(&self) -> u64;
}

/// Something that can hand out a fresh query, such as a model or table handle.
pub trait QuerySource {
    type Query: SearchQuery;

    fn query(&self) -> Self::Query;
}

impl<Q: SearchQuery + ?Sized> SearchQuery for &mut Q {
    fn add_equality_predicate(&mut self, column: &str, value: &SearchValue) {
        (**self).add_equality_predicate(column, value);
    }

    fn add_order_by(&mut self, column: &str, direction: SortDirection) {
        (**self).add_order_by(column, direction);
    }

    fn set_page_size(&mut self, size: u64) {
        (**self).set_page_size(size);
    }

    fn default_page_size(&self) -> u64 {
        (**self).default_page_size()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    Like,
}

impl Comparison {
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Comparison::Eq => "=",
            Comparison::Ne => "!=",
            Comparison::Lt => "<",
            Comparison::Lte => "<=",
            Comparison::Gt => ">",
            Comparison::Gte => ">=",
            Comparison::Like => "LIKE",
        }
    }
}

/// One recorded call on a [`QueryPlan`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum QueryOp {
    Where {
        column: String,
        comparison: Comparison,
        value: SearchValue,
    },
    WhereIn {
        column: String,
        values: Vec<SearchValue>,
    },
    Join {
        table: String,
        on: String,
    },
    OrderBy {
        column: String,
        direction: SortDirection,
    },
}

impl QueryOp {
    /// Plain equality predicate, as the generic path emits it.
    pub fn equals(column: impl Into<String>, value: impl Into<SearchValue>) -> Self {
        QueryOp::Where {
            column: column.into(),
            comparison: Comparison::Eq,
            value: value.into(),
        }
    }

    pub fn order_by(column: impl Into<String>, direction: SortDirection) -> Self {
        QueryOp::OrderBy {
            column: column.into(),
            direction,
        }
    }
}

impl fmt::Display for QueryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryOp::Where {
                column,
                comparison,
                value,
            } => write!(f, "WHERE {column} {} {value}", comparison.as_str()),
            QueryOp::WhereIn { column, values } => {
                write!(f, "WHERE {column} IN {}", SearchValue::Array(values.clone()))
            }
            QueryOp::Join { table, on } => write!(f, "JOIN {table} ON {on}"),
            QueryOp::OrderBy { column, direction } => {
                write!(f, "ORDER BY {column} {}", direction.as_str().to_ascii_uppercase())
            }
        }
    }
}

/// Recording query: keeps every operation in the order it was issued.
///
/// # Examples
///
/// ```
/// use sift::query::{QueryOp, QueryPlan, SearchQuery, SortDirection};
///
/// let mut plan = QueryPlan::new(20);
/// plan.add_equality_predicate("status", &"active".into());
/// plan.add_order_by("id", SortDirection::Desc);
/// plan.set_page_size(50);
///
/// assert_eq!(plan.ops()[0], QueryOp::equals("status", "active"));
/// assert_eq!(plan.page_size(), 50);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryPlan {
    ops: Vec<QueryOp>,
    page_size: Option<u64>,
    default_page_size: u64,
}

impl Default for QueryPlan {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl QueryPlan {
    pub fn new(default_page_size: u64) -> Self {
        Self {
            ops: Vec::new(),
            page_size: None,
            default_page_size,
        }
    }

    #[inline]
    pub fn where_op(&mut self, column: impl Into<String>, comparison: Comparison, value: impl Into<SearchValue>) -> &mut Self {
        self.ops.push(QueryOp::Where {
            column: column.into(),
            comparison,
            value: value.into(),
        });
        self
    }

    #[inline]
    pub fn where_in(&mut self, column: impl Into<String>, values: impl IntoIterator<Item = SearchValue>) -> &mut Self {
        self.ops.push(QueryOp::WhereIn {
            column: column.into(),
            values: values.into_iter().collect(),
        });
        self
    }

    #[inline]
    pub fn join(&mut self, table: impl Into<String>, on: impl Into<String>) -> &mut Self {
        self.ops.push(QueryOp::Join {
            table: table.into(),
            on: on.into(),
        });
        self
    }

    #[inline]
    pub fn order_by(&mut self, column: impl Into<String>, direction: SortDirection) -> &mut Self {
        self.ops.push(QueryOp::order_by(column, direction));
        self
    }

    pub fn ops(&self) -> &[QueryOp] {
        &self.ops
    }

    /// Predicates only, in issue order.
    pub fn predicates(&self) -> impl Iterator<Item = &QueryOp> {
        self.ops
            .iter()
            .filter(|op| matches!(op, QueryOp::Where { .. } | QueryOp::WhereIn { .. }))
    }

    /// Orderings only, in issue order.
    pub fn orderings(&self) -> impl Iterator<Item = &QueryOp> {
        self.ops.iter().filter(|op| matches!(op, QueryOp::OrderBy { .. }))
    }

    /// Effective page size: the one set explicitly, otherwise the default.
    pub fn page_size(&self) -> u64 {
        self.page_size.unwrap_or(self.default_page_size)
    }
}

impl SearchQuery for QueryPlan {
    fn add_equality_predicate(&mut self, column: &str, value: &SearchValue) {
        self.where_op(column, Comparison::Eq, value.clone());
    }

    fn add_order_by(&mut self, column: &str, direction: SortDirection) {
        self.order_by(column, direction);
    }

    fn set_page_size(&mut self, size: u64) {
        self.page_size = Some(size);
    }

    fn default_page_size(&self) -> u64 {
        self.default_page_size
    }
}

impl fmt::Display for QueryPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for op in &self.ops {
            writeln!(f, "{op}")?;
        }
        write!(f, "LIMIT {}", self.page_size())
    }
}
