//! Whitelist declarations and field resolution.
//!
//! A [`SearchSchema`] is the immutable configuration of one search definition: the
//! ordered list of accepted fields plus sort, paging and casting options. It is
//! built once (usually into a `static`) and shared read-only by every request.
//!
//! ```
//! use sift::{CastKind, FieldSpec, SearchSchema};
//!
//! let schema = SearchSchema::builder()
//!     .field("name")
//!     .field(FieldSpec::new("status").alias("state"))
//!     .field(FieldSpec::new("age").cast(CastKind::Integer).unsortable())
//!     .default_sort("-id")
//!     .max_page_size(50)
//!     .build()
//!     .unwrap();
//!
//! let resolved = schema.resolve("STATUS").unwrap();
//! assert_eq!(resolved.name(), "status");
//! assert_eq!(resolved.column(), "state");
//! ```

use serde::{Deserialize, Serialize};

use crate::cast::CastKind;
use crate::errors::SearchError;
use crate::handlers::handler_key;

pub const DEFAULT_MAX_PAGE_SIZE: u64 = 100;
pub const DEFAULT_MIN_PAGE_SIZE: u64 = 1;
pub const DEFAULT_PAGE_SIZE_PARAM: &str = "per_page";
pub const SORT_PARAM: &str = "sort";

/// One whitelist entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// External key accepted from the request.
    pub name: String,
    /// Column name when it differs from `name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cast: Option<CastKind>,
    #[serde(default = "default_true")]
    pub sortable: bool,
}

fn default_true() -> bool {
    true
}

impl FieldSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
            cast: None,
            sortable: true,
        }
    }

    #[inline]
    pub fn alias(mut self, column: impl Into<String>) -> Self {
        self.alias = Some(column.into());
        self
    }

    #[inline]
    pub fn cast(mut self, kind: CastKind) -> Self {
        self.cast = Some(kind);
        self
    }

    /// Exclude this field from sorting while keeping it filterable.
    #[inline]
    pub fn unsortable(mut self) -> Self {
        self.sortable = false;
        self
    }

    /// Column this field reads from: the alias when declared, otherwise the name.
    #[inline]
    pub fn column(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

impl From<&str> for FieldSpec {
    fn from(name: &str) -> Self {
        FieldSpec::new(name)
    }
}

impl From<String> for FieldSpec {
    fn from(name: String) -> Self {
        FieldSpec::new(name)
    }
}

/// Result of resolving a raw key against the whitelist.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedField<'a> {
    spec: &'a FieldSpec,
}

impl<'a> ResolvedField<'a> {
    /// Declared field name, in its declared casing.
    pub fn name(&self) -> &'a str {
        &self.spec.name
    }

    /// Canonical column, without any table prefix.
    pub fn column(&self) -> &'a str {
        self.spec.column()
    }

    pub fn spec(&self) -> &'a FieldSpec {
        self.spec
    }
}

/// Immutable configuration of a search definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SchemaConfig", into = "SchemaConfig")]
pub struct SearchSchema {
    fields: Vec<FieldSpec>,
    default_sort: Option<String>,
    max_page_size: u64,
    min_page_size: u64,
    page_size_param: String,
    table: Option<String>,
    strict_casts: bool,
    keep_empty: bool,
}

impl SearchSchema {
    pub fn builder() -> SearchSchemaBuilder {
        SearchSchemaBuilder::default()
    }

    /// Parse a schema from TOML.
    ///
    /// ```
    /// let schema = sift::SearchSchema::from_toml_str(r#"
    ///     default_sort = "-id"
    ///     max_page_size = 25
    ///     fields = ["name", { name = "status", alias = "state", sortable = false }]
    /// "#).unwrap();
    /// assert_eq!(schema.fields().len(), 2);
    /// ```
    pub fn from_toml_str(source: &str) -> Result<Self, SearchError> {
        toml::from_str(source).map_err(|err| SearchError::config(format!("failed to parse schema: {err}")))
    }

    /// Parse a schema from JSON.
    pub fn from_json_str(source: &str) -> Result<Self, SearchError> {
        serde_json::from_str(source).map_err(|err| SearchError::config(format!("failed to parse schema: {err}")))
    }

    /// Case-insensitive lookup of `key` against declared field names.
    ///
    /// Aliases are never matched: an alias only names the column a field reads from.
    pub fn resolve(&self, key: &str) -> Option<ResolvedField<'_>> {
        self.fields
            .iter()
            .find(|spec| spec.name.eq_ignore_ascii_case(key))
            .map(|spec| ResolvedField { spec })
    }

    /// Apply the table prefix, when one is configured.
    pub fn qualify(&self, column: &str) -> String {
        match &self.table {
            Some(table) => format!("{table}.{column}"),
            None => column.to_string(),
        }
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn default_sort(&self) -> Option<&str> {
        self.default_sort.as_deref()
    }

    pub fn max_page_size(&self) -> u64 {
        self.max_page_size
    }

    pub fn min_page_size(&self) -> u64 {
        self.min_page_size
    }

    pub fn page_size_param(&self) -> &str {
        &self.page_size_param
    }

    pub fn sort_param(&self) -> &str {
        SORT_PARAM
    }

    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    pub fn strict_casts(&self) -> bool {
        self.strict_casts
    }

    pub fn keep_empty(&self) -> bool {
        self.keep_empty
    }
}

/// Builder for [`SearchSchema`]. Validation happens in [`SearchSchemaBuilder::build`].
#[derive(Debug, Clone)]
pub struct SearchSchemaBuilder {
    fields: Vec<FieldSpec>,
    default_sort: Option<String>,
    max_page_size: u64,
    min_page_size: u64,
    page_size_param: String,
    table: Option<String>,
    strict_casts: bool,
    keep_empty: bool,
}

impl Default for SearchSchemaBuilder {
    fn default() -> Self {
        Self {
            fields: Vec::new(),
            default_sort: None,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            min_page_size: DEFAULT_MIN_PAGE_SIZE,
            page_size_param: DEFAULT_PAGE_SIZE_PARAM.to_string(),
            table: None,
            strict_casts: false,
            keep_empty: false,
        }
    }
}

impl SearchSchemaBuilder {
    #[inline]
    pub fn field(mut self, field: impl Into<FieldSpec>) -> Self {
        self.fields.push(field.into());
        self
    }

    #[inline]
    pub fn fields<I>(mut self, fields: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<FieldSpec>,
    {
        self.fields.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Signed sort token used when the request has none, e.g. `-id`.
    #[inline]
    pub fn default_sort(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.default_sort = (!token.trim().is_empty()).then(|| token.trim().to_string());
        self
    }

    #[inline]
    pub fn max_page_size(mut self, size: u64) -> Self {
        self.max_page_size = size;
        self
    }

    #[inline]
    pub fn min_page_size(mut self, size: u64) -> Self {
        self.min_page_size = size;
        self
    }

    #[inline]
    pub fn page_size_param(mut self, param: impl Into<String>) -> Self {
        self.page_size_param = param.into();
        self
    }

    /// Prefix generic predicates and orderings with `table.`.
    #[inline]
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Fail the whole request when any value cannot be cast.
    #[inline]
    pub fn strict_casts(mut self, strict: bool) -> Self {
        self.strict_casts = strict;
        self
    }

    /// Accept empty strings and empty arrays instead of dropping them.
    #[inline]
    pub fn keep_empty(mut self, keep: bool) -> Self {
        self.keep_empty = keep;
        self
    }

    pub fn build(self) -> Result<SearchSchema, SearchError> {
        for (index, field) in self.fields.iter().enumerate() {
            if field.name.trim().is_empty() {
                return Err(SearchError::config("field names must not be empty"));
            }
            if field.alias.as_deref().is_some_and(|alias| alias.trim().is_empty()) {
                return Err(SearchError::config(format!("field '{}' has an empty alias", field.name)));
            }
            if self.fields[..index]
                .iter()
                .any(|earlier| earlier.name.eq_ignore_ascii_case(&field.name))
            {
                return Err(SearchError::config(format!("field '{}' is declared twice", field.name)));
            }
            if let Some(earlier) = self.fields[..index]
                .iter()
                .find(|earlier| handler_key(&earlier.name) == handler_key(&field.name))
            {
                return Err(SearchError::config(format!(
                    "fields '{}' and '{}' share the handler key '{}'",
                    earlier.name,
                    field.name,
                    handler_key(&field.name)
                )));
            }
        }

        if self.max_page_size == 0 {
            return Err(SearchError::config("max_page_size must be positive"));
        }
        if self.min_page_size > self.max_page_size {
            return Err(SearchError::config(format!(
                "min_page_size ({}) exceeds max_page_size ({})",
                self.min_page_size, self.max_page_size
            )));
        }
        if self.page_size_param.trim().is_empty() {
            return Err(SearchError::config("page_size_param must not be empty"));
        }
        if self.default_sort.as_deref().is_some_and(|token| token.trim_start_matches('-').is_empty()) {
            return Err(SearchError::config("default_sort must name a field"));
        }

        Ok(SearchSchema {
            fields: self.fields,
            default_sort: self.default_sort,
            max_page_size: self.max_page_size,
            min_page_size: self.min_page_size,
            page_size_param: self.page_size_param,
            table: self.table.filter(|table| !table.trim().is_empty()),
            strict_casts: self.strict_casts,
            keep_empty: self.keep_empty,
        })
    }
}

/// Serialized form of a schema, as written in TOML or JSON files.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct SchemaConfig {
    #[serde(default)]
    fields: Vec<FieldEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default_sort: Option<String>,
    #[serde(default = "default_max_page_size")]
    max_page_size: u64,
    #[serde(default = "default_min_page_size")]
    min_page_size: u64,
    #[serde(default = "default_page_size_param")]
    page_size_param: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    table: Option<String>,
    #[serde(default)]
    strict_casts: bool,
    #[serde(default)]
    keep_empty: bool,
}

/// A field is either a bare name or a full table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum FieldEntry {
    Name(String),
    Spec(FieldSpec),
}

fn default_max_page_size() -> u64 {
    DEFAULT_MAX_PAGE_SIZE
}

fn default_min_page_size() -> u64 {
    DEFAULT_MIN_PAGE_SIZE
}

fn default_page_size_param() -> String {
    DEFAULT_PAGE_SIZE_PARAM.to_string()
}

impl TryFrom<SchemaConfig> for SearchSchema {
    type Error = SearchError;

    fn try_from(config: SchemaConfig) -> Result<Self, Self::Error> {
        let mut builder = SearchSchema::builder()
            .max_page_size(config.max_page_size)
            .min_page_size(config.min_page_size)
            .page_size_param(config.page_size_param)
            .strict_casts(config.strict_casts)
            .keep_empty(config.keep_empty);
        if let Some(token) = config.default_sort {
            builder = builder.default_sort(token);
        }
        if let Some(table) = config.table {
            builder = builder.table(table);
        }
        for entry in config.fields {
            builder = match entry {
                FieldEntry::Name(name) => builder.field(name),
                FieldEntry::Spec(spec) => builder.field(spec),
            };
        }
        builder.build()
    }
}

impl From<SearchSchema> for SchemaConfig {
    fn from(schema: SearchSchema) -> Self {
        Self {
            fields: schema.fields.into_iter().map(FieldEntry::Spec).collect(),
            default_sort: schema.default_sort,
            max_page_size: schema.max_page_size,
            min_page_size: schema.min_page_size,
            page_size_param: schema.page_size_param,
            table: schema.table,
            strict_casts: schema.strict_casts,
            keep_empty: schema.keep_empty,
        }
    }
}
