//! Project configuration (`.sift/config.toml`) and schema files.
//!
//! ```toml
//! [search]
//! dir = "src/search"
//!
//! [defaults]
//! max_page_size = 100
//! min_page_size = 1
//! page_size_param = "per_page"
//! default_sort = "-id"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::SearchError;
use crate::schema::{
    DEFAULT_MAX_PAGE_SIZE, DEFAULT_MIN_PAGE_SIZE, DEFAULT_PAGE_SIZE_PARAM, SearchSchema, SearchSchemaBuilder,
};

pub const CONFIG_DIR: &str = ".sift";
pub const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SiftConfig {
    #[serde(default)]
    pub search: SearchSettings,
    #[serde(default)]
    pub defaults: SchemaDefaults,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SearchSettings {
    /// Directory generated search definitions are written to, relative to the project root.
    #[serde(default = "default_search_dir")]
    pub dir: String,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            dir: default_search_dir(),
        }
    }
}

fn default_search_dir() -> String {
    "src/search".to_string()
}

/// Values new schemas start from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaDefaults {
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u64,
    #[serde(default = "default_min_page_size")]
    pub min_page_size: u64,
    #[serde(default = "default_page_size_param")]
    pub page_size_param: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_sort: Option<String>,
}

impl Default for SchemaDefaults {
    fn default() -> Self {
        Self {
            max_page_size: default_max_page_size(),
            min_page_size: default_min_page_size(),
            page_size_param: default_page_size_param(),
            default_sort: None,
        }
    }
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

impl SchemaDefaults {
    /// A schema builder seeded with these defaults.
    pub fn builder(&self) -> SearchSchemaBuilder {
        let builder = SearchSchema::builder()
            .max_page_size(self.max_page_size)
            .min_page_size(self.min_page_size)
            .page_size_param(self.page_size_param.clone());
        match &self.default_sort {
            Some(token) => builder.default_sort(token.clone()),
            None => builder,
        }
    }
}

impl SiftConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, SearchError> {
        toml::from_str(source).map_err(|err| SearchError::config(format!("failed to parse {CONFIG_FILE}: {err}")))
    }

    pub fn load(path: &Path) -> Result<Self, SearchError> {
        let content = read(path)?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> Result<String, SearchError> {
        toml::to_string_pretty(self).map_err(|err| SearchError::config(format!("failed to render {CONFIG_FILE}: {err}")))
    }
}

/// Load a schema file, choosing the format from the extension (`.toml` or `.json`).
pub fn load_schema_file(path: &Path) -> Result<SearchSchema, SearchError> {
    let content = read(path)?;
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => SearchSchema::from_toml_str(&content),
        Some("json") => SearchSchema::from_json_str(&content),
        _ => Err(SearchError::config(format!(
            "unsupported schema file {}: expected a .toml or .json extension",
            path.display()
        ))),
    }
}

fn read(path: &Path) -> Result<String, SearchError> {
    std::fs::read_to_string(path).map_err(|err| SearchError::config(format!("failed to read {}: {err}", path.display())))
}
