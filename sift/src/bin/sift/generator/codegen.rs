//! Source generation for search definitions.

use anyhow::{Result, bail};
use convert_case::{Case, Casing};
use std::fmt::Write;

use sift::schema::{DEFAULT_MAX_PAGE_SIZE, DEFAULT_MIN_PAGE_SIZE, DEFAULT_PAGE_SIZE_PARAM};
use sift::{CastKind, FieldSpec, SearchSchema};

/// Generated search definition file
pub struct DefinitionFile {
    /// Studly-cased type name, e.g. `UserSearch`
    pub type_name: String,
    /// Module name (valid Rust identifier)
    pub module_name: String,
    /// Filename (without path)
    pub filename: String,
    pub content: String,
}

/// Type and module names for a requested definition name.
///
/// `user_search`, `user-search` and `UserSearch` all give `UserSearch` / `user_search`.
pub fn definition_names(name: &str) -> Result<(String, String)> {
    let type_name = name.trim().to_case(Case::Pascal);
    let valid = type_name.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
        && type_name.chars().all(|c| c.is_ascii_alphanumeric());
    if !valid {
        bail!("'{name}' is not a valid type name; use letters, digits, '_' or '-' and start with a letter");
    }
    let module_name = type_name.to_case(Case::Snake);
    Ok((type_name, module_name))
}

pub fn generate_definition_file(name: &str, schema: &SearchSchema) -> Result<DefinitionFile> {
    let (type_name, module_name) = definition_names(name)?;
    let content = generate_content(&type_name, schema);
    Ok(DefinitionFile {
        filename: format!("{module_name}.rs"),
        type_name,
        module_name,
        content,
    })
}

fn generate_content(type_name: &str, schema: &SearchSchema) -> String {
    let mut content = String::new();

    let _ = writeln!(content, "//! {type_name} search definition.");
    let _ = writeln!(content, "//!");
    let _ = writeln!(content, "//! Generated by `sift make`. Register custom filter and sort handlers in");
    let _ = writeln!(content, "//! `register`; every other field falls back to an equality predicate.");
    let _ = writeln!(content);
    let _ = writeln!(content, "use std::sync::LazyLock;");
    let _ = writeln!(content);
    let _ = writeln!(content, "use sift::query::QueryPlan;");
    let _ = writeln!(content, "use sift::{{{}}};", imports(schema));
    let _ = writeln!(content);

    let _ = writeln!(content, "static SCHEMA: LazyLock<SearchSchema> = LazyLock::new(|| {{");
    let _ = writeln!(content, "    SearchSchema::builder()");
    for field in schema.fields() {
        let _ = writeln!(content, "        .field({})", field_expr(field));
    }
    if let Some(token) = schema.default_sort() {
        let _ = writeln!(content, "        .default_sort({token:?})");
    }
    if schema.max_page_size() != DEFAULT_MAX_PAGE_SIZE {
        let _ = writeln!(content, "        .max_page_size({})", schema.max_page_size());
    }
    if schema.min_page_size() != DEFAULT_MIN_PAGE_SIZE {
        let _ = writeln!(content, "        .min_page_size({})", schema.min_page_size());
    }
    if schema.page_size_param() != DEFAULT_PAGE_SIZE_PARAM {
        let _ = writeln!(content, "        .page_size_param({:?})", schema.page_size_param());
    }
    let _ = writeln!(content, "        .build()");
    let _ = writeln!(content, "        .expect(\"{type_name} schema is valid\")");
    let _ = writeln!(content, "}});");
    let _ = writeln!(content);

    let _ = writeln!(content, "#[derive(Debug, Default, Clone, Copy)]");
    let _ = writeln!(content, "pub struct {type_name};");
    let _ = writeln!(content);
    let _ = writeln!(content, "impl SearchDefinition for {type_name} {{");
    let _ = writeln!(content, "    type Query = QueryPlan;");
    let _ = writeln!(content);
    let _ = writeln!(content, "    fn schema(&self) -> &SearchSchema {{");
    let _ = writeln!(content, "        &SCHEMA");
    let _ = writeln!(content, "    }}");
    let _ = writeln!(content);
    let _ = writeln!(content, "    fn register(&self, _handlers: &mut Handlers<Self>) {{");
    if let Some(first) = schema.fields().first() {
        let _ = writeln!(content, "        // _handlers.filter({:?}, Self::{});", first.name, handler_name(&first.name));
    }
    let _ = writeln!(content, "    }}");
    let _ = writeln!(content, "}}");

    content
}

fn imports(schema: &SearchSchema) -> String {
    let mut names = Vec::new();
    if schema.fields().iter().any(|field| field.cast.is_some()) {
        names.push("CastKind");
    }
    names.extend(["FieldSpec", "Handlers", "SearchDefinition", "SearchSchema"]);
    names.join(", ")
}

fn field_expr(field: &FieldSpec) -> String {
    let mut expr = format!("FieldSpec::new({:?})", field.name);
    if let Some(alias) = &field.alias {
        let _ = write!(expr, ".alias({alias:?})");
    }
    if let Some(kind) = &field.cast {
        let _ = write!(expr, ".cast({})", cast_expr(kind));
    }
    if !field.sortable {
        expr.push_str(".unsortable()");
    }
    expr
}

fn cast_expr(kind: &CastKind) -> String {
    match kind {
        CastKind::Integer => "CastKind::Integer".to_string(),
        CastKind::Float => "CastKind::Float".to_string(),
        CastKind::Boolean => "CastKind::Boolean".to_string(),
        CastKind::String => "CastKind::String".to_string(),
        CastKind::Date => "CastKind::Date".to_string(),
        CastKind::Timestamp => "CastKind::Timestamp".to_string(),
        CastKind::Array(inner) => format!("CastKind::array_of({})", cast_expr(inner)),
    }
}

fn handler_name(field: &str) -> String {
    let snake = field.to_case(Case::Snake);
    if snake.chars().next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_') {
        snake
    } else {
        format!("field_{snake}")
    }
}
