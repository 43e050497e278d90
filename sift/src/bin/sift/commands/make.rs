use anyhow::{Context, Result, bail};
use clap::Args;
use comfy_table::{Cell, Table};
use serde::Serialize;
use std::path::{Path, PathBuf};

use sift::{CastKind, FieldSpec, SearchSchema};

use crate::context::ProjectContext;
use crate::examples::ExampleGroup;
use crate::generator::{DefinitionFile, generate_definition_file, update_search_mod};
use crate::output::{GlobalOptions, OutputManager, TableDisplay, themed_table};

pub const EXAMPLES: &[ExampleGroup] = &[
    ExampleGroup {
        title: "Generate",
        commands: &[
            "sift make user_search --field name --field status=state         # Alias status to the state column",
            "sift make OrderSearch --field total:float --field placed_at:datetime --default-sort -placed_at",
            "sift make tag_search --field ids:array<int>=tag_id --max-page-size 50",
        ],
    },
    ExampleGroup {
        title: "Preview",
        commands: &[
            "sift make user_search --field name --dry-run                    # Print the file instead of writing it",
            "sift make user_search --field name --dir src/api/search --force # Overwrite in a custom directory",
        ],
    },
];

#[derive(Args, Debug)]
pub struct MakeArgs {
    /// Definition name; studly-cased into the type name (user_search -> UserSearch)
    pub name: String,

    /// Whitelisted field as name[:cast][=column], repeatable
    #[arg(long = "field", short = 'f', value_name = "FIELD")]
    pub fields: Vec<String>,

    /// Sort applied when the request asks for none (prefix with '-' for descending)
    #[arg(long, allow_hyphen_values = true)]
    pub default_sort: Option<String>,

    /// Upper bound for the requested page size
    #[arg(long)]
    pub max_page_size: Option<u64>,

    /// Output directory (defaults to the configured search directory)
    #[arg(long)]
    pub dir: Option<PathBuf>,

    /// Overwrite an existing definition file
    #[arg(long)]
    pub force: bool,

    /// Print the generated file without writing anything
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Serialize)]
struct MakeReport {
    type_name: String,
    path: String,
    fields: Vec<FieldSpec>,
    module_registered: bool,
    dry_run: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
}

impl TableDisplay for MakeReport {
    fn to_table(&self, options: &GlobalOptions) -> Table {
        let mut table = themed_table(options, &["Field", "Column", "Cast", "Sortable"]);
        for field in &self.fields {
            table.add_row(vec![
                Cell::new(&field.name),
                Cell::new(field.column()),
                Cell::new(field.cast.as_ref().map(ToString::to_string).unwrap_or_else(|| "-".into())),
                Cell::new(if field.sortable { "yes" } else { "no" }),
            ]);
        }
        table
    }

    fn to_compact(&self) -> String {
        format!("{} {} ({} fields)", self.type_name, self.path, self.fields.len())
    }
}

pub fn handle_make(args: MakeArgs, output: &OutputManager) -> Result<()> {
    let ctx = ProjectContext::find()?;
    if !ctx.is_initialized() {
        output.warning("No .sift/config.toml found; using default settings (run `sift init` to customize)");
    }

    let schema = build_schema(&ctx, &args)?;
    let file = generate_definition_file(&args.name, &schema)?;
    let search_dir = ctx.search_dir(args.dir.as_deref());
    let path = search_dir.join(&file.filename);

    if args.dry_run {
        if !output.is_json() {
            output.source(&path.display().to_string(), &file.content);
        }
        return output.display(&report(&file, &schema, &path, false, true));
    }

    let module_registered = write_definition(&file, &search_dir, args.force)?;
    output.verbose(&format!("Wrote {} bytes", file.content.len()));

    output.success(&format!("Created {} at {}", file.type_name, path.display()));
    if module_registered {
        output.bullet(&format!("Registered `pub mod {};` in {}", file.module_name, search_dir.join("mod.rs").display()));
    }
    output.display(&report(&file, &schema, &path, module_registered, false))
}

fn report(
    file: &DefinitionFile,
    schema: &SearchSchema,
    path: &Path,
    module_registered: bool,
    dry_run: bool,
) -> MakeReport {
    MakeReport {
        type_name: file.type_name.clone(),
        path: path.display().to_string(),
        fields: schema.fields().to_vec(),
        module_registered,
        dry_run,
        content: dry_run.then(|| file.content.clone()),
    }
}

fn build_schema(ctx: &ProjectContext, args: &MakeArgs) -> Result<SearchSchema> {
    if args.fields.is_empty() {
        bail!("at least one --field is required");
    }

    let mut builder = ctx.config.defaults.builder();
    for raw in &args.fields {
        builder = builder.field(parse_field_arg(raw)?);
    }
    if let Some(token) = &args.default_sort {
        builder = builder.default_sort(token.clone());
    }
    if let Some(size) = args.max_page_size {
        builder = builder.max_page_size(size);
    }
    builder.build().context("Invalid search definition")
}

/// Parse `name[:cast][=column]`.
fn parse_field_arg(raw: &str) -> Result<FieldSpec> {
    let (head, column) = match raw.split_once('=') {
        Some((head, column)) => (head, Some(column.trim())),
        None => (raw, None),
    };
    let (name, cast) = match head.split_once(':') {
        Some((name, cast)) => (name.trim(), Some(cast.trim())),
        None => (head.trim(), None),
    };

    if name.is_empty() {
        bail!("field '{raw}' has no name");
    }

    let mut spec = FieldSpec::new(name);
    if let Some(cast) = cast {
        let kind: CastKind = cast.parse().with_context(|| format!("Invalid cast in field '{raw}'"))?;
        spec = spec.cast(kind);
    }
    match column {
        Some("") => bail!("field '{raw}' has an empty column"),
        Some(column) => spec = spec.alias(column),
        None => {}
    }
    Ok(spec)
}

/// Write the file and register it in mod.rs. Returns whether mod.rs changed.
fn write_definition(file: &DefinitionFile, search_dir: &Path, force: bool) -> Result<bool> {
    let path = search_dir.join(&file.filename);
    if path.exists() && !force {
        bail!("{} already exists; pass --force to overwrite it", path.display());
    }

    std::fs::create_dir_all(search_dir).with_context(|| format!("Failed to create {}", search_dir.display()))?;
    std::fs::write(&path, &file.content).with_context(|| format!("Failed to write {}", path.display()))?;
    update_search_mod(search_dir, &file.module_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_field_arguments() {
        assert_eq!(parse_field_arg("name").unwrap(), FieldSpec::new("name"));
        assert_eq!(parse_field_arg("status=state").unwrap(), FieldSpec::new("status").alias("state"));
        assert_eq!(
            parse_field_arg("ids:array<int>=tag_id").unwrap(),
            FieldSpec::new("ids").cast(CastKind::array_of(CastKind::Integer)).alias("tag_id")
        );
        assert!(parse_field_arg(":int").is_err());
        assert!(parse_field_arg("age:number").is_err());
        assert!(parse_field_arg("status=").is_err());
    }

    #[test]
    fn writes_definition_and_registers_module() {
        let dir = tempfile::tempdir().unwrap();
        let schema = SearchSchema::builder().field("name").build().unwrap();
        let file = generate_definition_file("user_search", &schema).unwrap();
        let search_dir = dir.path().join("src/search");

        assert!(write_definition(&file, &search_dir, false).unwrap());
        assert!(search_dir.join("user_search.rs").exists());

        let err = write_definition(&file, &search_dir, false).unwrap_err();
        assert!(err.to_string().contains("already exists"));

        assert!(!write_definition(&file, &search_dir, true).unwrap());
    }

    #[test]
    fn schema_uses_project_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".sift")).unwrap();
        std::fs::write(
            dir.path().join(".sift/config.toml"),
            "[defaults]\nmax_page_size = 30\ndefault_sort = \"-id\"\n",
        )
        .unwrap();
        let ctx = ProjectContext::from_root(dir.path().to_path_buf()).unwrap();

        let args = MakeArgs {
            name: "user_search".into(),
            fields: vec!["name".into(), "Name".into()],
            default_sort: None,
            max_page_size: None,
            dir: None,
            force: false,
            dry_run: true,
        };
        assert!(build_schema(&ctx, &args).is_err());

        let args = MakeArgs {
            fields: vec!["name".into()],
            ..args
        };
        let schema = build_schema(&ctx, &args).unwrap();
        assert_eq!(schema.max_page_size(), 30);
        assert_eq!(schema.default_sort(), Some("-id"));
    }
}
