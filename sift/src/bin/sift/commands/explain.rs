use anyhow::{Context, Result};
use clap::Args;
use comfy_table::{Cell, Table};
use serde::Serialize;
use std::path::PathBuf;

use sift::config::load_schema_file;
use sift::query::{DEFAULT_PAGE_SIZE, QueryOp, QueryPlan};
use sift::{RawAttributes, SchemaSearch, Search, SearchOutcome, SearchSchema};

use crate::examples::ExampleGroup;
use crate::output::{GlobalOptions, OutputManager, TableDisplay, themed_table};

pub const EXAMPLES: &[ExampleGroup] = &[ExampleGroup {
    title: "Explain",
    commands: &[
        "sift explain --schema users.toml 'name=ada&sort=-created_at&per_page=500'",
        "sift explain --schema users.json --json '{\"status\": \"active\", \"tags\": [\"a\", \"b\"]}'",
        "sift explain --schema users.toml 'status=active' --output json",
    ],
}];

#[derive(Args, Debug)]
pub struct ExplainArgs {
    /// Schema file (.toml or .json)
    #[arg(long, short = 's')]
    pub schema: PathBuf,

    /// Request attributes as a query string, or a JSON object with --json
    pub request: String,

    /// Treat the request as a JSON object instead of a query string
    #[arg(long)]
    pub json: bool,

    /// Page size the query reports when the request asks for none
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    pub default_page_size: u64,
}

#[derive(Debug, Serialize)]
struct ExplainReport {
    #[serde(flatten)]
    outcome: SearchOutcome,
    operations: Vec<QueryOp>,
}

impl TableDisplay for ExplainReport {
    fn to_table(&self, options: &GlobalOptions) -> Table {
        let mut table = themed_table(options, &["#", "Operation"]);
        for (index, op) in self.operations.iter().enumerate() {
            table.add_row(vec![Cell::new(index + 1), Cell::new(op)]);
        }
        table.add_row(vec![Cell::new("-"), Cell::new(format!("LIMIT {}", self.outcome.page_size))]);
        table
    }

    fn to_compact(&self) -> String {
        let mut parts: Vec<String> = self.operations.iter().map(ToString::to_string).collect();
        parts.push(format!("LIMIT {}", self.outcome.page_size));
        parts.join("; ")
    }
}

pub fn handle_explain(args: ExplainArgs, output: &OutputManager) -> Result<()> {
    let schema = load_schema_file(&args.schema)?;
    output.verbose(&format!(
        "Loaded {} fields from {}",
        schema.fields().len(),
        args.schema.display()
    ));

    let raw = parse_request(&args.request, args.json)?;
    let report = explain(schema, &raw, args.default_page_size)?;

    if !output.is_json() {
        output.heading("Query plan");
    }
    output.display(&report)
}

fn parse_request(request: &str, json: bool) -> Result<RawAttributes> {
    if json {
        serde_json::from_str(request).context("Request is not a JSON object")
    } else {
        Ok(RawAttributes::from_query_string(request))
    }
}

fn explain(schema: SearchSchema, raw: &RawAttributes, default_page_size: u64) -> Result<ExplainReport> {
    let definition = SchemaSearch::<QueryPlan>::new(schema);
    let (plan, outcome) = Search::new(&definition).apply_with_outcome(QueryPlan::new(default_page_size), raw)?;
    Ok(ExplainReport {
        outcome,
        operations: plan.ops().to_vec(),
    })
}
