mod commands;
mod context;
mod examples;
mod generator;
mod output;
mod theme;

use anyhow::Result;
use clap::{ColorChoice, Command, CommandFactory, FromArgMatches, Parser, Subcommand, error::ErrorKind};
use colored::control::ShouldColorize;
use std::fmt::Write;

use commands::{
    explain::{ExplainArgs, handle_explain},
    init::{InitArgs, handle_init},
    make::{MakeArgs, handle_make},
};
use examples::{ExampleGroup, command_examples};
use output::{GlobalOptions, OutputFormat, OutputManager};
use theme::{ICONS, THEME, help_styles, paint};

const ENVIRONMENT_VARIABLES: &[(&str, &str)] = &[
    ("RUST_LOG", "Log filter for engine diagnostics, e.g. sift=debug"),
    ("NO_COLOR", "Disable colored output when set"),
];

#[derive(Parser)]
#[command(name = "sift", version)]
#[command(
    about = "Scaffolding and inspection tool for sift search definitions",
    long_about = r#"Scaffolding and inspection CLI for sift:

• Project configuration with default page-size limits and sort tokens
• Generated search definitions with whitelisted fields, aliases and casts
• A dry run of any request against a schema file, showing the resulting query

Commands:
  init      Initialize sift in a project
  make      Generate a search definition
  explain   Show the query a request produces for a schema
"#
)]
#[command(subcommand_required = true, arg_required_else_help = true)]
struct Cli {
    /// Output format
    #[arg(long, value_enum, default_value = "table", global = true)]
    output: OutputFormat,

    /// Suppress output (only errors will be shown)
    #[arg(short = 'q', long, global = true)]
    quiet: bool,

    /// Enable verbose output
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize sift in the current project
    Init(InitArgs),

    /// Generate a search definition source file
    Make(MakeArgs),

    /// Apply a request to a schema file and show the resulting query
    Explain(ExplainArgs),
}

impl Cli {
    /// Parse arguments against the styled command; help and usage errors exit here.
    fn parse_with_styles() -> Self {
        let matches = match build_cli_command().try_get_matches() {
            Ok(matches) => matches,
            Err(err) if err.kind() == ErrorKind::MissingSubcommand => {
                let mut command = build_cli_command();
                eprintln!("\nerror: 'sift' requires a subcommand but one was not provided\n");
                let _ = command.print_long_help();
                println!();
                std::process::exit(err.exit_code());
            }
            Err(err) => {
                println!();
                let _ = err.print();
                println!();
                std::process::exit(err.exit_code());
            }
        };
        Cli::from_arg_matches(&matches).unwrap_or_else(|err| err.exit())
    }
}

fn build_cli_command() -> Command {
    let use_color = ShouldColorize::from_env().should_colorize();
    let mut command = Cli::command()
        .styles(help_styles())
        .color(if use_color { ColorChoice::Auto } else { ColorChoice::Never })
        .after_long_help(render_appendix(use_color));

    for example in command_examples() {
        if let Some(subcommand) = command.find_subcommand_mut(example.name) {
            *subcommand = subcommand.clone().after_long_help(render_examples(example.groups, use_color));
        }
    }
    command
}

fn render_examples(groups: &[ExampleGroup], use_color: bool) -> String {
    let mut buffer = String::new();
    let _ = writeln!(buffer, "{}", paint("Examples:", THEME.highlight, true, use_color));

    for (index, group) in groups.iter().enumerate() {
        if index > 0 {
            buffer.push('\n');
        }
        let _ = writeln!(buffer, "  {}", paint(group.title, THEME.primary, true, use_color));
        for command in group.commands {
            let arrow = paint(ICONS.arrow, THEME.secondary, false, use_color);
            let _ = writeln!(buffer, "    {arrow} {}", paint(command, THEME.secondary, false, use_color));
        }
    }
    buffer
}

fn render_appendix(use_color: bool) -> String {
    let mut buffer = String::new();
    let _ = writeln!(buffer, "{}", paint("Environment Variables:", THEME.highlight, true, use_color));
    for (key, description) in ENVIRONMENT_VARIABLES {
        let _ = writeln!(
            buffer,
            "  {}  {}",
            paint(key, THEME.key, true, use_color),
            paint(description, THEME.value, false, use_color)
        );
    }
    let _ = writeln!(
        buffer,
        "\n{} {}",
        paint("Tip:", THEME.highlight, true, use_color),
        paint("Use 'sift <command> --help' to view examples for each command.", THEME.secondary, false, use_color)
    );
    buffer
}

fn main() {
    env_logger::init();

    let cli = Cli::parse_with_styles();
    if cli.no_color {
        colored::control::set_override(false);
    }
    let output = OutputManager::new(GlobalOptions {
        output_format: cli.output,
        quiet: cli.quiet,
        verbose: cli.verbose,
        no_color: cli.no_color,
    });
    println!();

    if let Err(err) = execute(cli.command, &output) {
        output.error(&format!("Error: {err:#}"));
        println!();
        std::process::exit(1);
    }
    println!();
}

fn execute(command: Commands, output: &OutputManager) -> Result<()> {
    match command {
        Commands::Init(args) => handle_init(args, output),
        Commands::Make(args) => handle_make(args, output),
        Commands::Explain(args) => handle_explain(args, output),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn every_subcommand_has_examples() {
        let command = Cli::command();
        for example in command_examples() {
            assert!(command.find_subcommand(example.name).is_some(), "{}", example.name);
        }
        assert_eq!(command_examples().len(), command.get_subcommands().count());
    }

    #[test]
    fn global_flags_parse_after_the_subcommand() {
        let cli = Cli::try_parse_from(["sift", "make", "user_search", "-f", "name", "--output", "json", "-q"]).unwrap();
        assert_eq!(cli.output, OutputFormat::Json);
        assert!(cli.quiet);
        assert!(matches!(cli.command, Commands::Make(ref args) if args.fields == ["name"]));
    }

    #[test]
    fn plain_examples_have_no_escape_codes() {
        let rendered = render_examples(commands::make::EXAMPLES, false);
        assert!(rendered.starts_with("Examples:\n  Generate\n"));
        assert!(!rendered.contains('\u{1b}'));
    }
}
