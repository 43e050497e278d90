use anyhow::{Context, Result, bail};
use clap::Args;

use sift::config::SiftConfig;

use crate::context::ProjectContext;
use crate::examples::ExampleGroup;
use crate::output::OutputManager;

pub const EXAMPLES: &[ExampleGroup] = &[ExampleGroup {
    title: "Initialize",
    commands: &[
        "sift init                                  # Write .sift/config.toml with defaults",
        "sift init --search-dir src/filters         # Generate definitions into src/filters",
        "sift init --max-page-size 50 --force       # Overwrite an existing config",
    ],
}];

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Directory generated search definitions are written to
    #[arg(long)]
    pub search_dir: Option<String>,

    /// Default maximum page size for new definitions
    #[arg(long)]
    pub max_page_size: Option<u64>,

    /// Default sort token for new definitions (prefix with '-' for descending)
    #[arg(long, allow_hyphen_values = true)]
    pub default_sort: Option<String>,

    /// Overwrite an existing configuration
    #[arg(long)]
    pub force: bool,
}

pub fn handle_init(args: InitArgs, output: &OutputManager) -> Result<()> {
    let ctx = ProjectContext::find()?;
    let config = init_project(&ctx, args)?;

    output.success(&format!("Initialized sift in {}", ctx.project_root.display()));
    output.key_value("Config", &ctx.config_path.display().to_string());
    output.key_value("Search directory", &config.search.dir);
    output.key_value("Max page size", &config.defaults.max_page_size.to_string());
    output.info("Run 'sift make <Name>' to generate a search definition.");
    Ok(())
}

fn init_project(ctx: &ProjectContext, args: InitArgs) -> Result<SiftConfig> {
    if ctx.is_initialized() && !args.force {
        bail!(
            "{} already exists; pass --force to overwrite it",
            ctx.config_path.display()
        );
    }

    let mut config = SiftConfig::default();
    if let Some(dir) = args.search_dir {
        config.search.dir = dir;
    }
    if let Some(size) = args.max_page_size {
        if size == 0 {
            bail!("--max-page-size must be greater than zero");
        }
        config.defaults.max_page_size = size;
    }
    config.defaults.default_sort = args.default_sort.filter(|token| !token.trim().is_empty());

    let rendered = config.to_toml_string()?;
    std::fs::create_dir_all(&ctx.sift_dir)
        .with_context(|| format!("Failed to create {}", ctx.sift_dir.display()))?;
    std::fs::write(&ctx.config_path, rendered)
        .with_context(|| format!("Failed to write {}", ctx.config_path.display()))?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project() -> (tempfile::TempDir, ProjectContext) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Cargo.toml"), "[package]\nname = \"demo\"\n").unwrap();
        let ctx = ProjectContext::from_root(dir.path().to_path_buf()).unwrap();
        (dir, ctx)
    }

    fn args() -> InitArgs {
        InitArgs {
            search_dir: Some("src/filters".into()),
            max_page_size: Some(25),
            default_sort: Some("-id".into()),
            force: false,
        }
    }

    #[test]
    fn writes_config_that_reloads() {
        let (dir, ctx) = project();
        init_project(&ctx, args()).unwrap();

        let reloaded = ProjectContext::from_root(dir.path().to_path_buf()).unwrap();
        assert!(reloaded.is_initialized());
        assert_eq!(reloaded.config.search.dir, "src/filters");
        assert_eq!(reloaded.config.defaults.max_page_size, 25);
        assert_eq!(reloaded.config.defaults.default_sort.as_deref(), Some("-id"));
    }

    #[test]
    fn refuses_to_overwrite_without_force() {
        let (dir, ctx) = project();
        init_project(&ctx, args()).unwrap();

        let ctx = ProjectContext::from_root(dir.path().to_path_buf()).unwrap();
        assert!(init_project(&ctx, args()).is_err());
        assert!(init_project(&ctx, InitArgs { force: true, ..args() }).is_ok());
    }
}
