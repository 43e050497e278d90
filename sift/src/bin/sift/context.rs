use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use sift::config::{CONFIG_DIR, CONFIG_FILE, SiftConfig};

/// Project context for sift operations
pub struct ProjectContext {
    /// Root directory of the project (where Cargo.toml is)
    pub project_root: PathBuf,
    /// Path to .sift directory
    pub sift_dir: PathBuf,
    /// Path to config file
    pub config_path: PathBuf,
    /// Loaded configuration, defaults when the project has none
    pub config: SiftConfig,
}

impl ProjectContext {
    /// Find and load project context from current directory or ancestors
    pub fn find() -> Result<Self> {
        let current_dir = std::env::current_dir().context("Failed to get current directory")?;
        Self::find_from(&current_dir)
    }

    pub fn find_from(start: &Path) -> Result<Self> {
        let project_root = Self::find_project_root(start)?;
        Self::from_root(project_root)
    }

    /// Create context from a known project root
    pub fn from_root(project_root: PathBuf) -> Result<Self> {
        let sift_dir = project_root.join(CONFIG_DIR);
        let config_path = sift_dir.join(CONFIG_FILE);

        let config = if config_path.exists() {
            SiftConfig::load(&config_path)
                .with_context(|| format!("Failed to load {}", config_path.display()))?
        } else {
            SiftConfig::default()
        };

        Ok(Self {
            project_root,
            sift_dir,
            config_path,
            config,
        })
    }

    /// Find project root by looking for Cargo.toml
    fn find_project_root(start: &Path) -> Result<PathBuf> {
        let mut current = start.to_path_buf();

        loop {
            if current.join("Cargo.toml").exists() {
                return Ok(current);
            }

            if !current.pop() {
                anyhow::bail!(
                    "Could not find Cargo.toml in {start:?} or any parent directory. \
                     Are you in a Rust project?"
                );
            }
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.config_path.exists()
    }

    /// Directory generated search definitions go to, from config unless overridden.
    pub fn search_dir(&self, override_dir: Option<&Path>) -> PathBuf {
        match override_dir {
            Some(dir) if dir.is_absolute() => dir.to_path_buf(),
            Some(dir) => self.project_root.join(dir),
            None => self.project_root.join(&self.config.search.dir),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Cargo.toml"), "[package]\nname = \"demo\"\n").unwrap();
        dir
    }

    #[test]
    fn finds_root_from_nested_directory() {
        let dir = project();
        let nested = dir.path().join("src/search");
        std::fs::create_dir_all(&nested).unwrap();

        let ctx = ProjectContext::find_from(&nested).unwrap();
        assert_eq!(ctx.project_root, dir.path());
        assert!(!ctx.is_initialized());
        assert_eq!(ctx.search_dir(None), dir.path().join("src/search"));
    }

    #[test]
    fn loads_configured_search_dir() {
        let dir = project();
        std::fs::create_dir_all(dir.path().join(".sift")).unwrap();
        std::fs::write(dir.path().join(".sift/config.toml"), "[search]\ndir = \"src/filters\"\n").unwrap();

        let ctx = ProjectContext::from_root(dir.path().to_path_buf()).unwrap();
        assert!(ctx.is_initialized());
        assert_eq!(ctx.search_dir(None), dir.path().join("src/filters"));
        assert_eq!(ctx.search_dir(Some(Path::new("lib/search"))), dir.path().join("lib/search"));
    }

    #[test]
    fn broken_config_is_reported() {
        let dir = project();
        std::fs::create_dir_all(dir.path().join(".sift")).unwrap();
        std::fs::write(dir.path().join(".sift/config.toml"), "[search\n").unwrap();

        assert!(ProjectContext::from_root(dir.path().to_path_buf()).is_err());
    }
}
