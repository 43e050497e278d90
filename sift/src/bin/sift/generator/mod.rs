//! Search definition generator.
//!
//! Renders definition source files and keeps the search module's mod.rs in sync.

mod codegen;
mod module_updater;

pub use codegen::{DefinitionFile, generate_definition_file};
pub use module_updater::update_search_mod;
