//! Keeps the search directory's mod.rs in step with generated definitions.

use anyhow::{Context, Result};
use std::path::Path;

const MOD_HEADER: &str = "//! Search definitions.\n//!\n//! Module declarations are maintained by `sift make`.\n\n";

/// Add `pub mod <module_name>;` to `<search_dir>/mod.rs`, creating the file if needed.
///
/// Declarations are kept in alphabetical order. Returns `false` when the module
/// was already declared.
pub fn update_search_mod(search_dir: &Path, module_name: &str) -> Result<bool> {
    let mod_path = search_dir.join("mod.rs");

    let content = if mod_path.exists() {
        std::fs::read_to_string(&mod_path).with_context(|| format!("Failed to read {}", mod_path.display()))?
    } else {
        MOD_HEADER.to_string()
    };

    let Some(updated) = insert_declaration(&content, module_name) else {
        return Ok(false);
    };

    std::fs::write(&mod_path, updated).with_context(|| format!("Failed to write {}", mod_path.display()))?;
    Ok(true)
}

fn declared_module(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    let rest = trimmed.strip_prefix("pub mod ").or_else(|| trimmed.strip_prefix("mod "))?;
    rest.strip_suffix(';').map(str::trim)
}

fn insert_declaration(content: &str, module_name: &str) -> Option<String> {
    let mut lines: Vec<&str> = content.lines().collect();
    if lines.iter().any(|line| declared_module(line) == Some(module_name)) {
        return None;
    }

    let declaration = format!("pub mod {module_name};");
    let mut insert_at = None;
    let mut last_decl = None;
    for (index, line) in lines.iter().enumerate() {
        if let Some(existing) = declared_module(line) {
            last_decl = Some(index);
            if insert_at.is_none() && existing > module_name {
                insert_at = Some(index);
            }
        }
    }

    let position = insert_at.or(last_decl.map(|index| index + 1)).unwrap_or(lines.len());
    lines.insert(position, &declaration);

    let mut updated = lines.join("\n");
    updated.push('\n');
    Some(updated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_mod_file_with_header() {
        let dir = tempfile::tempdir().unwrap();
        assert!(update_search_mod(dir.path(), "user_search").unwrap());

        let content = std::fs::read_to_string(dir.path().join("mod.rs")).unwrap();
        assert!(content.starts_with("//! Search definitions."));
        assert!(content.ends_with("\npub mod user_search;\n"));
    }

    #[test]
    fn keeps_declarations_sorted_and_unique() {
        let content = "//! Search.\n\npub mod account_search;\npub mod user_search;\n";
        let updated = insert_declaration(content, "order_search").unwrap();
        assert_eq!(
            updated,
            "//! Search.\n\npub mod account_search;\npub mod order_search;\npub mod user_search;\n"
        );
        assert_eq!(insert_declaration(&updated, "order_search"), None);
    }

    #[test]
    fn recognises_private_declarations() {
        assert_eq!(insert_declaration("mod user_search;\n", "user_search"), None);
    }
}
