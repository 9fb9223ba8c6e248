//! Init command - write a starter pagescore.toml

use anyhow::{Context, Result};
use console::style;
use std::path::Path;

use crate::config::DEFAULT_CONFIG_TOML;

pub const CONFIG_FILE_NAME: &str = "pagescore.toml";

/// Run the init command
pub fn run(path: &Path, force: bool) -> Result<()> {
    if !path.is_dir() {
        anyhow::bail!("Path is not a directory: {}", path.display());
    }

    let config_path = path.join(CONFIG_FILE_NAME);
    if config_path.exists() && !force {
        println!(
            "{} Config already exists at {} (use --force to overwrite)",
            style("✓").green(),
            style(config_path.display()).cyan()
        );
        return Ok(());
    }

    std::fs::write(&config_path, DEFAULT_CONFIG_TOML)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;
    println!(
        "{} Created {}",
        style("✓").green(),
        style(config_path.display()).cyan()
    );
    println!(
        "\n  Edit category weights there, then run {}",
        style("pagescore run artifacts.json").bold()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_project_config;

    #[test]
    fn test_init_writes_loadable_config() {
        let dir = tempfile::tempdir().unwrap();
        run(dir.path(), false).unwrap();

        let written = std::fs::read_to_string(dir.path().join(CONFIG_FILE_NAME)).unwrap();
        assert_eq!(written, DEFAULT_CONFIG_TOML);
        let config = load_project_config(dir.path()).unwrap();
        assert!(config.categories.contains_key("seo"));
    }

    #[test]
    fn test_init_keeps_existing_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[overall]\nseo = 2\n").unwrap();

        run(dir.path(), false).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[overall]\nseo = 2\n");

        run(dir.path(), true).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), DEFAULT_CONFIG_TOML);
    }

    #[test]
    fn test_init_rejects_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(run(&dir.path().join("nope"), false).is_err());
    }
}
