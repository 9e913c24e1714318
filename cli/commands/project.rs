use anyhow::{Context, Result};
use autumn_core::ProjectConfig;
use colored::*;
use std::path::Path;

pub fn handle_project_command(project_dir: &Path, quiet: bool) -> Result<()> {
    log::debug!("Creating project config in {}", project_dir.display());
    let config_path = ProjectConfig::create_project(project_dir)
        .with_context(|| format!("Failed to create project in {}", project_dir.display()))?;
    if !quiet {
        println!(
            "{} Project configuration written to: {}",
            "✅".green(),
            config_path.display().to_string().blue()
        );
        println!(
            "   Run {} in {} to start watching.",
            "autumn".bold(),
            project_dir.display()
        );
    }
    Ok(())
}
