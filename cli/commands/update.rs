use crate::output::print_summary;
use anyhow::{Context, Result};
use autumn_core::Autumn;

pub fn handle_update_command(autumn: &Autumn, quiet: bool) -> Result<()> {
    log::debug!("Executing single update...");
    let summary = autumn
        .update_documentation()
        .context("Failed to update documentation")?;
    print_summary(&summary, autumn.config().watch_path(), quiet);
    Ok(())
}
