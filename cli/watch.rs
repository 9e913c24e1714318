use crate::output::{print_rebuild_error, print_summary};
use anyhow::{Context, Result};
use autumn_core::Autumn;
use colored::*;

/// Initial pass, then rebuild on every debounced change until the process is
/// interrupted. Rebuild failures are reported and watching continues.
pub fn run_watch_mode(autumn: &Autumn, quiet: bool, verbose: u8) -> Result<()> {
    let config = autumn.config();
    let root = config.watch_path().to_path_buf();

    if !quiet {
        println!(
            "👀 Watching '{}'. Press Ctrl+C to exit.",
            root.display()
        );
        if verbose > 0 {
            let extensions = config.effective_extensions().join(", ");
            println!("   Extensions: {}", extensions.dimmed());
            println!(
                "   Delay: {:?} (max {:?})",
                config.watch_delay(),
                config.max_watch_delay()
            );
        }
    }

    autumn
        .watch_with(move |result| match result {
            Ok(summary) => {
                log::debug!("Rebuild finished in {:?}", summary.elapsed);
                print_summary(summary, &root, quiet);
            }
            Err(e) => print_rebuild_error(e, quiet),
        })
        .context("Failed to start watching")
}
