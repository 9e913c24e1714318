use autumn_core::{AppError, RebuildSummary};
use colored::*;
use std::path::Path;

pub fn print_summary(summary: &RebuildSummary, root: &Path, quiet: bool) {
    if quiet {
        return;
    }
    println!(
        "{} Documented {} files in {} ms",
        "✅".green(),
        summary.files_rendered.to_string().cyan(),
        summary.elapsed.as_millis()
    );
    if summary.files_skipped > 0 {
        println!(
            "   {} {} files skipped (binary, unreadable or vanished)",
            "⚠️".yellow(),
            summary.files_skipped
        );
    }
    if summary.files_rendered == 0 {
        println!(
            "   {}",
            "No matching files found. Check --extensions and your ignore files.".yellow()
        );
    }
    for document in &summary.documents {
        println!("   {}", display_relative(document, root).blue());
    }
}

pub fn print_rebuild_error(error: &AppError, quiet: bool) {
    if !quiet {
        eprintln!("{} {}", "⚠️ Error during regeneration:".yellow(), error);
    }
}

// Paths under the watch root read better relative to it.
pub fn display_relative(path: &Path, root: &Path) -> String {
    match pathdiff::diff_paths(path, root) {
        Some(rel) if !rel.starts_with("..") => rel.display().to_string(),
        _ => path.display().to_string(),
    }
}
