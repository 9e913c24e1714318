use crate::error::{AppError, Result};
use crate::filter::PathFilter;
use crate::language;
use rayon::prelude::*;
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

// Only the head of a file is inspected when sniffing for binary content.
const BINARY_SNIFF_LEN: usize = 8000;

/// A file selected for rendering, read during the current rebuild pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Path relative to the watch root, `/`-separated.
    pub relative_path: String,
    /// Normalized extension (`.py`), empty when the file has none.
    pub extension: String,
    pub content: String,
}

impl FileEntry {
    pub fn new(relative_path: impl Into<String>, content: impl Into<String>) -> Self {
        let relative_path = relative_path.into();
        let extension = language::extension_of(&relative_path);
        Self {
            relative_path,
            extension,
            content: content.into(),
        }
    }
}

/// A matched file that could not be rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    pub relative_path: String,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct GatherOutcome {
    pub files: Vec<FileEntry>,
    pub skipped: Vec<SkippedFile>,
}

/// `/`-joined form of a relative path, used for ordering and headings.
pub fn relative_key(relative_path: &Path) -> String {
    relative_path
        .components()
        .filter_map(|c| match c {
            Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Lists the files under `root` accepted by `filter`, sorted by relative path.
///
/// Ignored directories are pruned rather than descended into.
pub fn collect_paths(root: &Path, filter: &PathFilter) -> Result<Vec<(PathBuf, String)>> {
    log::debug!("Walking watch root: {}", root.display());
    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            if entry.depth() == 0 || !entry.file_type().is_dir() {
                return true;
            }
            match entry.path().strip_prefix(root) {
                Ok(rel) => !filter.is_dir_ignored(rel),
                Err(_) => false,
            }
        });

    let mut matched = Vec::new();
    for entry_result in walker {
        let entry = match entry_result {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => return Err(AppError::from(e)),
            Err(e) => {
                log::warn!("Error walking directory: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative_path) = entry.path().strip_prefix(root) else {
            log::warn!("Could not get relative path for: {}", entry.path().display());
            continue;
        };
        if filter.is_included(relative_path) {
            log::trace!("Including: {}", relative_path.display());
            matched.push((entry.path().to_path_buf(), relative_key(relative_path)));
        }
    }
    matched.sort_by(|a, b| a.1.cmp(&b.1));
    log::debug!("Directory walk complete. {} files matched.", matched.len());
    Ok(matched)
}

/// Walks `root`, applies `filter` and reads every matched file.
///
/// Files that vanish, cannot be read, or are not UTF-8 text are reported in
/// [`GatherOutcome::skipped`] instead of failing the pass.
pub fn gather_files(root: &Path, filter: &PathFilter) -> Result<GatherOutcome> {
    let matched = collect_paths(root, filter)?;
    log::info!("Reading content for {} files...", matched.len());

    let results: Vec<std::result::Result<FileEntry, SkippedFile>> = matched
        .into_par_iter()
        .map(|(path, relative_path)| read_entry(&path, relative_path))
        .collect();

    let mut outcome = GatherOutcome::default();
    for res in results {
        match res {
            Ok(entry) => outcome.files.push(entry),
            Err(skipped) => {
                log::warn!("Skipping {}: {}", skipped.relative_path, skipped.reason);
                outcome.skipped.push(skipped);
            }
        }
    }
    // collect() on an indexed parallel iterator keeps order, sort anyway so
    // callers never depend on that.
    outcome
        .files
        .sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    Ok(outcome)
}

fn read_entry(path: &Path, relative_path: String) -> std::result::Result<FileEntry, SkippedFile> {
    let skip = |reason: String| SkippedFile {
        relative_path: relative_path.clone(),
        reason,
    };
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(skip("file disappeared before it could be read".to_string()));
        }
        Err(e) => return Err(skip(format!("read failed: {}", e))),
    };
    if bytes[..bytes.len().min(BINARY_SNIFF_LEN)].contains(&0) {
        return Err(skip("binary content".to_string()));
    }
    match String::from_utf8(bytes) {
        Ok(content) => Ok(FileEntry::new(relative_path, content)),
        Err(_) => Err(skip("not valid UTF-8".to_string())),
    }
}
