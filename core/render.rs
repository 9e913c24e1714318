use crate::error::{AppError, Result};
use crate::gather::FileEntry;
use crate::language;
use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::Builder;

pub const DOCUMENT_TITLE: &str = "Project Source Code Context";
pub const TIMESTAMP_PREFIX: &str = "*Last updated: ";
pub const ATTRIBUTION_LINE: &str = "*This file is automatically maintained by Autumn.*";
const NO_EXTENSION_LABEL: &str = "noext";
// Matched by the built-in ignore list so the watcher skips our own temp files.
const TEMP_PREFIX: &str = ".autumn-";
const TEMP_SUFFIX: &str = ".tmp";

/// Rendered documents keyed by output path, in write order.
pub type Documents = IndexMap<PathBuf, String>;

/// Renders `entries` into markdown.
///
/// Non-split mode yields exactly one document at `output_file`, even when
/// `entries` is empty. Split mode yields one document per distinct extension,
/// named by [`split_output_path`].
pub fn render(
    entries: &[FileEntry],
    split: bool,
    output_file: &Path,
    generated_at: DateTime<Utc>,
) -> Documents {
    let mut sorted: Vec<&FileEntry> = entries.iter().collect();
    sorted.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    let timestamp = generated_at.to_rfc3339_opts(SecondsFormat::Millis, true);

    let mut documents = Documents::new();
    if !split {
        let body = render_document(DOCUMENT_TITLE, &timestamp, &sorted);
        documents.insert(output_file.to_path_buf(), body);
        return documents;
    }

    let mut by_extension: BTreeMap<&str, Vec<&FileEntry>> = BTreeMap::new();
    for entry in sorted {
        by_extension
            .entry(entry.extension.as_str())
            .or_default()
            .push(entry);
    }
    for (extension, files) in by_extension {
        let title = format!("{} Files", extension_label(extension).to_uppercase());
        let body = render_document(&title, &timestamp, &files);
        documents.insert(split_output_path(output_file, extension), body);
    }
    documents
}

/// `CODE_DOCUMENTATION.md` + `.py` -> `CODE_DOCUMENTATION_py.md`, in the same
/// directory as the base output.
pub fn split_output_path(output_file: &Path, extension: &str) -> PathBuf {
    let stem = output_file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let suffix = output_file
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let file_name = format!("{}_{}{}", stem, extension_label(extension), suffix);
    match output_file.parent() {
        Some(parent) => parent.join(file_name),
        None => PathBuf::from(file_name),
    }
}

fn extension_label(extension: &str) -> &str {
    let label = extension.trim_start_matches('.');
    if label.is_empty() {
        NO_EXTENSION_LABEL
    } else {
        label
    }
}

fn render_document(title: &str, timestamp: &str, files: &[&FileEntry]) -> String {
    let mut markdown = String::new();
    markdown.push_str(&format!("# {}\n", title));
    markdown.push_str(&format!("{}{}*\n\n", TIMESTAMP_PREFIX, timestamp));
    markdown.push_str(ATTRIBUTION_LINE);
    markdown.push_str("\n\n");
    for file in files {
        push_section(&mut markdown, file);
    }
    markdown
}

fn push_section(markdown: &mut String, file: &FileEntry) {
    let fence = fence_for(&file.content);
    let tag = language::language_tag(&file.extension).unwrap_or("");
    markdown.push_str(&format!("## {}\n\n", file.relative_path));
    markdown.push_str(&format!("{}{}\n", fence, tag));
    markdown.push_str(&file.content);
    if !file.content.is_empty() && !file.content.ends_with('\n') {
        markdown.push('\n');
    }
    markdown.push_str(&fence);
    markdown.push_str("\n\n");
}

// A fence longer than any backtick run in the content cannot be closed early.
fn fence_for(content: &str) -> String {
    let mut longest = 0;
    let mut current = 0;
    for c in content.chars() {
        if c == '`' {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    "`".repeat((longest + 1).max(3))
}

/// Writes each document through a temp file in its destination directory and
/// renames it into place, so readers never see a half-written document.
pub fn write_documents(documents: &Documents) -> Result<()> {
    for (path, body) in documents {
        write_atomic(path, body)?;
        log::info!("Documentation updated: {}", path.display());
    }
    Ok(())
}

fn write_atomic(path: &Path, body: &str) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent).map_err(|e| AppError::DirCreation {
        path: parent.clone(),
        source: e,
    })?;

    let write_err = |source: std::io::Error| AppError::FileWrite {
        path: path.to_path_buf(),
        source,
    };
    let mut tmp = Builder::new()
        .prefix(TEMP_PREFIX)
        .suffix(TEMP_SUFFIX)
        .tempfile_in(&parent)
        .map_err(write_err)?;
    tmp.write_all(body.as_bytes()).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    if let Ok(meta) = fs::metadata(path) {
        // Keep the mode of the document being replaced.
        let _ = tmp.as_file().set_permissions(meta.permissions());
    }
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}

/// Deletes split documents next to `output_file` that this pass did not
/// write, e.g. `DOC_go.md` once the last `.go` file is gone. Returns the
/// removed paths.
pub fn remove_stale_split_documents(
    output_file: &Path,
    written: &Documents,
) -> Result<Vec<PathBuf>> {
    let parent = match output_file.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let entries = match fs::read_dir(&parent) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(AppError::FileRead {
                path: parent,
                source: e,
            });
        }
    };

    let mut removed = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if written.contains_key(&path) || !entry.file_type().is_ok_and(|t| t.is_file()) {
            continue;
        }
        if !is_split_document_name(output_file, &entry.file_name().to_string_lossy()) {
            continue;
        }
        match fs::remove_file(&path) {
            Ok(()) => {
                log::info!("Removed stale documentation: {}", path.display());
                removed.push(path);
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                return Err(AppError::FileWrite { path, source: e });
            }
        }
    }
    removed.sort();
    Ok(removed)
}

// `<stem>_<label><suffix>` where label could have come from an extension.
fn is_split_document_name(output_file: &Path, file_name: &str) -> bool {
    let stem = output_file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let suffix = output_file
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let Some(rest) = file_name.strip_prefix(&format!("{}_", stem)) else {
        return false;
    };
    let Some(label) = rest.strip_suffix(&suffix) else {
        return false;
    };
    !label.is_empty()
        && label
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '+'))
}

/// Drops the `*Last updated: ...*` line, leaving the part of a document that
/// only changes when the rendered files do.
pub fn strip_timestamp(body: &str) -> String {
    body.lines()
        .filter(|line| !line.starts_with(TIMESTAMP_PREFIX))
        .collect::<Vec<_>>()
        .join("\n")
}
