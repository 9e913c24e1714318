// Extension handling shared by the filter and the renderer.

/// Extensions used when the configuration does not name any.
pub const DEFAULT_EXTENSIONS: &[&str] = &[
    ".py", ".js", ".jsx", ".ts", ".tsx", ".css", ".scss", ".html", ".java", ".cs", ".go", ".rs",
    ".php", ".sql",
];

// Maps a normalized extension (leading dot, lowercase) to the tag used on the
// opening code fence. Unknown extensions get no tag.
pub fn language_tag(extension: &str) -> Option<&'static str> {
    match extension {
        ".py" | ".pyi" => Some("python"),
        ".js" | ".cjs" | ".mjs" | ".jsx" => Some("javascript"),
        ".ts" | ".tsx" | ".mts" | ".cts" => Some("typescript"),
        ".go" => Some("go"),
        ".rs" => Some("rust"),
        ".java" => Some("java"),
        ".kt" | ".kts" => Some("kotlin"),
        ".cs" => Some("csharp"),
        ".c" | ".h" => Some("c"),
        ".cpp" | ".cc" | ".cxx" | ".hpp" | ".hh" => Some("cpp"),
        ".rb" | ".rake" => Some("ruby"),
        ".php" => Some("php"),
        ".swift" => Some("swift"),
        ".lua" => Some("lua"),
        ".sql" => Some("sql"),
        ".sh" | ".bash" | ".zsh" => Some("bash"),
        ".html" | ".htm" => Some("html"),
        ".css" => Some("css"),
        ".scss" => Some("scss"),
        ".json" => Some("json"),
        ".yaml" | ".yml" => Some("yaml"),
        ".toml" => Some("toml"),
        ".xml" => Some("xml"),
        ".md" | ".markdown" => Some("markdown"),
        _ => None,
    }
}

/// Normalizes user input like `py`, `.PY` or ` .py ` to `.py`.
///
/// Returns `None` for empty input.
pub fn normalize_extension(raw: &str) -> Option<String> {
    let trimmed = raw.trim().trim_start_matches('.');
    if trimmed.is_empty() {
        None
    } else {
        Some(format!(".{}", trimmed.to_lowercase()))
    }
}

/// Extension of a relative path in normalized form, or an empty string.
pub fn extension_of(relative_path: &str) -> String {
    let file_name = relative_path.rsplit('/').next().unwrap_or(relative_path);
    match file_name.rfind('.') {
        // ".env" style names have no extension
        Some(0) | None => String::new(),
        Some(idx) => file_name[idx..].to_lowercase(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_common_extensions() {
        assert_eq!(language_tag(".py"), Some("python"));
        assert_eq!(language_tag(".js"), Some("javascript"));
        assert_eq!(language_tag(".ts"), Some("typescript"));
        assert_eq!(language_tag(".tsx"), Some("typescript"));
        assert_eq!(language_tag(".go"), Some("go"));
        assert_eq!(language_tag(".rs"), Some("rust"));
        assert_eq!(language_tag(".unknownext"), None);
    }

    #[test]
    fn normalizes_extensions() {
        assert_eq!(normalize_extension("py").as_deref(), Some(".py"));
        assert_eq!(normalize_extension(".PY").as_deref(), Some(".py"));
        assert_eq!(normalize_extension("  ..ts ").as_deref(), Some(".ts"));
        assert_eq!(normalize_extension(" . "), None);
    }

    #[test]
    fn extracts_extension_from_relative_path() {
        assert_eq!(extension_of("src/main.RS"), ".rs");
        assert_eq!(extension_of("a.tar.gz"), ".gz");
        assert_eq!(extension_of("dir.d/Makefile"), "");
        assert_eq!(extension_of(".env"), "");
    }
}
