use crate::config::Config;
use crate::language;
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

#[derive(Debug, Default, Deserialize)]
pub struct BuiltinIgnores {
    #[serde(default)]
    pub common: Vec<String>,
}

static BUILTIN_IGNORE_PATTERNS: Lazy<BuiltinIgnores> = Lazy::new(|| {
    let yaml_content = include_str!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/../data/builtin_ignores.yaml"
    ));
    serde_yml::from_str(yaml_content).expect("Failed to parse embedded data/builtin_ignores.yaml")
});

pub fn get_builtin_ignore_patterns() -> &'static BuiltinIgnores {
    &BUILTIN_IGNORE_PATTERNS
}

/// One source of gitignore-style exclusion patterns.
///
/// Negations (`!pattern`) only ever re-include paths excluded earlier in the
/// same layer.
#[derive(Debug, Clone)]
pub struct IgnoreLayer {
    name: &'static str,
    matcher: Gitignore,
}

impl IgnoreLayer {
    pub fn empty(name: &'static str) -> Self {
        Self {
            name,
            matcher: Gitignore::empty(),
        }
    }

    pub fn from_lines<'a, I>(root: &Path, name: &'static str, lines: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut builder = GitignoreBuilder::new(root);
        for line in lines {
            if let Err(e) = builder.add_line(None, line) {
                log::warn!("Skipping invalid {} pattern \"{}\": {}", name, line, e);
            }
        }
        match builder.build() {
            Ok(matcher) => {
                log::trace!("{} layer loaded with {} patterns", name, matcher.len());
                Self { name, matcher }
            }
            Err(e) => {
                log::warn!("Failed to build {} patterns, ignoring layer: {}", name, e);
                Self::empty(name)
            }
        }
    }

    /// Loads an ignore file. A missing or unreadable file yields an empty layer.
    pub fn from_file(root: &Path, name: &'static str, path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(content) => Self::from_lines(root, name, content.lines()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::trace!("No {} file at {}", name, path.display());
                Self::empty(name)
            }
            Err(e) => {
                log::warn!(
                    "Could not read {} file '{}', treating it as empty: {}",
                    name,
                    path.display(),
                    e
                );
                Self::empty(name)
            }
        }
    }

    /// True when the layer's last matching pattern for the path, or for the
    /// nearest matching ancestor directory, is an exclusion.
    pub fn excludes(&self, relative_path: &Path, is_dir: bool) -> bool {
        self.matcher
            .matched_path_or_any_parents(relative_path, is_dir)
            .is_ignore()
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn len(&self) -> usize {
        self.matcher.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matcher.is_empty()
    }
}

/// Decides which paths under the watch root belong in the documentation.
///
/// Layers are consulted in order: built-in defaults, `.gitignore`, `.docignore`.
/// Any layer excluding a path is final.
#[derive(Debug, Clone)]
pub struct PathFilter {
    builtin: IgnoreLayer,
    vcs: IgnoreLayer,
    tool: IgnoreLayer,
    extensions: HashSet<String>,
}

impl PathFilter {
    pub fn new(
        builtin: IgnoreLayer,
        vcs: IgnoreLayer,
        tool: IgnoreLayer,
        extensions: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            builtin,
            vcs,
            tool,
            extensions: extensions.into_iter().collect(),
        }
    }

    /// Builds the filter for a rebuild pass, reading both ignore files fresh.
    pub fn load(config: &Config) -> Self {
        let root = config.watch_path();
        let builtin = builtin_layer(config);
        let vcs = IgnoreLayer::from_file(root, "gitignore", &config.gitignore_path());
        let tool = IgnoreLayer::from_file(root, "docignore", &config.docignore_path());
        log::debug!(
            "Ignore layers loaded: builtin={}, gitignore={}, docignore={}",
            builtin.len(),
            vcs.len(),
            tool.len()
        );
        Self::new(builtin, vcs, tool, config.effective_extensions())
    }

    /// True if a relative path is excluded by any ignore layer, regardless of
    /// its extension.
    pub fn is_ignored(&self, relative_path: &Path, is_dir: bool) -> bool {
        for layer in [&self.builtin, &self.vcs, &self.tool] {
            if layer.excludes(relative_path, is_dir) {
                log::trace!(
                    "Path excluded by {} layer: {}",
                    layer.name(),
                    relative_path.display()
                );
                return true;
            }
        }
        false
    }

    pub fn is_dir_ignored(&self, relative_dir: &Path) -> bool {
        self.is_ignored(relative_dir, true)
    }

    pub fn is_extension_allowed(&self, extension: &str) -> bool {
        self.extensions.contains(extension)
    }

    /// True if the file at `relative_path` should be rendered.
    pub fn is_included(&self, relative_path: &Path) -> bool {
        if self.is_ignored(relative_path, false) {
            return false;
        }
        let extension = relative_path
            .file_name()
            .map(|name| language::extension_of(&name.to_string_lossy()))
            .unwrap_or_default();
        if !self.is_extension_allowed(&extension) {
            log::trace!(
                "Path excluded by extension filter: {}",
                relative_path.display()
            );
            return false;
        }
        true
    }
}

// Built-in patterns plus Autumn's own output documents, so a rebuild never
// reads what the previous one wrote.
fn builtin_layer(config: &Config) -> IgnoreLayer {
    let root = config.watch_path();
    let mut lines: Vec<String> = get_builtin_ignore_patterns().common.clone();
    if let Ok(relative_output) = config.output_file().strip_prefix(root) {
        lines.extend(output_patterns(relative_output));
    }
    IgnoreLayer::from_lines(root, "builtin", lines.iter().map(String::as_str))
}

fn output_patterns(relative_output: &Path) -> Vec<String> {
    let Some(file_name) = relative_output.file_name() else {
        return Vec::new();
    };
    let parent = relative_output
        .parent()
        .map(|p| {
            p.components()
                .map(|c| escape_glob(&c.as_os_str().to_string_lossy()))
                .collect::<Vec<_>>()
                .join("/")
        })
        .unwrap_or_default();
    let prefix = if parent.is_empty() {
        "/".to_string()
    } else {
        format!("/{}/", parent)
    };

    let file_name = Path::new(file_name);
    let stem = file_name
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let suffix = file_name
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    vec![
        format!("{}{}", prefix, escape_glob(&file_name.to_string_lossy())),
        format!("{}{}_*{}", prefix, escape_glob(&stem), escape_glob(&suffix)),
    ]
}

fn escape_glob(segment: &str) -> String {
    let mut escaped = String::with_capacity(segment.len());
    for c in segment.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\' | '!' | '#') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
