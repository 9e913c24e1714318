use crate::error::{AppError, Result};
use crate::language::{self, DEFAULT_EXTENSIONS};
use parse_duration::parse;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_DIR: &str = ".autumn";
pub const DEFAULT_OUTPUT_FILENAME: &str = "CODE_DOCUMENTATION.md";
pub const DEFAULT_WATCH_DELAY: &str = "300ms";
pub const DEFAULT_MAX_WATCH_DELAY: &str = "2s";
pub const GITIGNORE_FILENAME: &str = ".gitignore";
pub const DOCIGNORE_FILENAME: &str = ".docignore";

/// Resolved, validated settings for one Autumn run.
///
/// Built through [`ConfigBuilder::build`] and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    watch_path: PathBuf,
    output_file: PathBuf,
    extensions: Vec<String>,
    split_by_extension: bool,
    watch_delay: Duration,
    max_watch_delay: Duration,
}

/// Unvalidated configuration as supplied by the CLI or a project file.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigBuilder {
    pub watch_path: PathBuf,
    pub output_file: PathBuf,
    pub extensions: Vec<String>,
    pub split_by_extension: bool,
    pub watch_delay: String,
    pub max_watch_delay: String,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self {
            watch_path: PathBuf::from("."),
            output_file: PathBuf::from(DEFAULT_OUTPUT_FILENAME),
            extensions: Vec::new(),
            split_by_extension: false,
            watch_delay: DEFAULT_WATCH_DELAY.to_string(),
            max_watch_delay: DEFAULT_MAX_WATCH_DELAY.to_string(),
        }
    }
}

impl ConfigBuilder {
    pub fn new(watch_path: impl Into<PathBuf>) -> Self {
        Self {
            watch_path: watch_path.into(),
            ..Self::default()
        }
    }

    pub fn output_file(mut self, output_file: impl Into<PathBuf>) -> Self {
        self.output_file = output_file.into();
        self
    }

    pub fn extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    pub fn split_by_extension(mut self, split: bool) -> Self {
        self.split_by_extension = split;
        self
    }

    pub fn watch_delay(mut self, delay: impl Into<String>) -> Self {
        self.watch_delay = delay.into();
        self
    }

    pub fn max_watch_delay(mut self, delay: impl Into<String>) -> Self {
        self.max_watch_delay = delay.into();
        self
    }

    pub fn build(self) -> Result<Config> {
        let watch_path = Config::determine_watch_path(&self.watch_path)?;

        let output_file = if self.output_file.is_absolute() {
            self.output_file
        } else {
            watch_path.join(&self.output_file)
        };
        if output_file.file_name().is_none() {
            return Err(AppError::Config(format!(
                "Output path '{}' does not name a file.",
                output_file.display()
            )));
        }

        let mut extensions: Vec<String> = Vec::with_capacity(self.extensions.len());
        for raw in &self.extensions {
            let Some(ext) = validate_extension(raw)? else {
                continue;
            };
            if !extensions.contains(&ext) {
                extensions.push(ext);
            }
        }

        let watch_delay = parse_delay(&self.watch_delay)?;
        let max_watch_delay = parse_delay(&self.max_watch_delay)?;
        if watch_delay.is_zero() {
            return Err(AppError::InvalidArgument(
                "Watch delay must be greater than zero.".to_string(),
            ));
        }
        if max_watch_delay < watch_delay {
            return Err(AppError::Config(format!(
                "Max watch delay '{}' is shorter than watch delay '{}'.",
                self.max_watch_delay, self.watch_delay
            )));
        }

        log::debug!(
            "Config resolved: root={}, output={}, extensions={:?}, split={}",
            watch_path.display(),
            output_file.display(),
            extensions,
            self.split_by_extension
        );

        Ok(Config {
            watch_path,
            output_file,
            extensions,
            split_by_extension: self.split_by_extension,
            watch_delay,
            max_watch_delay,
        })
    }
}

impl Config {
    pub fn builder(watch_path: impl Into<PathBuf>) -> ConfigBuilder {
        ConfigBuilder::new(watch_path)
    }

    pub fn watch_path(&self) -> &Path {
        &self.watch_path
    }

    pub fn output_file(&self) -> &Path {
        &self.output_file
    }

    /// Extensions exactly as configured. Empty means "use the defaults".
    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// Extensions the filter actually accepts.
    pub fn effective_extensions(&self) -> Vec<String> {
        if self.extensions.is_empty() {
            DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect()
        } else {
            self.extensions.clone()
        }
    }

    pub fn split_by_extension(&self) -> bool {
        self.split_by_extension
    }

    pub fn watch_delay(&self) -> Duration {
        self.watch_delay
    }

    pub fn max_watch_delay(&self) -> Duration {
        self.max_watch_delay
    }

    pub fn gitignore_path(&self) -> PathBuf {
        self.watch_path.join(GITIGNORE_FILENAME)
    }

    pub fn docignore_path(&self) -> PathBuf {
        self.watch_path.join(DOCIGNORE_FILENAME)
    }

    /// Expands `~`, falls back to `$AUTUMN_PATH` and then the current dir when
    /// the given path is empty, and canonicalizes the result.
    pub fn determine_watch_path(path: &Path) -> Result<PathBuf> {
        let path_str = path.to_string_lossy();
        let path_to_resolve = if path_str.is_empty() {
            match env::var("AUTUMN_PATH").ok().filter(|s| !s.is_empty()) {
                Some(p) => PathBuf::from(shellexpand::tilde(&p).as_ref()),
                None => env::current_dir().map_err(AppError::Io)?,
            }
        } else {
            PathBuf::from(shellexpand::tilde(&path_str).as_ref())
        };

        let canonical = path_to_resolve.canonicalize().map_err(|e| {
            AppError::Config(format!(
                "Failed to resolve watch path '{}': {}",
                path_to_resolve.display(),
                e
            ))
        })?;
        if !canonical.is_dir() {
            return Err(AppError::Config(format!(
                "Watch path '{}' is not a directory.",
                canonical.display()
            )));
        }
        Ok(canonical)
    }
}

/// Parses a comma separated extension list such as `"py, .js,ts"`.
pub fn parse_extensions(ext_string: &str) -> Result<Vec<String>> {
    let mut extensions = Vec::new();
    for part in ext_string.split(',') {
        if let Some(ext) = validate_extension(part)? {
            if !extensions.contains(&ext) {
                extensions.push(ext);
            }
        }
    }
    Ok(extensions)
}

fn validate_extension(raw: &str) -> Result<Option<String>> {
    let Some(ext) = language::normalize_extension(raw) else {
        return Ok(None);
    };
    if ext[1..]
        .chars()
        .any(|c| c.is_whitespace() || matches!(c, '/' | '\\' | '*' | '?' | ','))
    {
        return Err(AppError::InvalidArgument(format!(
            "Malformed extension '{}'.",
            raw.trim()
        )));
    }
    Ok(Some(ext))
}

fn parse_delay(value: &str) -> Result<Duration> {
    parse(value).map_err(|e| {
        AppError::DurationParse(format!(
            "Invalid watch delay duration '{}': {}. Use format like '500ms', '2s'.",
            value, e
        ))
    })
}
