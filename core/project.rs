use crate::config::{ConfigBuilder, DEFAULT_CONFIG_DIR, DEFAULT_OUTPUT_FILENAME};
use crate::error::{AppError, Result};
use crate::language::DEFAULT_EXTENSIONS;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const PROJECT_CONFIG_FILENAME: &str = "project.autumn";

// On-disk shape of `.autumn/project.autumn`. Paths are relative to the
// directory that contains `.autumn/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProjectFile {
    #[serde(default)]
    extensions: Vec<String>,
    #[serde(default = "default_output_file")]
    output_file: String,
    #[serde(default = "default_watch_path")]
    watch_path: String,
}

fn default_output_file() -> String {
    DEFAULT_OUTPUT_FILENAME.to_string()
}
fn default_watch_path() -> String {
    ".".to_string()
}

/// Project-level settings with paths resolved against the project directory.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectConfig {
    pub extensions: Vec<String>,
    pub output_file: PathBuf,
    pub watch_path: PathBuf,
}

impl ProjectConfig {
    /// Looks for `.autumn/project.autumn` in `start` and each of its parents.
    pub fn find_config(start: &Path) -> Option<PathBuf> {
        let start = start
            .canonicalize()
            .unwrap_or_else(|_| start.to_path_buf());
        for dir in start.ancestors() {
            let candidate = dir.join(DEFAULT_CONFIG_DIR).join(PROJECT_CONFIG_FILENAME);
            if candidate.is_file() {
                log::debug!("Found project config: {}", candidate.display());
                return Some(candidate);
            }
        }
        log::debug!("No project config found above {}", start.display());
        None
    }

    pub fn load_config(config_path: &Path) -> Result<Self> {
        log::info!("Loading project configuration from: {}", config_path.display());
        let content = fs::read_to_string(config_path).map_err(|e| AppError::FileRead {
            path: config_path.to_path_buf(),
            source: e,
        })?;
        let file: ProjectFile = serde_yml::from_str(&content).map_err(|e| {
            AppError::Config(format!(
                "Error parsing project config '{}': {}",
                config_path.display(),
                e
            ))
        })?;

        // <base>/.autumn/project.autumn
        let base = config_path
            .parent()
            .and_then(Path::parent)
            .ok_or_else(|| {
                AppError::Config(format!(
                    "Project config '{}' is not inside a {} directory.",
                    config_path.display(),
                    DEFAULT_CONFIG_DIR
                ))
            })?;

        let watch_path = base.join(&file.watch_path);
        let output_file = resolve_output_path(&file.output_file, &watch_path);
        let output_file = if output_file.is_absolute() {
            output_file
        } else {
            base.join(output_file)
        };
        Ok(Self {
            extensions: file.extensions,
            output_file,
            watch_path,
        })
    }

    /// Writes `config` to `<project_dir>/.autumn/project.autumn`, storing paths
    /// relative to `project_dir` where possible.
    pub fn save_config(project_dir: &Path, config: &ProjectConfig) -> Result<PathBuf> {
        let config_dir = project_dir.join(DEFAULT_CONFIG_DIR);
        fs::create_dir_all(&config_dir).map_err(|e| AppError::DirCreation {
            path: config_dir.clone(),
            source: e,
        })?;

        let relative = |path: &Path| -> String {
            let rel = pathdiff::diff_paths(path, project_dir).unwrap_or_else(|| path.to_path_buf());
            let rel = rel.to_string_lossy().into_owned();
            if rel.is_empty() { ".".to_string() } else { rel }
        };
        let file = ProjectFile {
            extensions: config.extensions.clone(),
            output_file: relative(&config.output_file),
            watch_path: relative(&config.watch_path),
        };

        let config_path = config_dir.join(PROJECT_CONFIG_FILENAME);
        let yaml = serde_yml::to_string(&file)?;
        fs::write(&config_path, yaml).map_err(|e| AppError::FileWrite {
            path: config_path.clone(),
            source: e,
        })?;
        Ok(config_path)
    }

    /// Creates a default project configuration in `project_dir`: the default
    /// extension list, output in `.autumn/`, watching `project_dir` itself.
    pub fn create_project(project_dir: &Path) -> Result<PathBuf> {
        let project_dir = project_dir.canonicalize().map_err(|e| {
            AppError::Config(format!(
                "Cannot create project in '{}': {}",
                project_dir.display(),
                e
            ))
        })?;
        let config = ProjectConfig {
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            output_file: project_dir
                .join(DEFAULT_CONFIG_DIR)
                .join(DEFAULT_OUTPUT_FILENAME),
            watch_path: project_dir.clone(),
        };
        let path = Self::save_config(&project_dir, &config)?;
        log::info!(
            "Created Autumn project configuration in {}",
            project_dir.join(DEFAULT_CONFIG_DIR).display()
        );
        Ok(path)
    }

    pub fn into_builder(self) -> ConfigBuilder {
        ConfigBuilder::new(self.watch_path)
            .output_file(self.output_file)
            .extensions(self.extensions)
    }
}

/// Where a bare output name like `CONTEXT.md` should go.
///
/// Anything containing a path separator is returned unchanged. A bare file
/// name lands in `<watch_path>/.autumn/` when that directory exists, otherwise
/// directly in `watch_path`.
pub fn resolve_output_path(output_arg: &str, watch_path: &Path) -> PathBuf {
    if output_arg.contains(['/', '\\']) {
        log::debug!("Using provided output path: {}", output_arg);
        return PathBuf::from(output_arg);
    }
    let autumn_dir = watch_path.join(DEFAULT_CONFIG_DIR);
    if autumn_dir.is_dir() {
        log::debug!("Using .autumn directory: {}", autumn_dir.display());
        autumn_dir.join(output_arg)
    } else {
        watch_path.join(output_arg)
    }
}
