pub mod autumn;
pub mod config;
pub mod debounce;
pub mod error;
pub mod filter;
pub mod gather;
pub mod language;
pub mod project;
pub mod render;
pub mod watch;

pub use autumn::{Autumn, RebuildSummary, WatchHandle};
pub use config::{Config, ConfigBuilder, parse_extensions};
pub use error::{AppError, Result};
pub use filter::{IgnoreLayer, PathFilter};
pub use gather::{FileEntry, GatherOutcome, gather_files};
pub use project::{ProjectConfig, resolve_output_path};
pub use render::{
    Documents, remove_stale_split_documents, render, split_output_path, write_documents,
};
pub use watch::WatchCoordinator;
