use crate::config::{Config, DOCIGNORE_FILENAME, GITIGNORE_FILENAME};
use crate::error::Result;
use crate::filter::PathFilter;
use crate::gather;
use crate::language;
use crate::render;
use crate::watch::WatchCoordinator;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::{Duration, Instant};

/// What one rebuild pass produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RebuildSummary {
    pub files_rendered: usize,
    pub files_skipped: usize,
    pub documents: Vec<PathBuf>,
    pub elapsed: Duration,
}

/// Keeps the markdown documentation for one watch root up to date.
///
/// Owns the configuration, the latest ignore rules and the watch
/// subscription. Rebuild passes are serialized: a one-shot call and a
/// watch-triggered pass never write the output concurrently.
pub struct Autumn {
    inner: Arc<Inner>,
    watch_state: Mutex<WatchState>,
    watch_changed: Condvar,
}

#[derive(Debug, Default)]
struct WatchState {
    // A blocking watch() is between its initial pass and full shutdown.
    active: bool,
    stop_requested: bool,
}

struct Inner {
    config: Config,
    rebuild_lock: Mutex<()>,
    filter: RwLock<PathFilter>,
}

/// A running watch. Dropping it stops the watch.
pub struct WatchHandle {
    coordinator: WatchCoordinator,
}

impl WatchHandle {
    /// Stops watching, letting an in-flight rebuild finish first.
    pub fn stop(mut self) {
        self.coordinator.stop();
    }

    /// Queues a rebuild as if a file had changed.
    pub fn trigger(&self) {
        self.coordinator.notify_change();
    }
}

impl Autumn {
    pub fn new(config: Config) -> Self {
        let filter = PathFilter::load(&config);
        Self {
            inner: Arc::new(Inner {
                config,
                rebuild_lock: Mutex::new(()),
                filter: RwLock::new(filter),
            }),
            watch_state: Mutex::new(WatchState::default()),
            watch_changed: Condvar::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Runs one full filter, render and write pass.
    pub fn update_documentation(&self) -> Result<RebuildSummary> {
        self.inner.update_documentation()
    }

    /// Starts watching and returns immediately. Every debounced burst of
    /// relevant changes runs a rebuild and hands its result to `on_rebuild`.
    /// Rebuild errors never stop the watch.
    pub fn start_watch_with<H>(&self, on_rebuild: H) -> Result<WatchHandle>
    where
        H: Fn(&Result<RebuildSummary>) + Send + 'static,
    {
        let config = &self.inner.config;
        let relevance_inner = Arc::clone(&self.inner);
        let rebuild_inner = Arc::clone(&self.inner);
        let coordinator = WatchCoordinator::start(
            config.watch_path(),
            config.watch_delay(),
            config.max_watch_delay(),
            move |path| relevance_inner.is_relevant(path),
            move || {
                let result = rebuild_inner.update_documentation();
                on_rebuild(&result);
            },
        )?;
        Ok(WatchHandle { coordinator })
    }

    pub fn start_watch(&self) -> Result<WatchHandle> {
        self.start_watch_with(log_rebuild)
    }

    /// Runs an initial pass, then watches until [`Autumn::stop`] is called
    /// from another thread. A stop requested before the watch started ends it
    /// right after the initial pass. Only a failure to start watching is
    /// returned as an error.
    pub fn watch(&self) -> Result<()> {
        self.watch_with(log_rebuild)
    }

    pub fn watch_with<H>(&self, on_rebuild: H) -> Result<()>
    where
        H: Fn(&Result<RebuildSummary>) + Send + Sync + 'static,
    {
        self.lock_watch_state().active = true;
        let result = self.watch_until_stopped(on_rebuild);

        let mut state = self.lock_watch_state();
        state.active = false;
        // Consume the request so a later watch() blocks again.
        state.stop_requested = false;
        drop(state);
        self.watch_changed.notify_all();
        result
    }

    fn watch_until_stopped<H>(&self, on_rebuild: H) -> Result<()>
    where
        H: Fn(&Result<RebuildSummary>) + Send + Sync + 'static,
    {
        let on_rebuild = Arc::new(on_rebuild);
        on_rebuild(&self.update_documentation());

        let hook = Arc::clone(&on_rebuild);
        let handle = self.start_watch_with(move |result| hook(result))?;

        let mut state = self.lock_watch_state();
        while !state.stop_requested {
            state = self
                .watch_changed
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        drop(state);

        handle.stop();
        Ok(())
    }

    /// Ends a blocking [`Autumn::watch`] call. When a watch is running, returns
    /// only after its subscription is dropped and any in-flight rebuild has
    /// finished.
    ///
    /// Must not be called from inside a rebuild hook.
    pub fn stop(&self) {
        let mut state = self.lock_watch_state();
        state.stop_requested = true;
        self.watch_changed.notify_all();
        while state.active {
            state = self
                .watch_changed
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn lock_watch_state(&self) -> MutexGuard<'_, WatchState> {
        self.watch_state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether a filesystem event for `path` should schedule a rebuild.
    pub fn is_relevant(&self, path: &Path) -> bool {
        self.inner.is_relevant(path)
    }
}

impl Inner {
    fn update_documentation(&self) -> Result<RebuildSummary> {
        let _guard = self
            .rebuild_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let started = Instant::now();
        let config = &self.config;
        log::info!(
            "Updating documentation for: {}",
            config.watch_path().display()
        );

        // Ignore files are re-read on every pass.
        let filter = PathFilter::load(config);
        let outcome = gather::gather_files(config.watch_path(), &filter)?;
        *self.filter.write().unwrap_or_else(PoisonError::into_inner) = filter;

        let documents = render::render(
            &outcome.files,
            config.split_by_extension(),
            config.output_file(),
            Utc::now(),
        );
        render::write_documents(&documents)?;
        if config.split_by_extension() {
            render::remove_stale_split_documents(config.output_file(), &documents)?;
        }

        let summary = RebuildSummary {
            files_rendered: outcome.files.len(),
            files_skipped: outcome.skipped.len(),
            documents: documents.into_keys().collect(),
            elapsed: started.elapsed(),
        };
        log::info!(
            "Rebuild complete: {} files, {} skipped, {} documents in {:?}",
            summary.files_rendered,
            summary.files_skipped,
            summary.documents.len(),
            summary.elapsed
        );
        Ok(summary)
    }

    fn is_relevant(&self, path: &Path) -> bool {
        let Ok(relative_path) = path.strip_prefix(self.config.watch_path()) else {
            return false;
        };
        if relative_path.as_os_str().is_empty() {
            return false;
        }
        if relative_path == Path::new(GITIGNORE_FILENAME)
            || relative_path == Path::new(DOCIGNORE_FILENAME)
        {
            return true;
        }

        let filter = self.filter.read().unwrap_or_else(PoisonError::into_inner);
        let is_dir = path.is_dir();
        if filter.is_ignored(relative_path, is_dir) {
            return false;
        }
        if is_dir {
            return true;
        }
        let extension = relative_path
            .file_name()
            .map(|name| language::extension_of(&name.to_string_lossy()))
            .unwrap_or_default();
        // No extension: possibly a directory that was just removed or renamed.
        extension.is_empty() || filter.is_extension_allowed(&extension)
    }
}

fn log_rebuild(result: &Result<RebuildSummary>) {
    match result {
        Ok(summary) => log::info!(
            "Documentation rebuilt ({} files, {} documents).",
            summary.files_rendered,
            summary.documents.len()
        ),
        Err(e) => log::error!("Rebuild failed: {}", e),
    }
}
