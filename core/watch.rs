use crate::debounce::Debouncer;
use crate::error::{AppError, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::Path;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TrySendError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

// Dirty signals carry no payload, so a short queue is enough to hold "something
// changed" while a rebuild runs.
const SIGNAL_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Signal {
    Dirty,
    Stop,
}

/// Watches a directory tree and calls `on_change` once per debounced burst of
/// relevant filesystem events.
///
/// `on_change` always runs on the coordinator's single worker thread, so two
/// invocations never overlap. Events that arrive while it runs are queued and
/// start the next debounce cycle.
pub struct WatchCoordinator {
    watcher: Option<RecommendedWatcher>,
    signals: SyncSender<Signal>,
    worker: Option<JoinHandle<()>>,
}

impl WatchCoordinator {
    /// Subscribes to `root` recursively and spawns the worker thread.
    ///
    /// Fails if the platform watcher cannot be created or cannot watch `root`
    /// (missing path, exhausted watch limit).
    pub fn start<R, F>(
        root: &Path,
        delay: Duration,
        max_window: Duration,
        relevance: R,
        on_change: F,
    ) -> Result<Self>
    where
        R: Fn(&Path) -> bool + Send + 'static,
        F: FnMut() + Send + 'static,
    {
        let (tx, rx) = mpsc::sync_channel(SIGNAL_CAPACITY);

        let event_tx = tx.clone();
        let mut watcher =
            notify::recommended_watcher(move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if matches!(event.kind, EventKind::Access(_)) {
                        return;
                    }
                    if let Some(path) = event.paths.iter().find(|p| relevance(p)) {
                        log::debug!("Change detected ({:?}): {}", event.kind, path.display());
                        push_dirty(&event_tx);
                    } else {
                        log::trace!("Ignoring event: {:?}", event);
                    }
                }
                Err(e) => {
                    log::warn!("Watch error: {}", e);
                }
            })
            .map_err(|e| AppError::Watch(format!("Failed to create watcher: {}", e)))?;

        watcher
            .watch(root, RecursiveMode::Recursive)
            .map_err(|e| AppError::Watch(format!("Failed to watch {}: {}", root.display(), e)))?;
        log::info!("Watching {} for changes", root.display());

        let debouncer = Debouncer::new(delay, max_window);
        let worker = thread::Builder::new()
            .name("autumn-rebuild".to_string())
            .spawn(move || run_worker(rx, debouncer, on_change))
            .map_err(AppError::Io)?;

        Ok(Self {
            watcher: Some(watcher),
            signals: tx,
            worker: Some(worker),
        })
    }

    /// Marks the tree dirty as if a relevant event had arrived.
    pub fn notify_change(&self) {
        push_dirty(&self.signals);
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Drops the subscription and waits for the worker to exit. A rebuild that
    /// is already running completes first; a burst still being debounced is
    /// discarded.
    ///
    /// Must not be called from inside `on_change`.
    pub fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        drop(self.watcher.take());
        if self.signals.send(Signal::Stop).is_err() {
            log::trace!("Watch worker already gone.");
        }
        if worker.join().is_err() {
            log::error!("Watch worker panicked.");
        }
        log::info!("Watch stopped.");
    }
}

impl Drop for WatchCoordinator {
    fn drop(&mut self) {
        self.stop();
    }
}

fn push_dirty(tx: &SyncSender<Signal>) {
    match tx.try_send(Signal::Dirty) {
        // A full queue already holds a pending signal.
        Ok(()) | Err(TrySendError::Full(_)) => {}
        Err(TrySendError::Disconnected(_)) => {
            log::trace!("Watch worker gone, dropping change signal.");
        }
    }
}

fn run_worker<F: FnMut()>(rx: Receiver<Signal>, mut debouncer: Debouncer, mut on_change: F) {
    loop {
        let signal = match debouncer.deadline() {
            None => match rx.recv() {
                Ok(signal) => Some(signal),
                Err(_) => break,
            },
            Some(deadline) => {
                let timeout = deadline.saturating_duration_since(Instant::now());
                match rx.recv_timeout(timeout) {
                    Ok(signal) => Some(signal),
                    Err(RecvTimeoutError::Timeout) => None,
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
        };

        match signal {
            Some(Signal::Dirty) => debouncer.record(Instant::now()),
            Some(Signal::Stop) => break,
            None => {}
        }

        if debouncer.fire_if_due(Instant::now()) {
            log::debug!("Debounce window elapsed, triggering rebuild.");
            on_change();
        }
    }
    log::debug!("Watch worker exiting.");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    fn counter() -> (Arc<AtomicUsize>, impl FnMut() + Send + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let inner = count.clone();
        (count, move || {
            inner.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn burst_of_signals_triggers_one_rebuild() {
        let dir = tempdir().unwrap();
        let (count, on_change) = counter();
        let mut coordinator = WatchCoordinator::start(
            dir.path(),
            Duration::from_millis(300),
            Duration::from_secs(2),
            |_| false,
            on_change,
        )
        .unwrap();

        for _ in 0..5 {
            coordinator.notify_change();
            thread::sleep(Duration::from_millis(40));
        }
        thread::sleep(Duration::from_millis(700));
        coordinator.stop();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn filesystem_events_reach_the_callback() {
        let dir = tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let (count, on_change) = counter();
        let mut coordinator = WatchCoordinator::start(
            &root,
            Duration::from_millis(100),
            Duration::from_secs(1),
            |p| p.extension().is_some_and(|e| e == "py"),
            on_change,
        )
        .unwrap();

        fs::write(root.join("a.py"), "print(1)").unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        while count.load(Ordering::SeqCst) == 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(50));
        }
        coordinator.stop();
        assert!(count.load(Ordering::SeqCst) >= 1);
    }

    #[test]
    fn missing_root_fails_to_start() {
        let dir = tempdir().unwrap();
        let (_count, on_change) = counter();
        let result = WatchCoordinator::start(
            &dir.path().join("missing"),
            Duration::from_millis(100),
            Duration::from_secs(1),
            |_| true,
            on_change,
        );
        assert!(matches!(result, Err(AppError::Watch(_))));
    }

    #[test]
    fn stop_is_idempotent() {
        let dir = tempdir().unwrap();
        let (_count, on_change) = counter();
        let mut coordinator = WatchCoordinator::start(
            dir.path(),
            Duration::from_millis(100),
            Duration::from_secs(1),
            |_| true,
            on_change,
        )
        .unwrap();
        assert!(coordinator.is_running());
        coordinator.stop();
        coordinator.stop();
        assert!(!coordinator.is_running());
    }
}
