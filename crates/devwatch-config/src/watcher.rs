//! Configuration file watcher for hot-reload functionality
//!
//! The watcher doubles as a [`CatalogProvider`]: a monitor holding it picks up
//! catalog edits on its next tick without being restarted.

use crate::loader::not_found;
use crate::{Config, ConfigError, ConfigLoader, ConfigResult};
use devwatch_types::{CatalogProvider, DeviceCatalog};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};

#[derive(Debug)]
struct Loaded {
    config: Config,
    catalog: Option<Arc<DeviceCatalog>>,
    modified: SystemTime,
}

impl Loaded {
    fn read(path: &Path) -> ConfigResult<Self> {
        let config = ConfigLoader::load_from_file(path)?;
        let modified = modified_time(path)?;
        let catalog = config.catalog().map(Arc::new);
        Ok(Self {
            config,
            catalog,
            modified,
        })
    }
}

/// Configuration file watcher for hot-reload functionality
#[derive(Debug)]
pub struct ConfigWatcher {
    config_path: PathBuf,
    state: Arc<Mutex<Loaded>>,
    poll_interval: Duration,
    running: Arc<AtomicBool>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl ConfigWatcher {
    /// Create a new watcher, loading the file once
    pub fn new<P: AsRef<Path>>(config_path: P) -> ConfigResult<Self> {
        let config_path = config_path.as_ref().to_path_buf();

        if !config_path.exists() {
            return Err(not_found(&config_path));
        }

        let loaded = Loaded::read(&config_path)?;

        Ok(Self {
            config_path,
            state: Arc::new(Mutex::new(loaded)),
            poll_interval: Duration::from_secs(1),
            running: Arc::new(AtomicBool::new(false)),
            worker: Mutex::new(None),
        })
    }

    /// Set the polling interval for checking file changes
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Path of the watched file
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Get the current configuration
    pub fn get_config(&self) -> Config {
        lock(&self.state).config.clone()
    }

    /// Start watching for configuration changes on a background thread
    pub fn start_watching(&self) -> ConfigResult<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(ConfigError::watcher("Watcher is already running"));
        }

        let config_path = self.config_path.clone();
        let state = Arc::clone(&self.state);
        let poll_interval = self.poll_interval;
        let running = Arc::clone(&self.running);

        let worker = thread::Builder::new()
            .name("devwatch-config-watcher".to_string())
            .spawn(move || {
                debug!(path = %config_path.display(), "Config watcher started");
                while running.load(Ordering::SeqCst) {
                    if let Err(e) = check_and_reload(&config_path, &state) {
                        warn!(error = %e, "Config watcher error");
                    }
                    thread::sleep(poll_interval);
                }
                debug!(path = %config_path.display(), "Config watcher stopped");
            })
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                ConfigError::watcher(format!("Failed to spawn watcher thread: {}", e))
            })?;

        *self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(worker);
        Ok(())
    }

    /// Stop watching for configuration changes
    ///
    /// Blocks until the background thread has exited, at most one poll
    /// interval.
    pub fn stop_watching(&self) {
        let worker = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.running.store(false, Ordering::SeqCst);

        if let Some(worker) = worker {
            if worker.join().is_err() {
                warn!(path = %self.config_path.display(), "Config watcher thread panicked");
            }
        }
    }

    /// Check if the watcher is currently running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Reload the configuration now, regardless of the modification time
    ///
    /// On error the previous configuration stays in effect.
    pub fn reload(&self) -> ConfigResult<()> {
        let loaded = Loaded::read(&self.config_path)?;
        *lock(&self.state) = loaded;
        info!(path = %self.config_path.display(), "Configuration reloaded");
        Ok(())
    }

    /// Handle serving the watched catalog, for use by a monitor
    ///
    /// The handle stays valid after the watcher is dropped and then keeps
    /// serving the last loaded catalog.
    pub fn catalog_provider(&self) -> WatchedCatalog {
        WatchedCatalog {
            state: Arc::clone(&self.state),
        }
    }
}

impl CatalogProvider for ConfigWatcher {
    fn current_catalog(&self) -> Option<Arc<DeviceCatalog>> {
        lock(&self.state).catalog.clone()
    }
}

/// Shared view of the catalog loaded by a [`ConfigWatcher`]
#[derive(Debug, Clone)]
pub struct WatchedCatalog {
    state: Arc<Mutex<Loaded>>,
}

impl CatalogProvider for WatchedCatalog {
    fn current_catalog(&self) -> Option<Arc<DeviceCatalog>> {
        lock(&self.state).catalog.clone()
    }
}

impl Drop for ConfigWatcher {
    fn drop(&mut self) {
        self.stop_watching();
    }
}

fn lock(state: &Mutex<Loaded>) -> MutexGuard<'_, Loaded> {
    // Every write replaces the whole state, so a poisoned guard still holds a
    // consistent value.
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn check_and_reload(config_path: &Path, state: &Mutex<Loaded>) -> ConfigResult<()> {
    if !config_path.exists() {
        // Deleted file: keep the current configuration
        return Ok(());
    }

    let current_modified = modified_time(config_path)?;
    if current_modified <= lock(state).modified {
        return Ok(());
    }

    match Loaded::read(config_path) {
        Ok(loaded) => {
            *lock(state) = loaded;
            info!(path = %config_path.display(), "Configuration reloaded");
        }
        Err(e) => {
            // Remember the broken revision so it is not re-parsed every poll.
            lock(state).modified = current_modified;
            warn!(path = %config_path.display(), error = %e, "Failed to reload configuration");
        }
    }

    Ok(())
}

fn modified_time(path: &Path) -> ConfigResult<SystemTime> {
    std::fs::metadata(path)
        .and_then(|metadata| metadata.modified())
        .map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })
}

/// Configuration watcher builder for more flexible configuration
#[derive(Debug)]
pub struct ConfigWatcherBuilder {
    config_path: Option<PathBuf>,
    poll_interval: Duration,
    auto_start: bool,
}

impl ConfigWatcherBuilder {
    /// Create a new configuration watcher builder
    pub fn new() -> Self {
        Self {
            config_path: None,
            poll_interval: Duration::from_secs(1),
            auto_start: false,
        }
    }

    /// Set the configuration file path
    pub fn config_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set the polling interval
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Enable auto-start of the watcher
    pub fn auto_start(mut self, auto_start: bool) -> Self {
        self.auto_start = auto_start;
        self
    }

    /// Build the configuration watcher
    pub fn build(self) -> ConfigResult<ConfigWatcher> {
        let config_path = self
            .config_path
            .ok_or_else(|| ConfigError::validation("Configuration path is required"))?;

        let watcher = ConfigWatcher::new(config_path)?.poll_interval(self.poll_interval);

        if self.auto_start {
            watcher.start_watching()?;
        }

        Ok(watcher)
    }
}

impl Default for ConfigWatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}
