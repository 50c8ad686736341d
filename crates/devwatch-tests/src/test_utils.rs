//! Shared fixtures for devwatch tests
//!
//! Fake devices with observable hooks, a pluggable observer, an event
//! recorder and helpers for configuration files.

use async_trait::async_trait;
use devwatch_presence::{DeviceEvent, DeviceEventKind, PresenceReconciler};
use devwatch_types::{
    DeviceCatalog, DeviceId, DeviceObserver, Error, PhysicalDevice, RecognitionRule, Result,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Install a test-friendly `tracing` subscriber, once per process
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// Counters shared by every clone of a [`FakeDevice`]
#[derive(Debug, Default)]
pub struct HookCounters {
    connects: AtomicUsize,
    disconnects: AtomicUsize,
}

impl HookCounters {
    /// Connect hook invocations
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Disconnect hook invocations
    pub fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }
}

/// Device whose hooks are counted and can be made to fail
#[derive(Debug, Clone)]
pub struct FakeDevice {
    id: DeviceId,
    mount_path: Option<PathBuf>,
    fail_connect: bool,
    fail_disconnect: bool,
    counters: Arc<HookCounters>,
}

impl FakeDevice {
    /// Create a device with working hooks
    pub fn new(id: impl Into<DeviceId>) -> Self {
        Self {
            id: id.into(),
            mount_path: None,
            fail_connect: false,
            fail_disconnect: false,
            counters: Arc::new(HookCounters::default()),
        }
    }

    /// Set the mount path
    pub fn mounted_at(mut self, path: impl Into<PathBuf>) -> Self {
        self.mount_path = Some(path.into());
        self
    }

    /// Make the connect hook fail
    pub fn failing_connect(mut self) -> Self {
        self.fail_connect = true;
        self
    }

    /// Make the disconnect hook fail
    pub fn failing_disconnect(mut self) -> Self {
        self.fail_disconnect = true;
        self
    }

    /// Hook counters of this device and all its clones
    pub fn counters(&self) -> Arc<HookCounters> {
        Arc::clone(&self.counters)
    }
}

impl PhysicalDevice for FakeDevice {
    fn device_id(&self) -> &DeviceId {
        &self.id
    }

    fn mount_path(&self) -> Option<&Path> {
        self.mount_path.as_deref()
    }

    fn friendly_name(&self) -> Option<&str> {
        None
    }

    fn connect(&self) -> Result<()> {
        self.counters.connects.fetch_add(1, Ordering::SeqCst);
        if self.fail_connect {
            return Err(Error::device_hook(&self.id, "connect refused"));
        }
        Ok(())
    }

    fn disconnect(&self) -> Result<()> {
        self.counters.disconnects.fetch_add(1, Ordering::SeqCst);
        if self.fail_disconnect {
            return Err(Error::device_hook(&self.id, "eject failed"));
        }
        Ok(())
    }
}

/// Observer whose attached devices are plugged and unplugged by the test
#[derive(Debug, Clone, Default)]
pub struct PluggableObserver {
    attached: Arc<Mutex<Vec<FakeDevice>>>,
    failure: Arc<Mutex<Option<String>>>,
}

impl PluggableObserver {
    /// Create an observer with nothing attached
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a device
    pub fn plug(&self, device: FakeDevice) {
        self.attached.lock().unwrap().push(device);
    }

    /// Detach every device with the given identifier
    pub fn unplug(&self, id: &str) {
        self.attached
            .lock()
            .unwrap()
            .retain(|device| device.device_id().as_str() != id);
    }

    /// Make the next snapshot fail with an observer error
    pub fn fail_next(&self, message: impl Into<String>) {
        *self.failure.lock().unwrap() = Some(message.into());
    }
}

#[async_trait]
impl DeviceObserver for PluggableObserver {
    type Device = FakeDevice;

    async fn snapshot(&self) -> Result<Vec<FakeDevice>> {
        if let Some(message) = self.failure.lock().unwrap().take() {
            return Err(Error::observer(message));
        }
        Ok(self.attached.lock().unwrap().clone())
    }
}

/// One delivered notification, reduced to what tests compare
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedEvent {
    /// Connected or disconnected
    pub kind: DeviceEventKind,
    /// Identifier of the device
    pub device_id: String,
    /// Name of the recognizing rule
    pub name: String,
}

impl RecordedEvent {
    /// Expected connect notification
    pub fn connected(device_id: &str, name: &str) -> Self {
        Self {
            kind: DeviceEventKind::Connected,
            device_id: device_id.to_string(),
            name: name.to_string(),
        }
    }

    /// Expected disconnect notification
    pub fn disconnected(device_id: &str, name: &str) -> Self {
        Self {
            kind: DeviceEventKind::Disconnected,
            device_id: device_id.to_string(),
            name: name.to_string(),
        }
    }
}

/// Notifications recorded from a reconciler, in delivery order
#[derive(Debug, Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<RecordedEvent>>>);

impl EventLog {
    /// Subscribe a new log to every notification of `reconciler`
    pub fn attach<D>(reconciler: &mut PresenceReconciler<D>) -> Self
    where
        D: PhysicalDevice + Clone + 'static,
    {
        let log = Self::default();
        let sink = Arc::clone(&log.0);
        reconciler.subscribe(move |event: &DeviceEvent<D>| {
            sink.lock().unwrap().push(RecordedEvent {
                kind: event.kind,
                device_id: event.device_id().to_string(),
                name: event.recognized.name().to_string(),
            });
        });
        log
    }

    /// Remove and return everything recorded so far
    pub fn take(&self) -> Vec<RecordedEvent> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }
}

/// Catalog built from `(pattern, name)` pairs in order
pub fn catalog(rules: &[(&str, &str)]) -> DeviceCatalog {
    rules
        .iter()
        .map(|(pattern, name)| RecognitionRule::new(*pattern, *name))
        .collect()
}

/// Write a configuration file into `dir` and return its path
pub fn write_config(dir: &TempDir, file_name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(file_name);
    std::fs::write(&path, contents).unwrap();
    path
}
