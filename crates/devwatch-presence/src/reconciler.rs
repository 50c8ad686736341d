//! Presence reconciliation
//!
//! [`PresenceReconciler`] keeps the set of recognized devices believed to be
//! attached. Each call to [`synchronize`](PresenceReconciler::synchronize)
//! receives a complete snapshot of attached devices and derives the
//! transitions since the previous call:
//!
//! 1. every tracked device missing from the snapshot is removed, its
//!    disconnect hook runs and a disconnected event is raised;
//! 2. every untracked device in the snapshot is matched against the catalog;
//!    recognized ones get their connect hook run, are tracked and a connected
//!    event is raised. Unrecognized ones are skipped and looked at again on the
//!    next call.
//!
//! All disconnects of a call are raised before any connect of the same call.

use crate::events::{DeviceEvent, DeviceEventKind, EventBus, SubscriptionId};
use chrono::{DateTime, Utc};
use devwatch_types::{
    DeviceCatalog, DeviceId, Error, PhysicalDevice, RecognizedDevice, ReconcilerStats, Result,
};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

/// A device currently tracked as connected
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConnectedDevice<D> {
    /// The device as observed when it connected
    pub device: D,
    /// Recognition result captured when it connected
    pub recognized: RecognizedDevice,
    /// When it connected
    pub connected_at: DateTime<Utc>,
}

/// Tracks recognized devices across snapshots and raises presence events
///
/// `synchronize` takes `&mut self`; callers sharing a reconciler across tasks
/// must serialize access, e.g. behind a `tokio::sync::Mutex`.
#[derive(Debug)]
pub struct PresenceReconciler<D> {
    connected: BTreeMap<DeviceId, ConnectedDevice<D>>,
    catalog: Option<Arc<DeviceCatalog>>,
    events: EventBus<D>,
    stats: ReconcilerStats,
}

impl<D: PhysicalDevice + Clone> PresenceReconciler<D> {
    /// Create a reconciler with no catalog and no connected devices
    pub fn new() -> Self {
        Self {
            connected: BTreeMap::new(),
            catalog: None,
            events: EventBus::new(),
            stats: ReconcilerStats::default(),
        }
    }

    /// Create a reconciler recognizing devices against `catalog`
    pub fn with_catalog(catalog: impl Into<Arc<DeviceCatalog>>) -> Self {
        let mut reconciler = Self::new();
        reconciler.set_catalog(catalog);
        reconciler
    }

    /// Replace the catalog used by subsequent synchronizations
    ///
    /// Devices already connected keep the recognition result they connected with.
    pub fn set_catalog(&mut self, catalog: impl Into<Arc<DeviceCatalog>>) {
        let catalog = catalog.into();
        for pattern in catalog.duplicate_patterns() {
            warn!(
                pattern,
                "Device catalog declares the same pattern more than once; the first rule wins"
            );
        }
        info!(rules = catalog.len(), "Device catalog installed");
        self.catalog = Some(catalog);
    }

    /// Remove the catalog; synchronizing without one is a configuration error
    pub fn clear_catalog(&mut self) {
        if self.catalog.take().is_some() {
            warn!("Device catalog removed");
        }
    }

    /// The catalog currently in use
    pub fn catalog(&self) -> Option<&Arc<DeviceCatalog>> {
        self.catalog.as_ref()
    }

    /// Reconcile tracked devices against a complete snapshot
    ///
    /// Fails with [`Error::Config`] before touching any state if no catalog is
    /// set. A failing hook does not stop the pass: both phases run to the end
    /// and the first hook error is returned afterwards. A failed connect
    /// leaves the device untracked, a failed disconnect still removes the
    /// device and raises its event.
    pub fn synchronize(&mut self, observed: &[D]) -> Result<()> {
        let catalog = self
            .catalog
            .clone()
            .ok_or_else(|| Error::config("no device catalog configured"))?;

        trace!(
            observed = observed.len(),
            connected = self.connected.len(),
            "Synchronizing device presence"
        );

        let mut failures = Vec::new();
        self.detect_disconnected(observed, &mut failures);
        let unrecognized = self.detect_connected(&catalog, observed, &mut failures);

        self.stats.synchronizations += 1;
        self.stats.unrecognized = unrecognized;
        self.stats.last_synchronized = Some(Utc::now());

        match failures.into_iter().next() {
            Some(first) => Err(first),
            None => Ok(()),
        }
    }

    /// Phase 1: drop tracked devices that are no longer observed
    fn detect_disconnected(&mut self, observed: &[D], failures: &mut Vec<Error>) {
        let observed_ids: HashSet<&DeviceId> = observed.iter().map(|d| d.device_id()).collect();
        let tracked: Vec<DeviceId> = self.connected.keys().cloned().collect();

        for id in tracked {
            if observed_ids.contains(&id) {
                continue;
            }
            let Some(entry) = self.connected.remove(&id) else {
                continue;
            };
            self.stats.disconnects += 1;

            let hook = entry.device.disconnect();
            debug!(
                device_id = %id,
                name = entry.recognized.name(),
                "Device disconnected"
            );
            self.events
                .publish(DeviceEventKind::Disconnected, &entry.device, &entry.recognized);

            if let Err(e) = hook {
                warn!(device_id = %id, error = %e, "Disconnect hook failed");
                failures.push(e);
            }
        }
    }

    /// Phase 2: track newly observed devices the catalog recognizes
    ///
    /// Returns the number of distinct unrecognized devices.
    fn detect_connected(
        &mut self,
        catalog: &DeviceCatalog,
        observed: &[D],
        failures: &mut Vec<Error>,
    ) -> u64 {
        let mut refused: HashSet<&DeviceId> = HashSet::new();
        let mut unrecognized: HashSet<&DeviceId> = HashSet::new();

        for device in observed {
            let id = device.device_id();
            if self.connected.contains_key(id) || refused.contains(id) {
                continue;
            }

            let Some(recognized) = catalog.recognize(id) else {
                if unrecognized.insert(id) {
                    trace!(device_id = %id, "Skipping unrecognized device");
                }
                continue;
            };

            if let Err(e) = device.connect() {
                warn!(device_id = %id, error = %e, "Connect hook failed");
                refused.insert(id);
                failures.push(e);
                continue;
            }

            debug!(
                device_id = %id,
                name = recognized.name(),
                kind = %recognized.kind(),
                mount_path = ?device.mount_path(),
                "Device connected"
            );
            let entry = ConnectedDevice {
                device: device.clone(),
                recognized,
                connected_at: Utc::now(),
            };
            self.events
                .publish(DeviceEventKind::Connected, &entry.device, &entry.recognized);
            self.connected.insert(id.clone(), entry);
            self.stats.connects += 1;
        }

        unrecognized.len() as u64
    }

    /// Read-only view of the tracked devices, ordered by identifier
    pub fn connected_devices(&self) -> &BTreeMap<DeviceId, ConnectedDevice<D>> {
        &self.connected
    }

    /// Look up a tracked device
    pub fn connected_device<Q>(&self, id: &Q) -> Option<&ConnectedDevice<D>>
    where
        DeviceId: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.connected.get(id)
    }

    /// Check whether a device is tracked as connected
    pub fn is_connected<Q>(&self, id: &Q) -> bool
    where
        DeviceId: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.connected.contains_key(id)
    }

    /// Number of tracked devices
    pub fn connected_count(&self) -> usize {
        self.connected.len()
    }

    /// Reconciliation statistics
    pub fn stats(&self) -> &ReconcilerStats {
        &self.stats
    }

    /// Subscribe to every presence event
    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: Fn(&DeviceEvent<D>) + Send + Sync + 'static,
    {
        self.events.subscribe(listener)
    }

    /// Subscribe to connect events
    pub fn on_connected<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: Fn(&DeviceEvent<D>) + Send + Sync + 'static,
    {
        self.events.on_connected(listener)
    }

    /// Subscribe to disconnect events
    pub fn on_disconnected<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: Fn(&DeviceEvent<D>) + Send + Sync + 'static,
    {
        self.events.on_disconnected(listener)
    }

    /// Remove a subscription
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }
}

impl<D: PhysicalDevice + Clone> Default for PresenceReconciler<D> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devwatch_types::{DeviceInfo, ErrorKind, RecognitionRule};
    use proptest::prelude::*;
    use rstest::rstest;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    type Log = Arc<Mutex<Vec<(DeviceEventKind, String, String)>>>;

    fn catalog(rules: &[(&str, &str)]) -> DeviceCatalog {
        rules
            .iter()
            .map(|(pattern, name)| RecognitionRule::new(*pattern, *name))
            .collect()
    }

    fn recording<D: PhysicalDevice + Clone + 'static>(reconciler: &mut PresenceReconciler<D>) -> Log {
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        reconciler.subscribe(move |event| {
            sink.lock().unwrap().push((
                event.kind,
                event.device_id().to_string(),
                event.recognized.name().to_string(),
            ));
        });
        log
    }

    fn devices(ids: &[&str]) -> Vec<DeviceInfo> {
        ids.iter().map(|id| DeviceInfo::new(*id)).collect()
    }

    #[test]
    fn test_three_tick_scenario() {
        let mut reconciler: PresenceReconciler<DeviceInfo> =
            PresenceReconciler::with_catalog(catalog(&[("IPOD1", "Classic")]));
        let log = recording(&mut reconciler);

        reconciler.synchronize(&[]).unwrap();
        assert_eq!(reconciler.connected_count(), 0);
        assert!(log.lock().unwrap().is_empty());

        reconciler.synchronize(&devices(&["IPOD1"])).unwrap();
        assert!(reconciler.is_connected("IPOD1"));
        assert_eq!(
            reconciler.connected_device("IPOD1").unwrap().recognized.name(),
            "Classic"
        );

        reconciler.synchronize(&[]).unwrap();
        assert_eq!(reconciler.connected_count(), 0);

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                (DeviceEventKind::Connected, "IPOD1".to_string(), "Classic".to_string()),
                (DeviceEventKind::Disconnected, "IPOD1".to_string(), "Classic".to_string()),
            ]
        );
    }

    #[test]
    fn test_missing_catalog_fails_fast() {
        let mut reconciler: PresenceReconciler<DeviceInfo> = PresenceReconciler::new();
        let log = recording(&mut reconciler);

        let err = reconciler.synchronize(&devices(&["IPOD1"])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
        assert_eq!(reconciler.connected_count(), 0);
        assert_eq!(reconciler.stats().synchronizations, 0);
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_empty_catalog_recognizes_nothing() {
        let mut reconciler = PresenceReconciler::with_catalog(DeviceCatalog::default());
        reconciler.synchronize(&devices(&["IPOD1", "X001"])).unwrap();

        assert_eq!(reconciler.connected_count(), 0);
        assert_eq!(reconciler.stats().unrecognized, 2);
    }

    #[test]
    fn test_cleared_catalog_is_a_configuration_error() {
        let mut reconciler = PresenceReconciler::with_catalog(catalog(&[("IPOD1", "Classic")]));
        reconciler.synchronize(&devices(&["IPOD1"])).unwrap();

        reconciler.clear_catalog();
        assert!(reconciler.catalog().is_none());
        let err = reconciler.synchronize(&[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
        assert!(reconciler.is_connected("IPOD1"));
    }

    #[test]
    fn test_second_identical_snapshot_is_silent() {
        let mut reconciler =
            PresenceReconciler::with_catalog(catalog(&[("A", "Alpha"), ("B", "Beta")]));
        let snapshot = devices(&["A", "B", "UNKNOWN"]);

        reconciler.synchronize(&snapshot).unwrap();
        let log = recording(&mut reconciler);
        let before: Vec<_> = reconciler.connected_devices().keys().cloned().collect();

        reconciler.synchronize(&snapshot).unwrap();

        assert!(log.lock().unwrap().is_empty());
        let after: Vec<_> = reconciler.connected_devices().keys().cloned().collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_disconnects_precede_connects() {
        let mut reconciler =
            PresenceReconciler::with_catalog(catalog(&[("A", "Alpha"), ("B", "Beta")]));
        reconciler.synchronize(&devices(&["A"])).unwrap();
        let log = recording(&mut reconciler);

        reconciler.synchronize(&devices(&["B"])).unwrap();

        let kinds: Vec<_> = log.lock().unwrap().iter().map(|(k, id, _)| (*k, id.clone())).collect();
        assert_eq!(
            kinds,
            vec![
                (DeviceEventKind::Disconnected, "A".to_string()),
                (DeviceEventKind::Connected, "B".to_string()),
            ]
        );
    }

    #[test]
    fn test_connect_order_follows_snapshot_order() {
        let mut reconciler = PresenceReconciler::with_catalog(catalog(&[
            ("A", "Alpha"),
            ("B", "Beta"),
            ("C", "Gamma"),
        ]));
        let log = recording(&mut reconciler);

        reconciler.synchronize(&devices(&["C", "A", "B"])).unwrap();

        let ids: Vec<_> = log.lock().unwrap().iter().map(|(_, id, _)| id.clone()).collect();
        assert_eq!(ids, vec!["C", "A", "B"]);
    }

    #[test]
    fn test_simultaneous_disconnects_fire_once_each() {
        let mut reconciler = PresenceReconciler::with_catalog(catalog(&[
            ("A", "Alpha"),
            ("B", "Beta"),
            ("C", "Gamma"),
        ]));
        reconciler.synchronize(&devices(&["A", "B", "C"])).unwrap();
        let log = recording(&mut reconciler);

        reconciler.synchronize(&devices(&["B"])).unwrap();

        let mut ids: Vec<_> = log.lock().unwrap().iter().map(|(_, id, _)| id.clone()).collect();
        ids.sort();
        assert_eq!(ids, vec!["A", "C"]);
        assert_eq!(reconciler.connected_count(), 1);
        assert_eq!(reconciler.stats().disconnects, 2);
    }

    #[test]
    fn test_first_rule_wins() {
        let mut reconciler =
            PresenceReconciler::with_catalog(catalog(&[("X001", "RuleA"), ("X001", "RuleB")]));
        reconciler.synchronize(&devices(&["X001"])).unwrap();

        let entry = reconciler.connected_device("X001").unwrap();
        assert_eq!(entry.recognized.name(), "RuleA");
        assert_eq!(entry.recognized.catalog_index, 0);
    }

    #[test]
    fn test_remount_keeps_identity() {
        let mut reconciler = PresenceReconciler::with_catalog(catalog(&[("ABC", "Player")]));
        reconciler
            .synchronize(&[DeviceInfo::new("ABC").with_mount_path("/media/p1")])
            .unwrap();
        let log = recording(&mut reconciler);

        reconciler
            .synchronize(&[DeviceInfo::new("ABC").with_mount_path("/media/p2")])
            .unwrap();

        assert!(log.lock().unwrap().is_empty());
        assert_eq!(reconciler.connected_count(), 1);
        let entry = reconciler.connected_device("ABC").unwrap();
        assert_eq!(entry.device.mount_path(), Some(Path::new("/media/p1")));
    }

    #[test]
    fn test_duplicate_ids_in_snapshot_connect_once() {
        let mut reconciler = PresenceReconciler::with_catalog(catalog(&[("A", "Alpha")]));
        let log = recording(&mut reconciler);

        reconciler
            .synchronize(&[
                DeviceInfo::new("A").with_mount_path("/first"),
                DeviceInfo::new("A").with_mount_path("/second"),
            ])
            .unwrap();

        assert_eq!(log.lock().unwrap().len(), 1);
        let entry = reconciler.connected_device("A").unwrap();
        assert_eq!(entry.device.mount_path(), Some(Path::new("/first")));
    }

    #[test]
    fn test_catalog_swap_reports_stored_rule_on_disconnect() {
        let mut reconciler = PresenceReconciler::with_catalog(catalog(&[("IPOD1", "Classic")]));
        reconciler.synchronize(&devices(&["IPOD1"])).unwrap();
        let log = recording(&mut reconciler);

        reconciler.set_catalog(catalog(&[("OTHER", "Other")]));
        reconciler.synchronize(&[]).unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec![(DeviceEventKind::Disconnected, "IPOD1".to_string(), "Classic".to_string())]
        );
    }

    #[test]
    fn test_unrecognized_device_matches_after_catalog_update() {
        let mut reconciler = PresenceReconciler::with_catalog(catalog(&[("A", "Alpha")]));
        let snapshot = devices(&["NEW"]);

        reconciler.synchronize(&snapshot).unwrap();
        assert!(!reconciler.is_connected("NEW"));
        assert_eq!(reconciler.stats().unrecognized, 1);

        reconciler.set_catalog(catalog(&[("A", "Alpha"), ("NEW", "Newcomer")]));
        reconciler.synchronize(&snapshot).unwrap();
        assert!(reconciler.is_connected("NEW"));
        assert_eq!(reconciler.stats().unrecognized, 0);
    }

    #[test]
    fn test_state_mutates_without_subscribers() {
        let mut reconciler = PresenceReconciler::with_catalog(catalog(&[("A", "Alpha")]));
        reconciler.synchronize(&devices(&["A"])).unwrap();
        assert!(reconciler.is_connected("A"));
        reconciler.synchronize(&[]).unwrap();
        assert!(!reconciler.is_connected("A"));

        let stats = reconciler.stats();
        assert_eq!(stats.synchronizations, 2);
        assert_eq!(stats.connects, 1);
        assert_eq!(stats.disconnects, 1);
        assert!(stats.last_synchronized.is_some());
    }

    #[test]
    fn test_unsubscribed_listener_is_not_called() {
        let mut reconciler = PresenceReconciler::with_catalog(catalog(&[("A", "Alpha")]));
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let id = reconciler.on_connected(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(reconciler.unsubscribe(id));
        reconciler.synchronize(&devices(&["A"])).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    /// Device whose hooks count invocations and can be told to fail
    #[derive(Debug, Clone)]
    struct HookedDevice {
        id: DeviceId,
        connects: Arc<AtomicUsize>,
        disconnects: Arc<AtomicUsize>,
        fail_connect: bool,
        fail_disconnect: bool,
    }

    impl HookedDevice {
        fn new(id: &str) -> Self {
            Self {
                id: DeviceId::from(id),
                connects: Arc::new(AtomicUsize::new(0)),
                disconnects: Arc::new(AtomicUsize::new(0)),
                fail_connect: false,
                fail_disconnect: false,
            }
        }
    }

    impl PhysicalDevice for HookedDevice {
        fn device_id(&self) -> &DeviceId {
            &self.id
        }

        fn mount_path(&self) -> Option<&Path> {
            None
        }

        fn friendly_name(&self) -> Option<&str> {
            None
        }

        fn connect(&self) -> Result<()> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            if self.fail_connect {
                return Err(Error::device_hook(&self.id, "mount refused"));
            }
            Ok(())
        }

        fn disconnect(&self) -> Result<()> {
            self.disconnects.fetch_add(1, Ordering::SeqCst);
            if self.fail_disconnect {
                return Err(Error::device_hook(&self.id, "eject failed"));
            }
            Ok(())
        }
    }

    #[test]
    fn test_hooks_run_once_per_transition() {
        let mut reconciler = PresenceReconciler::with_catalog(catalog(&[("A", "Alpha")]));
        let device = HookedDevice::new("A");

        for _ in 0..3 {
            reconciler.synchronize(std::slice::from_ref(&device)).unwrap();
        }
        reconciler.synchronize(&[]).unwrap();
        reconciler.synchronize(&[]).unwrap();

        assert_eq!(device.connects.load(Ordering::SeqCst), 1);
        assert_eq!(device.disconnects.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_connect_hook_leaves_device_untracked() {
        let mut reconciler = PresenceReconciler::with_catalog(catalog(&[("A", "Alpha")]));
        let log = recording(&mut reconciler);
        let mut device = HookedDevice::new("A");
        device.fail_connect = true;

        let err = reconciler
            .synchronize(std::slice::from_ref(&device))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DeviceHook);
        assert!(!reconciler.is_connected("A"));
        assert!(log.lock().unwrap().is_empty());

        device.fail_connect = false;
        reconciler.synchronize(std::slice::from_ref(&device)).unwrap();
        assert!(reconciler.is_connected("A"));
        assert_eq!(device.connects.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_failed_disconnect_hook_still_removes_and_notifies() {
        let mut reconciler = PresenceReconciler::with_catalog(catalog(&[("A", "Alpha")]));
        let mut device = HookedDevice::new("A");
        device.fail_disconnect = true;
        reconciler.synchronize(std::slice::from_ref(&device)).unwrap();
        let log = recording(&mut reconciler);

        let err = reconciler.synchronize(&[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DeviceHook);
        assert!(!reconciler.is_connected("A"));
        assert_eq!(log.lock().unwrap().len(), 1);

        reconciler.synchronize(&[]).unwrap();
        assert_eq!(device.disconnects.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_hook_failure_does_not_cut_the_pass_short() {
        let mut reconciler = PresenceReconciler::with_catalog(catalog(&[
            ("A", "Alpha"),
            ("B", "Beta"),
            ("C", "Gamma"),
        ]));
        let mut stuck = HookedDevice::new("A");
        stuck.fail_disconnect = true;
        let other = HookedDevice::new("B");
        reconciler.synchronize(&[stuck.clone(), other.clone()]).unwrap();
        let log = recording(&mut reconciler);

        let err = reconciler
            .synchronize(&[HookedDevice::new("C")])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DeviceHook);
        assert!(err.to_string().contains("eject failed"));

        let ids: Vec<_> = reconciler.connected_devices().keys().cloned().collect();
        assert_eq!(ids, vec![DeviceId::from("C")]);
        assert_eq!(other.disconnects.load(Ordering::SeqCst), 1);
        assert_eq!(
            *log.lock().unwrap(),
            vec![
                (DeviceEventKind::Disconnected, "A".to_string(), "Alpha".to_string()),
                (DeviceEventKind::Disconnected, "B".to_string(), "Beta".to_string()),
                (DeviceEventKind::Connected, "C".to_string(), "Gamma".to_string()),
            ]
        );
    }

    #[test]
    fn test_first_hook_error_is_returned() {
        let mut reconciler =
            PresenceReconciler::with_catalog(catalog(&[("A", "Alpha"), ("B", "Beta")]));
        let mut stuck = HookedDevice::new("A");
        stuck.fail_disconnect = true;
        reconciler.synchronize(std::slice::from_ref(&stuck)).unwrap();

        let mut refusing = HookedDevice::new("B");
        refusing.fail_connect = true;
        let err = reconciler
            .synchronize(&[refusing.clone(), refusing.clone()])
            .unwrap_err();

        assert!(err.to_string().contains("eject failed"));
        assert_eq!(reconciler.connected_count(), 0);
        assert_eq!(refusing.connects.load(Ordering::SeqCst), 1);
        assert_eq!(reconciler.stats().synchronizations, 2);
    }

    #[rstest]
    #[case(&[], &[], 0)]
    #[case(&["A"], &["A"], 1)]
    #[case(&["A", "Z"], &["A"], 1)]
    #[case(&["Z", "Y"], &[], 0)]
    #[case(&["B", "A", "Q"], &["A", "B"], 2)]
    fn test_connected_set_matches_recognized_snapshot(
        #[case] snapshot: &[&str],
        #[case] expected: &[&str],
        #[case] count: usize,
    ) {
        let mut reconciler =
            PresenceReconciler::with_catalog(catalog(&[("A", "Alpha"), ("B", "Beta")]));
        reconciler.synchronize(&devices(snapshot)).unwrap();

        let keys: Vec<_> = reconciler
            .connected_devices()
            .keys()
            .map(|id| id.as_str())
            .collect();
        assert_eq!(keys, expected);
        assert_eq!(reconciler.connected_count(), count);
    }

    proptest! {
        #[test]
        fn test_connected_keys_equal_recognized_observed(
            ticks in proptest::collection::vec(
                proptest::collection::vec(0u8..8, 0..6),
                1..8,
            )
        ) {
            // Even ids are in the catalog, odd ids are not.
            let rules: DeviceCatalog = (0u8..8)
                .step_by(2)
                .map(|n| RecognitionRule::new(format!("D{n}"), format!("Device {n}")))
                .collect();
            let mut reconciler = PresenceReconciler::with_catalog(rules);

            for tick in ticks {
                let snapshot: Vec<DeviceInfo> =
                    tick.iter().map(|n| DeviceInfo::new(format!("D{n}"))).collect();
                reconciler.synchronize(&snapshot).unwrap();

                let expected: std::collections::BTreeSet<String> = tick
                    .iter()
                    .filter(|n| *n % 2 == 0)
                    .map(|n| format!("D{n}"))
                    .collect();
                let actual: std::collections::BTreeSet<String> = reconciler
                    .connected_devices()
                    .keys()
                    .map(|id| id.to_string())
                    .collect();
                prop_assert_eq!(&actual, &expected);

                let log = recording(&mut reconciler);
                reconciler.synchronize(&snapshot).unwrap();
                prop_assert!(log.lock().unwrap().is_empty());
            }
        }
    }
}
