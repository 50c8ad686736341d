//! Connect/disconnect notifications
//!
//! Subscribers register plain callbacks. Delivery is synchronous and in
//! registration order; with no subscribers nothing is built or delivered.

use chrono::{DateTime, Utc};
use devwatch_types::{DeviceId, PhysicalDevice, RecognizedDevice};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::trace;

/// Identifier returned by a subscription, used to unsubscribe
pub type SubscriptionId = uuid::Uuid;

/// Kind of presence transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum DeviceEventKind {
    /// A recognized device appeared
    Connected,
    /// A tracked device vanished
    Disconnected,
}

/// A presence transition of one device
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DeviceEvent<D> {
    /// What happened
    pub kind: DeviceEventKind,
    /// The device as observed when it connected
    pub device: D,
    /// Recognition result captured when the device connected
    pub recognized: RecognizedDevice,
    /// When the transition was raised
    pub occurred_at: DateTime<Utc>,
}

impl<D: PhysicalDevice> DeviceEvent<D> {
    /// Identifier of the device concerned
    pub fn device_id(&self) -> &DeviceId {
        self.device.device_id()
    }
}

type Listener<D> = Box<dyn Fn(&DeviceEvent<D>) + Send + Sync>;

struct Subscription<D> {
    id: SubscriptionId,
    filter: Option<DeviceEventKind>,
    listener: Listener<D>,
}

impl<D> Subscription<D> {
    fn wants(&self, kind: DeviceEventKind) -> bool {
        self.filter.map_or(true, |filter| filter == kind)
    }
}

/// Registry of event subscribers
pub struct EventBus<D> {
    subscriptions: Vec<Subscription<D>>,
}

impl<D> EventBus<D> {
    /// Create an event bus with no subscribers
    pub fn new() -> Self {
        Self {
            subscriptions: Vec::new(),
        }
    }

    /// Subscribe to every event
    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: Fn(&DeviceEvent<D>) + Send + Sync + 'static,
    {
        self.register(None, Box::new(listener))
    }

    /// Subscribe to connect events only
    pub fn on_connected<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: Fn(&DeviceEvent<D>) + Send + Sync + 'static,
    {
        self.register(Some(DeviceEventKind::Connected), Box::new(listener))
    }

    /// Subscribe to disconnect events only
    pub fn on_disconnected<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: Fn(&DeviceEvent<D>) + Send + Sync + 'static,
    {
        self.register(Some(DeviceEventKind::Disconnected), Box::new(listener))
    }

    /// Remove a subscription
    ///
    /// Returns `false` if the identifier is unknown or was already removed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|subscription| subscription.id != id);
        before != self.subscriptions.len()
    }

    /// Number of active subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.subscriptions.len()
    }

    fn register(&mut self, filter: Option<DeviceEventKind>, listener: Listener<D>) -> SubscriptionId {
        let id = uuid::Uuid::new_v4();
        self.subscriptions.push(Subscription {
            id,
            filter,
            listener,
        });
        trace!(subscription = %id, ?filter, "Registered presence subscriber");
        id
    }
}

impl<D: Clone> EventBus<D> {
    /// Deliver a transition to every interested subscriber
    pub(crate) fn publish(&self, kind: DeviceEventKind, device: &D, recognized: &RecognizedDevice) {
        if !self.subscriptions.iter().any(|s| s.wants(kind)) {
            return;
        }

        let event = DeviceEvent {
            kind,
            device: device.clone(),
            recognized: recognized.clone(),
            occurred_at: Utc::now(),
        };

        for subscription in self.subscriptions.iter().filter(|s| s.wants(kind)) {
            (subscription.listener)(&event);
        }
    }
}

impl<D> Default for EventBus<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> fmt::Debug for EventBus<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriptions.len())
            .finish()
    }
}
