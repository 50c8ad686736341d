//! Device presence reconciliation for devwatch
//!
//! This crate tracks which recognized removable devices are attached to the host.
//! It includes:
//!
//! - **Reconciliation**: compare a full device snapshot against the devices
//!   already known to be connected and derive connect/disconnect transitions
//! - **Recognition**: classify new devices against the configured device catalog
//! - **Notifications**: publish connect/disconnect events to any number of
//!   subscribers
//! - **Monitoring**: a polling driver that serializes synchronizations and
//!   reads the catalog fresh on every tick
//!
//! # Features
//!
//! - `serde` (default): Enable serialization support for events and entries
//!
//! # Examples
//!
//! ```rust
//! use devwatch_presence::PresenceReconciler;
//! use devwatch_types::{DeviceCatalog, DeviceInfo, RecognitionRule};
//!
//! let catalog = DeviceCatalog::new(vec![RecognitionRule::new("IPOD1", "Classic")]);
//! let mut reconciler = PresenceReconciler::with_catalog(catalog);
//! reconciler.on_connected(|event| println!("connected: {}", event.recognized.name()));
//!
//! reconciler.synchronize(&[DeviceInfo::new("IPOD1")])?;
//! assert_eq!(reconciler.connected_count(), 1);
//!
//! reconciler.synchronize(&[])?;
//! assert_eq!(reconciler.connected_count(), 0);
//! # Ok::<(), devwatch_types::Error>(())
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod events;
pub mod monitor;
pub mod reconciler;

// Re-export main types
pub use events::{DeviceEvent, DeviceEventKind, EventBus, SubscriptionId};
pub use monitor::{MonitorHandle, PresenceMonitor};
pub use reconciler::{ConnectedDevice, PresenceReconciler};
