//! Core traits for devwatch
//!
//! This module defines the capabilities the presence reconciler consumes:
//! the physical device abstraction, the snapshot observer, and the catalog
//! provider.

use crate::{DeviceCatalog, DeviceId, Result};
use std::path::Path;
use std::sync::Arc;

#[cfg(feature = "async")]
use async_trait::async_trait;

/// A removable device as reported by the host
///
/// Identity is defined by [`device_id`](Self::device_id). The hooks are
/// invoked exactly once per connect or disconnect transition.
pub trait PhysicalDevice: Send + Sync {
    /// Host-assigned identifier, stable for the attachment session
    fn device_id(&self) -> &DeviceId;

    /// Current mount path, if the device is mounted
    fn mount_path(&self) -> Option<&Path>;

    /// Human readable name, if the host reports one
    fn friendly_name(&self) -> Option<&str>;

    /// Called when the device becomes connected
    fn connect(&self) -> Result<()>;

    /// Called when the device is found to be gone
    fn disconnect(&self) -> Result<()>;
}

/// Source of complete device snapshots
#[cfg_attr(feature = "async", async_trait)]
pub trait DeviceObserver: Send + Sync {
    /// Device type reported by this observer
    type Device: PhysicalDevice;

    /// Every device attached at the moment of the call
    #[cfg(feature = "async")]
    async fn snapshot(&self) -> Result<Vec<Self::Device>>;

    /// Every device attached at the moment of the call (sync version)
    #[cfg(not(feature = "async"))]
    fn snapshot(&self) -> Result<Vec<Self::Device>>;
}

/// Source of the catalog to recognize devices against
///
/// Implementations may swap the catalog at any time; callers read it fresh
/// before every synchronization.
pub trait CatalogProvider: Send + Sync {
    /// The current catalog, or `None` when none is configured
    fn current_catalog(&self) -> Option<Arc<DeviceCatalog>>;
}

impl CatalogProvider for Arc<DeviceCatalog> {
    fn current_catalog(&self) -> Option<Arc<DeviceCatalog>> {
        Some(Arc::clone(self))
    }
}

impl CatalogProvider for Option<Arc<DeviceCatalog>> {
    fn current_catalog(&self) -> Option<Arc<DeviceCatalog>> {
        self.clone()
    }
}

impl<T: CatalogProvider + ?Sized> CatalogProvider for Box<T> {
    fn current_catalog(&self) -> Option<Arc<DeviceCatalog>> {
        (**self).current_catalog()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DeviceInfo, RecognitionRule};

    struct FixedObserver(Vec<DeviceInfo>);

    #[cfg_attr(feature = "async", async_trait)]
    impl DeviceObserver for FixedObserver {
        type Device = DeviceInfo;

        #[cfg(feature = "async")]
        async fn snapshot(&self) -> Result<Vec<DeviceInfo>> {
            Ok(self.0.clone())
        }

        #[cfg(not(feature = "async"))]
        fn snapshot(&self) -> Result<Vec<DeviceInfo>> {
            Ok(self.0.clone())
        }
    }

    #[cfg(feature = "async")]
    #[test]
    fn test_observer_snapshot() {
        let observer = FixedObserver(vec![DeviceInfo::new("IPOD1")]);
        let devices = tokio_test::block_on(observer.snapshot()).unwrap();
        assert_eq!(devices[0].device_id().as_str(), "IPOD1");
    }

    #[cfg(not(feature = "async"))]
    #[test]
    fn test_observer_snapshot() {
        let observer = FixedObserver(vec![DeviceInfo::new("IPOD1")]);
        let devices = observer.snapshot().unwrap();
        assert_eq!(devices[0].device_id().as_str(), "IPOD1");
    }

    #[test]
    fn test_catalog_providers() {
        let catalog = Arc::new(DeviceCatalog::new(vec![RecognitionRule::new(
            "IPOD1", "Classic",
        )]));

        let shared = catalog.current_catalog().unwrap();
        assert!(Arc::ptr_eq(&shared, &catalog));

        let boxed: Box<dyn CatalogProvider> = Box::new(Some(Arc::clone(&catalog)));
        assert_eq!(boxed.current_catalog().unwrap().len(), 1);

        let missing: Option<Arc<DeviceCatalog>> = None;
        assert!(missing.current_catalog().is_none());
    }
}
