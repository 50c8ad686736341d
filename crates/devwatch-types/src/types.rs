//! Core data types for devwatch
//!
//! This module provides the device model used throughout the devwatch workspace:
//! identifiers, descriptive snapshot records, recognition rules and results.

use crate::traits::PhysicalDevice;
use crate::Result;
use chrono::{DateTime, Utc};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::path::{Path, PathBuf};

/// Host-assigned identifier of an attached device
///
/// The identifier is opaque and stable for one attachment session. Device
/// identity is decided by this value alone; mount paths and names are metadata.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct DeviceId(String);

impl DeviceId {
    /// Create a new device identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for DeviceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&DeviceId> for DeviceId {
    fn from(id: &DeviceId) -> Self {
        id.clone()
    }
}

impl AsRef<str> for DeviceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for DeviceId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Declared kind of a recognized device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum DeviceKind {
    /// Portable media player
    MediaPlayer,
    /// Phone exposing its storage
    Phone,
    /// Camera or memory card
    Camera,
    /// Generic removable storage
    #[default]
    RemovableStorage,
    /// Anything else
    Other,
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::MediaPlayer => "media player",
            Self::Phone => "phone",
            Self::Camera => "camera",
            Self::RemovableStorage => "removable storage",
            Self::Other => "other",
        };
        f.write_str(name)
    }
}

/// Snapshot record of an attached removable device
///
/// Observers that only enumerate devices can report this type directly. Its
/// connect and disconnect hooks do nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DeviceInfo {
    /// Host-assigned identifier
    pub id: DeviceId,
    /// Where the device is currently mounted, if anywhere
    pub mount_path: Option<PathBuf>,
    /// Human readable name reported by the host
    pub friendly_name: Option<String>,
}

impl DeviceInfo {
    /// Create a new device record with no metadata
    pub fn new(id: impl Into<DeviceId>) -> Self {
        Self {
            id: id.into(),
            mount_path: None,
            friendly_name: None,
        }
    }

    /// Set the mount path
    pub fn with_mount_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.mount_path = Some(path.into());
        self
    }

    /// Set the friendly name
    pub fn with_friendly_name(mut self, name: impl Into<String>) -> Self {
        self.friendly_name = Some(name.into());
        self
    }
}

impl PhysicalDevice for DeviceInfo {
    fn device_id(&self) -> &DeviceId {
        &self.id
    }

    fn mount_path(&self) -> Option<&Path> {
        self.mount_path.as_deref()
    }

    fn friendly_name(&self) -> Option<&str> {
        self.friendly_name.as_deref()
    }

    fn connect(&self) -> Result<()> {
        Ok(())
    }

    fn disconnect(&self) -> Result<()> {
        Ok(())
    }
}

/// One entry of the device catalog
///
/// A device is recognized by a rule when the device identifier equals the
/// rule's pattern exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RecognitionRule {
    /// Pattern compared against [`DeviceId`]
    pub recognize_pattern: String,
    /// Declared device name
    pub name: String,
    /// Declared device kind
    #[cfg_attr(feature = "serde", serde(default))]
    pub kind: DeviceKind,
    /// Optional free-form description
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub description: Option<String>,
}

impl RecognitionRule {
    /// Create a new rule for the given pattern and name
    pub fn new(pattern: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            recognize_pattern: pattern.into(),
            name: name.into(),
            kind: DeviceKind::default(),
            description: None,
        }
    }

    /// Set the device kind
    pub fn with_kind(mut self, kind: DeviceKind) -> Self {
        self.kind = kind;
        self
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Check whether this rule recognizes the given device identifier
    pub fn matches(&self, id: &DeviceId) -> bool {
        self.recognize_pattern == id.as_str()
    }
}

/// Outcome of matching a device against the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RecognizedDevice {
    /// The rule that recognized the device
    pub rule: RecognitionRule,
    /// Position of the rule in the catalog it was matched against
    pub catalog_index: usize,
}

impl RecognizedDevice {
    /// Declared name of the recognized device
    pub fn name(&self) -> &str {
        &self.rule.name
    }

    /// Declared kind of the recognized device
    pub fn kind(&self) -> DeviceKind {
        self.rule.kind
    }
}

/// Reconciliation statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ReconcilerStats {
    /// Completed synchronizations
    pub synchronizations: u64,
    /// Devices connected since construction
    pub connects: u64,
    /// Devices disconnected since construction
    pub disconnects: u64,
    /// Unrecognized devices seen in the last synchronization
    pub unrecognized: u64,
    /// When the last synchronization completed
    pub last_synchronized: Option<DateTime<Utc>>,
}
