//! Device catalog
//!
//! The catalog is the ordered list of recognition rules a host is configured
//! with. Order is significant: when several rules share a pattern, the first
//! one wins.

use crate::{DeviceId, RecognitionRule, RecognizedDevice};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Ordered, read-only collection of recognition rules
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct DeviceCatalog {
    devices: Vec<RecognitionRule>,
}

impl DeviceCatalog {
    /// Create a catalog from rules in load order
    pub fn new(devices: Vec<RecognitionRule>) -> Self {
        Self { devices }
    }

    /// Rules in catalog order
    pub fn devices(&self) -> &[RecognitionRule] {
        &self.devices
    }

    /// Number of rules
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Check if the catalog has no rules
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Recognize a device identifier against the catalog
    ///
    /// Returns the first rule, in catalog order, whose pattern equals the
    /// identifier. `None` is the normal outcome for unknown devices.
    pub fn recognize(&self, id: &DeviceId) -> Option<RecognizedDevice> {
        self.devices
            .iter()
            .position(|rule| rule.matches(id))
            .map(|catalog_index| RecognizedDevice {
                rule: self.devices[catalog_index].clone(),
                catalog_index,
            })
    }

    /// Patterns declared by more than one rule, in first-occurrence order
    ///
    /// Only the first rule of each such pattern can ever match.
    pub fn duplicate_patterns(&self) -> Vec<&str> {
        let mut seen: HashMap<&str, usize> = HashMap::new();
        let mut duplicates = Vec::new();
        for rule in &self.devices {
            let count = seen.entry(rule.recognize_pattern.as_str()).or_insert(0);
            *count += 1;
            if *count == 2 {
                duplicates.push(rule.recognize_pattern.as_str());
            }
        }
        duplicates
    }
}

impl From<Vec<RecognitionRule>> for DeviceCatalog {
    fn from(devices: Vec<RecognitionRule>) -> Self {
        Self::new(devices)
    }
}

impl FromIterator<RecognitionRule> for DeviceCatalog {
    fn from_iter<I: IntoIterator<Item = RecognitionRule>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
