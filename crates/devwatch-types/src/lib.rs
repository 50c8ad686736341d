//! Core device model and error handling for devwatch
//!
//! This crate provides the foundational types shared by the devwatch workspace:
//!
//! - **Device model**: device identifiers, descriptive snapshot records and
//!   recognition results
//! - **Catalog**: the ordered list of recognition rules a host is configured with
//! - **Traits**: the capabilities the reconciler consumes (devices, observers,
//!   catalog providers)
//! - **Error handling**: error types with severity levels and context
//!
//! # Features
//!
//! - `std` (default): Enable standard library features
//! - `async`: Enable async trait definitions
//! - `serde`: Enable serialization support
//!
//! # Examples
//!
//! ```rust
//! use devwatch_types::{DeviceCatalog, DeviceId, DeviceKind, RecognitionRule};
//!
//! let catalog = DeviceCatalog::new(vec![
//!     RecognitionRule::new("IPOD1", "Classic").with_kind(DeviceKind::MediaPlayer),
//! ]);
//!
//! let recognized = catalog.recognize(&DeviceId::from("IPOD1")).unwrap();
//! assert_eq!(recognized.name(), "Classic");
//! assert!(catalog.recognize(&DeviceId::from("USB-STICK")).is_none());
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod catalog;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use catalog::DeviceCatalog;
pub use error::{Error, ErrorKind, ErrorSeverity};
pub use result::Result;
pub use traits::*;
pub use types::*;
