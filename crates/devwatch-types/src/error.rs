//! Error types and handling for devwatch
//!
//! This module provides the error handling system shared by the devwatch crates.
//! It includes structured error types, severity levels, and retry classification.

use crate::DeviceId;

/// Error severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorSeverity {
    /// Low severity - operation can continue
    Low,
    /// Medium severity - operation should be retried
    Medium,
    /// High severity - operation should be aborted
    High,
    /// Critical severity - entire process should be terminated
    Critical,
}

/// Main error type for devwatch operations
#[derive(thiserror::Error, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Error {
    /// I/O operation failed
    #[error("I/O error: {message}")]
    Io {
        /// Error message from the I/O operation
        message: String,
    },

    /// Configuration error, e.g. no device catalog has been supplied
    #[error("Configuration error: {message}")]
    Config {
        /// Error message describing the configuration issue
        message: String,
    },

    /// The device catalog is malformed
    #[error("Device catalog error: {message}")]
    Catalog {
        /// Error message describing the catalog issue
        message: String,
    },

    /// The device observer could not produce a snapshot
    #[error("Device observer error: {message}")]
    Observer {
        /// Error message describing the observer failure
        message: String,
    },

    /// A device connect or disconnect hook failed
    #[error("Device hook failed for {device_id}: {message}")]
    DeviceHook {
        /// Identifier of the device whose hook failed
        device_id: DeviceId,
        /// Error message reported by the hook
        message: String,
    },

    /// Operation timed out
    #[error("Operation timed out after {millis} ms")]
    Timeout {
        /// Number of milliseconds after which the operation timed out
        millis: u64,
    },

    /// Generic error with custom message
    #[error("{message}")]
    Other {
        /// Custom error message
        message: String,
    },
}

/// Error kind for categorizing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// I/O related errors
    Io,
    /// Configuration errors
    Config,
    /// Catalog errors
    Catalog,
    /// Observer errors
    Observer,
    /// Device hook errors
    DeviceHook,
    /// Timeout
    Timeout,
    /// Other errors
    Other,
}

impl Error {
    /// Get the error kind
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io { .. } => ErrorKind::Io,
            Self::Config { .. } => ErrorKind::Config,
            Self::Catalog { .. } => ErrorKind::Catalog,
            Self::Observer { .. } => ErrorKind::Observer,
            Self::DeviceHook { .. } => ErrorKind::DeviceHook,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Other { .. } => ErrorKind::Other,
        }
    }

    /// Get the error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Io { .. } => ErrorSeverity::Medium,
            Self::Config { .. } | Self::Catalog { .. } => ErrorSeverity::High,
            Self::Observer { .. } => ErrorSeverity::Medium,
            Self::DeviceHook { .. } => ErrorSeverity::Medium,
            Self::Timeout { .. } => ErrorSeverity::Medium,
            Self::Other { .. } => ErrorSeverity::Medium,
        }
    }

    /// Check if this error is recoverable by retrying on a later tick
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Io { .. }
            | Self::Observer { .. }
            | Self::DeviceHook { .. }
            | Self::Timeout { .. }
            | Self::Other { .. } => true,
            Self::Config { .. } | Self::Catalog { .. } => false,
        }
    }

    /// Check if this error should trigger a retry
    pub fn should_retry(&self) -> bool {
        self.is_recoverable() && self.severity() <= ErrorSeverity::Medium
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new catalog error
    pub fn catalog<S: Into<String>>(message: S) -> Self {
        Self::Catalog {
            message: message.into(),
        }
    }

    /// Create a new observer error
    pub fn observer<S: Into<String>>(message: S) -> Self {
        Self::Observer {
            message: message.into(),
        }
    }

    /// Create a new device hook error
    pub fn device_hook<I: Into<DeviceId>, S: Into<String>>(device_id: I, message: S) -> Self {
        Self::DeviceHook {
            device_id: device_id.into(),
            message: message.into(),
        }
    }

    /// Create a new generic error
    pub fn other<S: Into<String>>(message: S) -> Self {
        Self::Other {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::Io {
            message: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn test_error_kind_consistency(message in ".*") {
            let errors = vec![
                Error::Io { message: message.clone() },
                Error::Config { message: message.clone() },
                Error::Catalog { message: message.clone() },
                Error::Observer { message: message.clone() },
                Error::device_hook("DEV", message.clone()),
                Error::Other { message: message.clone() },
            ];

            for error in errors {
                let kind = error.kind();
                match error {
                    Error::Io { .. } => prop_assert_eq!(kind, ErrorKind::Io),
                    Error::Config { .. } => prop_assert_eq!(kind, ErrorKind::Config),
                    Error::Catalog { .. } => prop_assert_eq!(kind, ErrorKind::Catalog),
                    Error::Observer { .. } => prop_assert_eq!(kind, ErrorKind::Observer),
                    Error::DeviceHook { .. } => prop_assert_eq!(kind, ErrorKind::DeviceHook),
                    Error::Other { .. } => prop_assert_eq!(kind, ErrorKind::Other),
                    _ => {}
                }
            }
        }

        #[test]
        fn test_retry_implies_recoverable(message in ".*") {
            let error = Error::observer(message);
            if error.should_retry() {
                prop_assert!(error.is_recoverable());
                prop_assert!(error.severity() <= ErrorSeverity::Medium);
            }
        }
    }

    #[test]
    fn test_error_severity_ordering() {
        assert!(ErrorSeverity::Low < ErrorSeverity::Medium);
        assert!(ErrorSeverity::Medium < ErrorSeverity::High);
        assert!(ErrorSeverity::High < ErrorSeverity::Critical);
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "no such drive");
        let error = Error::from(io_error);

        assert_eq!(error.kind(), ErrorKind::Io);
        assert!(error.to_string().contains("no such drive"));
    }

    #[test]
    fn test_config_error_is_fatal() {
        let error = Error::config("no device catalog configured");

        assert_eq!(error.kind(), ErrorKind::Config);
        assert_eq!(error.severity(), ErrorSeverity::High);
        assert!(!error.should_retry());
    }

    #[test]
    fn test_device_hook_error_message() {
        let error = Error::device_hook("IPOD1", "device busy");

        assert_eq!(error.kind(), ErrorKind::DeviceHook);
        assert!(error.should_retry());
        assert_eq!(
            error.to_string(),
            "Device hook failed for IPOD1: device busy"
        );
    }

    #[test]
    fn test_timeout_error_properties() {
        let error = Error::Timeout { millis: 5000 };

        assert_eq!(error.kind(), ErrorKind::Timeout);
        assert!(error.should_retry());
        assert!(error.to_string().contains("5000 ms"));
    }
}
