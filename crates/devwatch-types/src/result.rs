//! Result type alias for devwatch operations

use crate::Error;

/// Result type alias for devwatch operations
pub type Result<T> = std::result::Result<T, Error>;
