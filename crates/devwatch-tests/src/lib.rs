//! devwatch integration test suite
//!
//! This crate holds the fixtures shared by the cross-crate integration tests
//! under `tests/`.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Shared test fixtures
pub mod test_utils;
