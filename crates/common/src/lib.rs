//! Shared foundation for the retriable crates.
//!
//! # Feature Tiers
//!
//! Enable cargo features to opt into the tiers you need:
//! - `foundation`: TOML/JSON conversions for [`CommonError`]
//! - `test-utils`: assertion macros for test suites

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Foundation tier
// -----------------------------------------------------------------
#[macro_use]
pub mod error;

// Testing utilities
// ---------------------------------------------------------------
#[cfg(any(feature = "test-utils", test))]
pub mod testing;

pub use error::{AsCommonError, CommonError, ErrorClassification, ErrorSeverity};
