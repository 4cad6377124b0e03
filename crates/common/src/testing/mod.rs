//! Testing utilities and helpers
//!
//! - **[`assertions`]**: assertion macros for error and attempt-count checks
//!
//! ## Usage
//!
//! ```rust
//! let result: Result<(), String> = Err("Attempt 2 is still running".to_string());
//! retriable_common::assert_error_contains!(result, "still running");
//! ```

pub mod assertions;

// Note: Macros exported with #[macro_export] are available at crate root
pub use assertions::assert_contains_all;
