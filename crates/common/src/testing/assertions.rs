//! Custom assertions for testing
//!
//! Assertion macros shared by the retriable test suites.

// Allow missing panics docs for test utilities - these assertions are designed to panic
// on failure which is their core purpose in test contexts
#![allow(clippy::missing_panics_doc)]

use std::fmt::Debug;

/// Assert that an error contains a specific substring
///
/// # Examples
///
/// ```
/// let result: Result<(), String> = Err("display name pattern is invalid".to_string());
/// retriable_common::assert_error_contains!(result, "invalid");
/// ```
#[macro_export]
macro_rules! assert_error_contains {
    ($result:expr, $substring:expr) => {
        match &$result {
            Ok(_) => panic!("Expected error but got Ok"),
            Err(e) => {
                let error_msg = format!("{}", e);
                assert!(
                    error_msg.contains($substring),
                    "Error message '{}' does not contain '{}'",
                    error_msg,
                    $substring
                );
            }
        }
    };
}

/// Assert that a result failed with a configuration error
///
/// The error type must implement
/// [`AsCommonError`](crate::error::AsCommonError). An optional second argument
/// pins the offending field.
///
/// # Examples
///
/// ```
/// use retriable_common::error::CommonError;
///
/// let result: Result<(), CommonError> =
///     Err(CommonError::config_field("max_attempts", "must be at least 1"));
/// retriable_common::assert_config_error!(result, "max_attempts");
/// ```
#[macro_export]
macro_rules! assert_config_error {
    ($result:expr) => {{
        use $crate::error::AsCommonError as _;
        match &$result {
            Ok(_) => panic!("Expected configuration error but got Ok"),
            Err(e) => assert!(
                e.as_common().is_some_and(|common| common.is_config()),
                "Expected configuration error, got {:?}",
                e
            ),
        }
    }};
    ($result:expr, $field:expr) => {{
        use $crate::error::AsCommonError as _;
        match &$result {
            Ok(_) => panic!("Expected configuration error but got Ok"),
            Err(e) => {
                let common = e.as_common();
                assert!(
                    common.is_some_and(|common| common.is_config()),
                    "Expected configuration error, got {:?}",
                    e
                );
                assert_eq!(
                    common.and_then(|common| common.field()),
                    Some($field),
                    "Configuration error names the wrong field"
                );
            }
        }
    }};
}

/// Assert that an attempt count matches expected value
#[macro_export]
macro_rules! assert_attempt_count {
    ($actual:expr, $expected:expr) => {
        assert_eq!($actual, $expected, "Expected {} attempts but got {}", $expected, $actual);
    };
}

/// Assert that a collection contains all specified items
///
/// # Examples
///
/// ```
/// use retriable_common::testing::assertions::assert_contains_all;
///
/// let names = vec!["login", "login [Retry 2]"];
/// assert_contains_all(&names, &["login [Retry 2]"]);
/// ```
pub fn assert_contains_all<T>(haystack: &[T], needles: &[T])
where
    T: PartialEq + Debug,
{
    for needle in needles {
        assert!(haystack.contains(needle), "Collection does not contain {:?}", needle);
    }
}
