//! Shared error foundation for the retriable crates.
//!
//! Crate-level errors embed [`CommonError`] for the failures every crate can
//! hit (bad declarations, unreadable or malformed settings, broken internal
//! state) and add their own variants on top. Two macros do the wiring:
//!
//! - [`impl_error_conversion!`](crate::impl_error_conversion) routes io, TOML
//!   and JSON errors into the embedded `CommonError`.
//! - [`impl_error_classification!`](crate::impl_error_classification)
//!   implements [`ErrorClassification`], delegating the common variant.
//!
//! ```rust,ignore
//! #[derive(Debug, Error)]
//! pub enum SequenceError {
//!     #[error("no further attempts after {attempts} attempt(s)")]
//!     Exhausted { attempts: u32 },
//!
//!     #[error(transparent)]
//!     Common(#[from] CommonError),
//! }
//!
//! impl_error_conversion!(SequenceError, Common);
//! impl_error_classification!(SequenceError, Common,
//!     Self::Exhausted { .. } => {
//!         retryable: false,
//!         severity: ErrorSeverity::Critical,
//!         critical: true,
//!     }
//! );
//! ```

use std::fmt;

/// Failures shared by every retriable crate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommonError {
    /// A declaration or settings value is unusable
    Config { message: String, field: Option<String> },

    /// Settings could not be parsed or encoded
    Serialization { message: String, format: Option<String> },

    /// Settings could not be read from disk
    Persistence { message: String, operation: Option<String> },

    /// Broken internal state
    Internal { message: String, context: Option<String> },
}

impl fmt::Display for CommonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config { message, field: Some(field) } => {
                write!(f, "Configuration error in field '{field}': {message}")
            }
            Self::Config { message, field: None } => write!(f, "Configuration error: {message}"),
            Self::Serialization { message, format: Some(format) } => {
                write!(f, "Serialization error ({format}): {message}")
            }
            Self::Serialization { message, format: None } => {
                write!(f, "Serialization error: {message}")
            }
            Self::Persistence { message, operation: Some(operation) } => {
                write!(f, "Persistence error during '{operation}': {message}")
            }
            Self::Persistence { message, operation: None } => {
                write!(f, "Persistence error: {message}")
            }
            Self::Internal { message, context: Some(context) } => {
                write!(f, "Internal error in '{context}': {message}")
            }
            Self::Internal { message, context: None } => write!(f, "Internal error: {message}"),
        }
    }
}

impl std::error::Error for CommonError {}

impl ErrorClassification for CommonError {
    fn is_retryable(&self) -> bool {
        false
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Internal { .. } => ErrorSeverity::Critical,
            _ => ErrorSeverity::Error,
        }
    }

    fn is_critical(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }
}

impl CommonError {
    /// Configuration error without a field
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config { message: message.into(), field: None }
    }

    /// Configuration error naming the offending field
    pub fn config_field<S: Into<String>, F: Into<String>>(field: F, message: S) -> Self {
        Self::Config { message: message.into(), field: Some(field.into()) }
    }

    /// Serialization error tagged with its format (`"TOML"`, `"JSON"`)
    pub fn serialization_format<S: Into<String>, F: Into<String>>(format: F, message: S) -> Self {
        Self::Serialization { message: message.into(), format: Some(format.into()) }
    }

    /// Persistence error tagged with the failed operation
    pub fn persistence_op<S: Into<String>, O: Into<String>>(operation: O, message: S) -> Self {
        Self::Persistence { message: message.into(), operation: Some(operation.into()) }
    }

    /// Internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal { message: message.into(), context: None }
    }

    /// Internal error with the component it came from
    pub fn internal_with_context<S: Into<String>, C: Into<String>>(message: S, context: C) -> Self {
        Self::Internal { message: message.into(), context: Some(context.into()) }
    }

    /// Whether this is a configuration error
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config { .. })
    }

    /// The field named by a configuration error
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Config { field, .. } => field.as_deref(),
            _ => None,
        }
    }
}

/// Retryability and severity of an error
///
/// Crate errors implement this through
/// [`impl_error_classification!`](crate::impl_error_classification).
pub trait ErrorClassification {
    /// Whether retrying the failed operation could succeed
    fn is_retryable(&self) -> bool;

    /// Severity used when the error is logged
    fn severity(&self) -> ErrorSeverity;

    /// Whether the error means two components broke their contract
    fn is_critical(&self) -> bool;
}

/// Access to an embedded [`CommonError`]
pub trait AsCommonError {
    /// The embedded common error, if this error carries one
    fn as_common(&self) -> Option<&CommonError>;
}

impl AsCommonError for CommonError {
    fn as_common(&self) -> Option<&CommonError> {
        Some(self)
    }
}

/// Severity levels for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Bad input; the caller can fix it
    Error,
    /// Misuse of the API or broken internal state
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => write!(f, "ERROR"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

impl From<std::io::Error> for CommonError {
    fn from(err: std::io::Error) -> Self {
        Self::Persistence { message: err.to_string(), operation: None }
    }
}

#[cfg(feature = "foundation")]
impl From<serde_json::Error> for CommonError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization_format("JSON", err.to_string())
    }
}

#[cfg(feature = "foundation")]
impl From<toml::de::Error> for CommonError {
    fn from(err: toml::de::Error) -> Self {
        Self::serialization_format("TOML", err.to_string())
    }
}

#[cfg(feature = "foundation")]
impl From<toml::ser::Error> for CommonError {
    fn from(err: toml::ser::Error) -> Self {
        Self::serialization_format("TOML", err.to_string())
    }
}

/// Route io, TOML and JSON errors into a crate error's `CommonError` variant
///
/// The calling crate needs `toml` and `serde_json` as dependencies.
///
/// ```rust,ignore
/// impl_error_conversion!(RetriableError, Common);
/// ```
#[macro_export]
macro_rules! impl_error_conversion {
    ($error_type:ty, $variant:ident) => {
        impl From<std::io::Error> for $error_type {
            fn from(err: std::io::Error) -> Self {
                Self::$variant($crate::error::CommonError::from(err))
            }
        }

        impl From<toml::de::Error> for $error_type {
            fn from(err: toml::de::Error) -> Self {
                Self::$variant($crate::error::CommonError::from(err))
            }
        }

        impl From<serde_json::Error> for $error_type {
            fn from(err: serde_json::Error) -> Self {
                Self::$variant($crate::error::CommonError::from(err))
            }
        }
    };
}

/// Implement [`ErrorClassification`] for a crate error
///
/// The common variant delegates to `CommonError`; every other variant lists
/// its classification.
///
/// ```rust,ignore
/// impl_error_classification!(RetriableError, Common,
///     Self::InvalidTemplate { .. } => {
///         retryable: false,
///         severity: ErrorSeverity::Error,
///         critical: false,
///     }
/// );
/// ```
#[macro_export]
macro_rules! impl_error_classification {
    (
        $error_type:ty,
        $common_variant:ident
        $(,
            $variant:pat => {
                retryable: $retryable:expr,
                severity: $severity:expr,
                critical: $critical:expr
                $(,)?
            }
        )*
        $(,)?
    ) => {
        impl $crate::error::ErrorClassification for $error_type {
            fn is_retryable(&self) -> bool {
                match self {
                    Self::$common_variant(e) => $crate::error::ErrorClassification::is_retryable(e),
                    $(
                        $variant => $retryable,
                    )*
                }
            }

            fn severity(&self) -> $crate::error::ErrorSeverity {
                match self {
                    Self::$common_variant(e) => $crate::error::ErrorClassification::severity(e),
                    $(
                        $variant => $severity,
                    )*
                }
            }

            fn is_critical(&self) -> bool {
                match self {
                    Self::$common_variant(e) => $crate::error::ErrorClassification::is_critical(e),
                    $(
                        $variant => $critical,
                    )*
                }
            }
        }
    };
}
