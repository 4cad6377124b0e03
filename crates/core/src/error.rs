//! Error types for retriable sequences.
//!
//! Configuration problems surface through the embedded [`CommonError`];
//! the remaining variants describe misuse of a live sequence or a display
//! name pattern that cannot be rendered.

use retriable_common::error::{AsCommonError, CommonError, ErrorSeverity};
use retriable_common::{impl_error_classification, impl_error_conversion};
use thiserror::Error;

/// Result type for retriable sequence operations
pub type RetriableResult<T> = Result<T, RetriableError>;

/// Errors raised while configuring or driving a retriable sequence
#[derive(Debug, Error)]
pub enum RetriableError {
    /// Common errors shared across the workspace (configuration, I/O, ...)
    #[error(transparent)]
    Common(#[from] CommonError),

    /// The caller asked for an attempt after the sequence stopped producing
    #[error("No further attempts can be produced after {attempts} attempt(s)")]
    Exhausted {
        /// Attempts produced before exhaustion
        attempts: u32,
    },

    /// A display name pattern could not be rendered
    #[error("The display name pattern '{pattern}' is invalid: {reason}")]
    InvalidTemplate {
        /// The offending pattern
        pattern: String,
        /// What the parser rejected
        reason: String,
    },

    /// A new attempt was requested before the previous one reported back
    #[error("Attempt {attempt} has not reported completion yet")]
    AttemptInFlight {
        /// The attempt still awaiting completion
        attempt: u32,
    },
}

impl RetriableError {
    /// Create an invalid template error
    pub fn invalid_template<P: Into<String>, R: Into<String>>(pattern: P, reason: R) -> Self {
        Self::InvalidTemplate { pattern: pattern.into(), reason: reason.into() }
    }

    /// Whether this error stems from invalid configuration
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::InvalidTemplate { .. })
            || self.as_common().is_some_and(CommonError::is_config)
    }
}

impl_error_conversion!(RetriableError, Common);

impl_error_classification!(RetriableError, Common,
    Self::Exhausted { .. } => {
        retryable: false,
        severity: ErrorSeverity::Critical,
        critical: true,
    },
    Self::InvalidTemplate { .. } => {
        retryable: false,
        severity: ErrorSeverity::Error,
        critical: false,
    },
    Self::AttemptInFlight { .. } => {
        retryable: false,
        severity: ErrorSeverity::Critical,
        critical: true,
    }
);

impl AsCommonError for RetriableError {
    fn as_common(&self) -> Option<&CommonError> {
        match self {
            Self::Common(common) => Some(common),
            _ => None,
        }
    }
}

impl From<RetriableError> for CommonError {
    fn from(err: RetriableError) -> Self {
        match err {
            RetriableError::Common(common) => common,
            RetriableError::InvalidTemplate { pattern, reason } => {
                Self::config_field("name", format!("invalid pattern '{pattern}': {reason}"))
            }
            other => Self::internal_with_context(other.to_string(), "retriable-sequence"),
        }
    }
}

#[cfg(test)]
mod tests {
    use retriable_common::error::ErrorClassification;

    use super::*;

    /// Validates `RetriableError::Exhausted` behavior for the classification
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms exhaustion is critical and never retryable.
    /// - Confirms the message carries the attempt count.
    #[test]
    fn exhausted_is_critical() {
        let err = RetriableError::Exhausted { attempts: 3 };
        assert!(!err.is_retryable());
        assert!(err.is_critical());
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert!(err.to_string().contains("after 3 attempt(s)"));
    }

    /// Validates `RetriableError::is_configuration` behavior for the template
    /// and config scenarios.
    ///
    /// Assertions:
    /// - Confirms template errors count as configuration errors.
    /// - Confirms wrapped `CommonError::Config` counts as configuration.
    /// - Confirms `AttemptInFlight` does not.
    #[test]
    fn configuration_errors_are_recognised() {
        assert!(RetriableError::invalid_template("{", "unmatched braces").is_configuration());
        assert!(RetriableError::from(CommonError::config("bad")).is_configuration());
        assert!(!RetriableError::AttemptInFlight { attempt: 1 }.is_configuration());
    }

    /// Validates `From<RetriableError> for CommonError` behavior for the
    /// collapse scenario.
    ///
    /// Assertions:
    /// - Confirms common errors unwrap unchanged.
    /// - Confirms template errors become config errors on the `name` field.
    /// - Confirms other variants become internal errors.
    #[test]
    fn converts_into_common_error() {
        let common: CommonError = RetriableError::from(CommonError::config("x")).into();
        assert_eq!(common, CommonError::config("x"));

        let template: CommonError = RetriableError::invalid_template("{0", "unmatched").into();
        assert_eq!(template.field(), Some("name"));

        let internal: CommonError = RetriableError::AttemptInFlight { attempt: 2 }.into();
        assert!(matches!(internal, CommonError::Internal { .. }));
    }

    /// Validates `impl_error_conversion!` behavior for the io error scenario.
    ///
    /// Assertions:
    /// - Confirms io errors land in the `Common` variant.
    #[test]
    fn io_errors_route_through_common() {
        let err: RetriableError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(err.as_common().is_some());
    }

    /// Validates `impl_error_classification!` behavior for the delegated
    /// common variant scenario.
    ///
    /// Assertions:
    /// - Confirms a wrapped config error keeps `Error` severity.
    /// - Confirms a wrapped internal error stays critical.
    #[test]
    fn common_variant_delegates_classification() {
        let config = RetriableError::from(CommonError::config_field("name", "blank"));
        assert_eq!(config.severity(), ErrorSeverity::Error);
        assert!(!config.is_critical());

        let internal = RetriableError::from(CommonError::internal("history shrank"));
        assert_eq!(internal.severity(), ErrorSeverity::Critical);
        assert!(internal.is_critical());
        assert!(!internal.is_retryable());
    }
}
