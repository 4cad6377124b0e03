//! Attempt results and error classification.
//!
//! A finished attempt is reduced to one of three [`Classification`]s: it
//! passed, it failed with an error on the retriable allow-list, or it failed
//! with anything else. Aborted attempts are always retriable, and the
//! [`NoErrorSentinel`] marker is never allowed to match.

use std::any::Any;
use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// Boxed error produced by an attempt body
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Assertion failure raised by an attempt, including converted panics
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("assertion failed: {message}")]
pub struct AssertionFailure {
    message: String,
}

impl AssertionFailure {
    /// Create an assertion failure with the given message
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self { message: message.into() }
    }

    /// The failure message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Build an assertion failure from a caught panic payload
    pub(crate) fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "attempt panicked".to_string());
        Self { message }
    }
}

/// The attempt was aborted (skipped) rather than failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("attempt aborted: {reason}")]
pub struct AttemptAborted {
    reason: String,
}

impl AttemptAborted {
    /// Create an abort with the given reason
    pub fn new<S: Into<String>>(reason: S) -> Self {
        Self { reason: reason.into() }
    }

    /// Why the attempt was aborted
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// Marker meaning "no error was observed"; never treated as retriable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("there is no error in this attempt")]
pub struct NoErrorSentinel;

/// How a single attempt finished
#[derive(Debug)]
pub enum AttemptResult {
    /// The attempt completed normally
    Passed,
    /// The attempt raised an error
    Failed(BoxError),
    /// The attempt was aborted; always retriable
    Aborted(BoxError),
}

impl AttemptResult {
    /// Convert the return value of an attempt body
    ///
    /// Errors whose chain contains [`AttemptAborted`] become `Aborted`.
    pub fn from_result(result: Result<(), BoxError>) -> Self {
        match result {
            Ok(()) => Self::Passed,
            Err(err) if chain_contains::<AttemptAborted>(err.as_ref()) => Self::Aborted(err),
            Err(err) => Self::Failed(err),
        }
    }

    /// Shorthand for a failed result
    pub fn failed<E>(error: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::Failed(error.into())
    }

    /// Shorthand for an aborted result
    pub fn aborted<S: Into<String>>(reason: S) -> Self {
        Self::Aborted(Box::new(AttemptAborted::new(reason)))
    }

    /// The error carried by this result, if any
    pub fn error(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        match self {
            Self::Passed => None,
            Self::Failed(err) | Self::Aborted(err) => Some(err.as_ref()),
        }
    }

    /// Take the error carried by this result, if any
    pub fn into_error(self) -> Option<BoxError> {
        match self {
            Self::Passed => None,
            Self::Failed(err) | Self::Aborted(err) => Some(err),
        }
    }

    /// Whether the attempt passed
    pub fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }
}

/// Classification of a finished attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// No error was raised
    NoError,
    /// The error may be retried
    Retriable,
    /// The error ends the sequence immediately
    NonRetriable,
}

type MatchFn = dyn Fn(&(dyn StdError + 'static)) -> bool + Send + Sync;

/// Matches errors that should be treated as retriable
#[derive(Clone)]
pub struct ErrorMatcher {
    name: Cow<'static, str>,
    predicate: Option<Arc<MatchFn>>,
}

impl ErrorMatcher {
    /// Matches every error
    pub fn any() -> Self {
        Self { name: Cow::Borrowed("any"), predicate: None }
    }

    /// Matches errors of type `E` anywhere in the source chain
    pub fn of<E>() -> Self
    where
        E: StdError + 'static,
    {
        Self {
            name: Cow::Borrowed(std::any::type_name::<E>()),
            predicate: Some(Arc::new(chain_contains::<E>)),
        }
    }

    /// Matches errors accepted by a custom predicate
    pub fn predicate<N, F>(name: N, predicate: F) -> Self
    where
        N: Into<Cow<'static, str>>,
        F: Fn(&(dyn StdError + 'static)) -> bool + Send + Sync + 'static,
    {
        Self { name: name.into(), predicate: Some(Arc::new(predicate)) }
    }

    /// Human readable name of the matcher
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether `error` matches this matcher
    pub fn matches(&self, error: &(dyn StdError + 'static)) -> bool {
        self.predicate.as_ref().map_or(true, |predicate| predicate(error))
    }
}

impl fmt::Debug for ErrorMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ErrorMatcher").field(&self.name).finish()
    }
}

/// Allow-list of retriable error kinds
#[derive(Debug, Clone)]
pub struct RetriableErrors {
    matchers: Vec<ErrorMatcher>,
}

impl RetriableErrors {
    /// Build an allow-list from matchers; an empty list accepts any error
    pub fn new(matchers: Vec<ErrorMatcher>) -> Self {
        if matchers.is_empty() {
            return Self::default();
        }
        Self { matchers }
    }

    /// Accept any error as retriable
    pub fn any() -> Self {
        Self::default()
    }

    /// Add a matcher to the allow-list
    #[must_use]
    pub fn with(mut self, matcher: ErrorMatcher) -> Self {
        // the permissive default is replaced once something specific is named
        if self.matchers.len() == 1 && self.matchers[0].predicate.is_none() {
            self.matchers.clear();
        }
        self.matchers.push(matcher);
        self
    }

    /// Matchers in the allow-list
    pub fn matchers(&self) -> &[ErrorMatcher] {
        &self.matchers
    }

    /// Whether `error` is on the allow-list
    ///
    /// Aborts are always accepted and the sentinel never is.
    pub fn allows(&self, error: &(dyn StdError + 'static)) -> bool {
        if error.is::<NoErrorSentinel>() {
            return false;
        }
        if chain_contains::<AttemptAborted>(error) {
            return true;
        }
        self.matchers.iter().any(|matcher| matcher.matches(error))
    }
}

impl Default for RetriableErrors {
    fn default() -> Self {
        Self { matchers: vec![ErrorMatcher::any()] }
    }
}

/// Classify a finished attempt against the retriable allow-list
pub fn classify(result: &AttemptResult, retriable: &RetriableErrors) -> Classification {
    match result {
        AttemptResult::Passed => Classification::NoError,
        AttemptResult::Aborted(_) => Classification::Retriable,
        AttemptResult::Failed(err) => classify_error(err.as_ref(), retriable),
    }
}

/// Classify a raw error against the retriable allow-list
pub fn classify_error(
    error: &(dyn StdError + Send + Sync + 'static),
    retriable: &RetriableErrors,
) -> Classification {
    if retriable.allows(error) {
        Classification::Retriable
    } else {
        Classification::NonRetriable
    }
}

fn chain_contains<E: StdError + 'static>(error: &(dyn StdError + 'static)) -> bool {
    std::iter::successors(Some(error), |err| (*err).source()).any(|err| err.is::<E>())
}
