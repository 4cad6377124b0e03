//! # Retriable Core
//!
//! Retry decision engine for flaky tests.
//!
//! A retriable test declares how many attempts it may take
//! (`max_attempts`) and how many of them must pass (`min_successes`).
//! The engine decides, attempt by attempt, whether the next attempt runs,
//! whether a failure is tolerated or reported, and how each attempt is named.
//!
//! This crate contains:
//! - The decision engine ([`decision`]) over an append-only history ([`history`])
//! - Lazy attempt sequences for plain and data-driven tests ([`sequence`],
//!   [`parameterized`])
//! - Display name templates ([`formatter`])
//! - Declarations with a synchronous runner and reports ([`runner`], [`report`])
//!
//! ## Example
//!
//! ```rust
//! use retriable_core::RetriableTest;
//!
//! let mut calls = 0;
//! let report = RetriableTest::new("flaky_login", 3)
//!     .run(|_attempt| {
//!         calls += 1;
//!         if calls < 2 { Err("connection reset".into()) } else { Ok(()) }
//!     })
//!     .unwrap();
//!
//! assert!(report.passed());
//! assert_eq!(report.display_names(), vec!["flaky_login", "flaky_login [Retry 2]"]);
//! ```

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod classify;
pub mod constants;
pub mod decision;
pub mod error;
pub mod formatter;
pub mod history;
pub mod parameterized;
pub mod policy;
pub mod report;
pub mod runner;
pub mod sequence;
pub mod settings;
pub mod tracing;

// Re-export commonly used types
pub use classify::{
    classify, AssertionFailure, AttemptAborted, AttemptResult, BoxError, Classification,
    ErrorMatcher, NoErrorSentinel, RetriableErrors,
};
pub use decision::{CompletionAction, DecisionEngine, ExecutionDecision};
pub use error::{RetriableError, RetriableResult};
pub use formatter::{ArgumentSet, DisplayNameFormatter, FormatContext};
pub use history::{AttemptHistory, AttemptOutcome, HistorySnapshot};
pub use parameterized::{ParameterSetSequence, ParameterizedAttempt};
pub use policy::{RetryPolicy, RetryPolicyBuilder};
pub use report::{
    AttemptRecord, AttemptStatus, FailureCause, InvocationMetrics, InvocationReport,
    InvocationVerdict, ParameterizedReport,
};
pub use runner::{AttemptContext, RetriableParameterizedTest, RetriableTest};
pub use sequence::{AttemptDescriptor, AttemptSequence, AttemptSource, SequenceVerdict};
pub use settings::RetriableSettings;
