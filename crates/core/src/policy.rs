//! Immutable retry policy for one invocation.

use retriable_common::error::CommonError;

use crate::classify::{ErrorMatcher, RetriableErrors};
use crate::constants::{DEFAULT_MAX_ATTEMPTS, DEFAULT_MIN_SUCCESSES, MIN_COUNT};
use crate::error::RetriableResult;

/// How many attempts an invocation may take and how many must pass
///
/// `min_successes > max_attempts` is accepted; such a policy can never pass.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    min_successes: u32,
    retriable: RetriableErrors,
}

impl RetryPolicy {
    /// Create a policy, validating both counts
    pub fn new(
        max_attempts: u32,
        min_successes: u32,
        retriable: RetriableErrors,
    ) -> RetriableResult<Self> {
        if max_attempts < MIN_COUNT {
            return Err(CommonError::config_field(
                "max_attempts",
                format!("max_attempts must be at least {MIN_COUNT}, got {max_attempts}"),
            )
            .into());
        }
        if min_successes < MIN_COUNT {
            return Err(CommonError::config_field(
                "min_successes",
                format!("min_successes must be at least {MIN_COUNT}, got {min_successes}"),
            )
            .into());
        }
        Ok(Self { max_attempts, min_successes, retriable })
    }

    /// Start building a policy from the defaults
    pub fn builder() -> RetryPolicyBuilder {
        RetryPolicyBuilder::default()
    }

    /// Upper bound on attempts
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Passing attempts required for an overall pass
    pub fn min_successes(&self) -> u32 {
        self.min_successes
    }

    /// Retriable error allow-list
    pub fn retriable(&self) -> &RetriableErrors {
        &self.retriable
    }

    /// Whether the success quota can still be met after `retriable_failures`
    pub fn quota_reachable(&self, retriable_failures: u32) -> bool {
        self.max_attempts.saturating_sub(retriable_failures) >= self.min_successes
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            min_successes: DEFAULT_MIN_SUCCESSES,
            retriable: RetriableErrors::default(),
        }
    }
}

/// Builder for [`RetryPolicy`]
#[derive(Debug, Clone)]
pub struct RetryPolicyBuilder {
    max_attempts: u32,
    min_successes: u32,
    matchers: Vec<ErrorMatcher>,
}

impl Default for RetryPolicyBuilder {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            min_successes: DEFAULT_MIN_SUCCESSES,
            matchers: Vec::new(),
        }
    }
}

impl RetryPolicyBuilder {
    /// Set the maximum number of attempts
    #[must_use]
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the number of passing attempts required
    #[must_use]
    pub fn min_successes(mut self, min_successes: u32) -> Self {
        self.min_successes = min_successes;
        self
    }

    /// Add a matcher to the retriable allow-list
    #[must_use]
    pub fn retry_on(mut self, matcher: ErrorMatcher) -> Self {
        self.matchers.push(matcher);
        self
    }

    /// Treat errors of type `E` as retriable
    #[must_use]
    pub fn retry_on_type<E: std::error::Error + 'static>(self) -> Self {
        self.retry_on(ErrorMatcher::of::<E>())
    }

    /// Validate and build the policy
    pub fn build(self) -> RetriableResult<RetryPolicy> {
        RetryPolicy::new(self.max_attempts, self.min_successes, RetriableErrors::new(self.matchers))
    }
}

#[cfg(test)]
mod tests {
    use retriable_common::assert_config_error;

    use super::*;

    /// Validates `RetryPolicy::new` behavior for the zero count scenario.
    ///
    /// Assertions:
    /// - Confirms zero attempts is rejected on the `max_attempts` field.
    /// - Confirms zero successes is rejected on the `min_successes` field.
    #[test]
    fn rejects_zero_counts() {
        assert_config_error!(RetryPolicy::builder().max_attempts(0).build(), "max_attempts");
        assert_config_error!(RetryPolicy::builder().min_successes(0).build(), "min_successes");
    }

    /// Validates `RetryPolicy::quota_reachable` behavior for the boundary
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms the quota stays reachable while `max - failures >= min`.
    /// - Confirms failures beyond `max` saturate instead of wrapping.
    #[test]
    fn quota_boundary() {
        let policy = RetryPolicy::builder().max_attempts(5).min_successes(2).build().unwrap();
        assert!(policy.quota_reachable(3));
        assert!(!policy.quota_reachable(4));
        assert!(!policy.quota_reachable(9));
    }

    /// Validates `RetryPolicy` behavior for the min above max scenario.
    ///
    /// Assertions:
    /// - Confirms the policy builds.
    /// - Confirms the quota is unreachable from the start.
    #[test]
    fn min_above_max_is_accepted_but_unreachable() {
        let policy = RetryPolicy::builder().max_attempts(2).min_successes(3).build().unwrap();
        assert_eq!(policy.max_attempts(), 2);
        assert!(!policy.quota_reachable(0));
    }

    /// Validates `RetryPolicy::default` behavior for the defaults scenario.
    ///
    /// Assertions:
    /// - Confirms three attempts, one success and a permissive allow-list.
    #[test]
    fn defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts(), 3);
        assert_eq!(policy.min_successes(), 1);
        assert_eq!(policy.retriable().matchers().len(), 1);
        assert_eq!(policy.retriable().matchers()[0].name(), "any");
    }
}
