// Constants for retriable sequences

/// Default maximum number of attempts when settings do not say otherwise
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default number of passing attempts required for an overall pass
pub const DEFAULT_MIN_SUCCESSES: u32 = 1;

/// Minimum allowed value for both attempt and success counts
pub const MIN_COUNT: u32 = 1;

/// Placeholder for the logical display name of the test
pub const DISPLAY_NAME_PLACEHOLDER: &str = "displayName";

/// Placeholder for the invocation index (parameter set, or attempt for plain
/// sequences)
pub const INDEX_PLACEHOLDER: &str = "index";

/// Placeholder for the 1-based attempt number
pub const ATTEMPT_PLACEHOLDER: &str = "attempt";

/// Placeholder for the comma-separated rendering of all argument values
pub const ARGUMENTS_PLACEHOLDER: &str = "arguments";

/// Default name pattern for plain retriable tests
pub const DEFAULT_DISPLAY_NAME: &str = "{displayName}";

/// Default name pattern for data-driven retriable tests
pub const DEFAULT_PARAMETERIZED_DISPLAY_NAME: &str = "[{index}] {arguments}";

/// Separator between rendered argument values
pub const ARGUMENT_SEPARATOR: &str = ", ";
