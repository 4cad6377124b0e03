//! Display names for attempts.
//!
//! A pattern mixes literal text with placeholders:
//!
//! | Placeholder     | Replaced with                                        |
//! |-----------------|------------------------------------------------------|
//! | `{displayName}` | logical name of the test                             |
//! | `{index}`       | parameter-set index, or the attempt for plain tests  |
//! | `{attempt}`     | 1-based attempt number                               |
//! | `{arguments}`   | every argument, comma separated                      |
//! | `{0}`, `{1}`..  | the argument at that position                        |
//!
//! Single quotes escape literal text (`'{'`), and `''` is one quote.
//! Positional placeholders beyond the argument list are left verbatim.
//! Substituted values are never parsed again.

use std::fmt::Display;

use retriable_common::error::CommonError;

use crate::constants::{
    ARGUMENTS_PLACEHOLDER, ARGUMENT_SEPARATOR, ATTEMPT_PLACEHOLDER, DISPLAY_NAME_PLACEHOLDER,
    INDEX_PLACEHOLDER,
};
use crate::error::{RetriableError, RetriableResult};

/// A set of arguments that can be rendered for display names
pub trait ArgumentSet {
    /// Render each argument in order
    fn render(&self) -> Vec<String>;
}

impl ArgumentSet for () {
    fn render(&self) -> Vec<String> {
        Vec::new()
    }
}

impl<T: Display> ArgumentSet for Vec<T> {
    fn render(&self) -> Vec<String> {
        self.iter().map(ToString::to_string).collect()
    }
}

impl<T: Display, const N: usize> ArgumentSet for [T; N] {
    fn render(&self) -> Vec<String> {
        self.iter().map(ToString::to_string).collect()
    }
}

macro_rules! impl_argument_set_for_tuple {
    ($($idx:tt $name:ident),+) => {
        impl<$($name: Display),+> ArgumentSet for ($($name,)+) {
            fn render(&self) -> Vec<String> {
                vec![$(self.$idx.to_string()),+]
            }
        }
    };
}

impl_argument_set_for_tuple!(0 A);
impl_argument_set_for_tuple!(0 A, 1 B);
impl_argument_set_for_tuple!(0 A, 1 B, 2 C);
impl_argument_set_for_tuple!(0 A, 1 B, 2 C, 3 D);
impl_argument_set_for_tuple!(0 A, 1 B, 2 C, 3 D, 4 E);
impl_argument_set_for_tuple!(0 A, 1 B, 2 C, 3 D, 4 E, 5 F);

/// Values substituted into a pattern for one attempt
#[derive(Debug, Clone, Copy)]
pub struct FormatContext<'a> {
    /// Parameter-set index, or the attempt number for plain tests
    pub invocation_index: u32,
    /// 1-based attempt number
    pub attempt: u32,
    /// Rendered arguments of the parameter set
    pub arguments: &'a [String],
    /// Whether a retriable failure has been seen in this invocation
    pub is_retry: bool,
}

/// Renders attempt display names from a pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayNameFormatter {
    pattern: String,
    display_name: String,
}

impl DisplayNameFormatter {
    /// Create a formatter; a blank pattern is a configuration error
    pub fn new<P: Into<String>, N: Into<String>>(pattern: P, display_name: N) -> RetriableResult<Self> {
        let pattern = pattern.into().trim().to_string();
        if pattern.is_empty() {
            return Err(CommonError::config_field(
                "name",
                "Configuration error: name must be declared with a non-empty value",
            )
            .into());
        }
        Ok(Self { pattern, display_name: display_name.into() })
    }

    /// The trimmed pattern
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// The logical display name substituted for `{displayName}`
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Render the display name for one attempt
    ///
    /// A retry marker ` [Retry n]` is appended when `is_retry` is set.
    pub fn format(&self, context: &FormatContext<'_>) -> RetriableResult<String> {
        let mut out = String::with_capacity(self.pattern.len() + self.display_name.len());
        let mut chars = self.pattern.chars().peekable();

        while let Some(ch) = chars.next() {
            match ch {
                '\'' => {
                    if chars.peek() == Some(&'\'') {
                        chars.next();
                        out.push('\'');
                        continue;
                    }
                    // quoted run; an unterminated quote runs to the end
                    while let Some(quoted) = chars.next() {
                        if quoted == '\'' {
                            if chars.peek() == Some(&'\'') {
                                chars.next();
                                out.push('\'');
                                continue;
                            }
                            break;
                        }
                        out.push(quoted);
                    }
                }
                '{' => {
                    let mut token = String::new();
                    let mut closed = false;
                    for inner in chars.by_ref() {
                        match inner {
                            '}' => {
                                closed = true;
                                break;
                            }
                            '{' => return Err(self.invalid("nested braces are not supported")),
                            other => token.push(other),
                        }
                    }
                    if !closed {
                        return Err(self.invalid("unmatched braces"));
                    }
                    self.substitute(token.trim(), context, &mut out)?;
                }
                other => out.push(other),
            }
        }

        if context.is_retry {
            out.push_str(&format!(" [Retry {}]", context.attempt));
        }
        Ok(out)
    }

    fn substitute(&self, token: &str, context: &FormatContext<'_>, out: &mut String) -> RetriableResult<()> {
        match token {
            DISPLAY_NAME_PLACEHOLDER => out.push_str(&self.display_name),
            INDEX_PLACEHOLDER => out.push_str(&context.invocation_index.to_string()),
            ATTEMPT_PLACEHOLDER => out.push_str(&context.attempt.to_string()),
            ARGUMENTS_PLACEHOLDER => out.push_str(&context.arguments.join(ARGUMENT_SEPARATOR)),
            _ if token.contains(',') => {
                return Err(self.invalid(format!("format styles are not supported: {{{token}}}")));
            }
            _ => {
                let position: usize = token
                    .parse()
                    .map_err(|_| self.invalid(format!("can't parse argument number: {token}")))?;
                match context.arguments.get(position) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push('{');
                        out.push_str(token);
                        out.push('}');
                    }
                }
            }
        }
        Ok(())
    }

    fn invalid<R: Into<String>>(&self, reason: R) -> RetriableError {
        RetriableError::invalid_template(self.pattern.clone(), reason)
    }
}
