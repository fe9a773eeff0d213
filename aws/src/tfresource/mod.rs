//! Resource helpers shared by every service package: the error type,
//! the state-change waiter and retry loops.

mod retry;
mod wait;

pub use retry::{
    retry_when, retry_when_is_a_error_message_contains, retry_when_new_resource_not_found,
    retry_while_access_denied,
};
pub use wait::StateChangeConf;

use crate::timeouts::format_duration;
use aws_smithy_runtime_api::client::result::SdkError;
use aws_smithy_types::error::display::DisplayErrorContext;
use aws_smithy_types::error::metadata::ProvideErrorMetadata;
use aws_smithy_types::error::operation::BuildError;
use std::fmt;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{message}")]
    NotFound { message: String },

    #[error("empty result")]
    EmptyResult,

    #[error("too many results: wanted 1, got {0}")]
    TooManyResults(usize),

    #[error(
        "timeout while waiting for state to become '{}' (last state: '{last_state}', timeout: {}){}",
        .expected.join(", "),
        timeout_display(.timeout),
        last_error_suffix(.last_error)
    )]
    Timeout {
        last_state: String,
        expected: Vec<String>,
        timeout: Duration,
        last_error: Option<String>,
    },

    #[error(
        "unexpected state '{state}', wanted target '{}'{}",
        .expected.join(", "),
        last_error_suffix(.last_error)
    )]
    UnexpectedState {
        state: String,
        expected: Vec<String>,
        last_error: Option<String>,
    },

    #[error("operation cancelled")]
    Cancelled,

    #[error("{display}")]
    Aws {
        code: Option<String>,
        message: Option<String>,
        display: String,
    },

    #[error("{0}")]
    Other(String),
}

fn timeout_display(timeout: &Duration) -> String {
    format_duration(*timeout)
}

fn last_error_suffix(last_error: &Option<String>) -> String {
    match last_error {
        Some(err) => format!(". last error: {err}"),
        None => String::new(),
    }
}

impl Error {
    pub fn not_found(message: impl fmt::Display) -> Self {
        Error::NotFound {
            message: message.to_string(),
        }
    }

    /// Attaches a status reason to a waiter failure. Other errors pass
    /// through unchanged.
    pub fn with_last_error(self, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        if reason.is_empty() {
            return self;
        }
        match self {
            Error::Timeout {
                last_state,
                expected,
                timeout,
                ..
            } => Error::Timeout {
                last_state,
                expected,
                timeout,
                last_error: Some(reason),
            },
            Error::UnexpectedState {
                state, expected, ..
            } => Error::UnexpectedState {
                state,
                expected,
                last_error: Some(reason),
            },
            other => other,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }
}

impl<E, R> From<SdkError<E, R>> for Error
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: fmt::Debug + Send + Sync + 'static,
{
    fn from(err: SdkError<E, R>) -> Self {
        let (code, message) = match err.as_service_error() {
            Some(service_err) => (
                service_err.code().map(str::to_string),
                service_err.message().map(str::to_string),
            ),
            None => (None, None),
        };
        Error::Aws {
            code,
            message,
            display: DisplayErrorContext(&err).to_string(),
        }
    }
}

impl From<BuildError> for Error {
    fn from(err: BuildError) -> Self {
        Error::Other(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

// Roughly thirty years, the same horizon tokio uses for "never".
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// `timeout` from now, saturating instead of overflowing the clock.
pub(crate) fn deadline_after(timeout: Duration) -> tokio::time::Instant {
    let now = tokio::time::Instant::now();
    now.checked_add(timeout).unwrap_or_else(|| now + FAR_FUTURE)
}

/// Reports whether the error means the remote object does not exist.
pub fn not_found(err: &Error) -> bool {
    matches!(err, Error::NotFound { .. } | Error::EmptyResult)
}

/// Returns the only element of `items`.
pub fn assert_single_value_result<T>(items: Vec<T>) -> Result<T> {
    let count = items.len();
    let mut items = items.into_iter();
    match (items.next(), count) {
        (Some(item), 1) => Ok(item),
        (None, _) => Err(Error::EmptyResult),
        (Some(_), n) => Err(Error::TooManyResults(n)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_value_result() {
        assert_eq!(assert_single_value_result(vec!["wg"]).unwrap(), "wg");

        let empty = assert_single_value_result::<&str>(vec![]).unwrap_err();
        assert!(matches!(empty, Error::EmptyResult));
        assert!(not_found(&empty));

        let many = assert_single_value_result(vec![1, 2, 3]).unwrap_err();
        assert!(matches!(many, Error::TooManyResults(3)));
        assert!(!not_found(&many));
        assert_eq!(many.to_string(), "too many results: wanted 1, got 3");
    }

    #[test]
    fn deadline_saturates_for_huge_timeouts() {
        let now = tokio::time::Instant::now();
        assert!(deadline_after(Duration::MAX) > now);
        assert!(deadline_after(Duration::from_secs(60)) >= now + Duration::from_secs(60));
    }

    #[test]
    fn timeout_message_names_states_and_duration() {
        let err = Error::Timeout {
            last_state: "CREATING".into(),
            expected: vec!["AVAILABLE".into()],
            timeout: Duration::from_secs(600),
            last_error: None,
        };
        assert_eq!(
            err.to_string(),
            "timeout while waiting for state to become 'AVAILABLE' (last state: 'CREATING', timeout: 10m0s)"
        );
        assert!(err.is_timeout());
    }

    #[test]
    fn unexpected_state_carries_status_reason() {
        let err = Error::UnexpectedState {
            state: "CREATE_FAILED".into(),
            expected: vec!["ACTIVE".into()],
            last_error: None,
        }
        .with_last_error("blueprint not enabled");

        assert_eq!(
            err.to_string(),
            "unexpected state 'CREATE_FAILED', wanted target 'ACTIVE'. last error: blueprint not enabled"
        );
    }

    #[test]
    fn with_last_error_leaves_other_errors_alone() {
        let err = Error::not_found("gone").with_last_error("ignored");
        assert_eq!(err.to_string(), "gone");
        assert!(not_found(&err));
    }
}
