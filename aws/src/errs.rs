//! AWS error classification

use crate::tfresource::Error;

/// The AWS error code of `err`, when it came from an AWS API.
pub fn code(err: &Error) -> Option<&str> {
    match err {
        Error::Aws { code, .. } => code.as_deref(),
        _ => None,
    }
}

pub fn is_a(err: &Error, code: &str) -> bool {
    self::code(err) == Some(code)
}

pub fn is_a_error_message_contains(err: &Error, code: &str, needle: &str) -> bool {
    match err {
        Error::Aws {
            code: Some(c),
            message,
            ..
        } if c == code => message.as_deref().is_some_and(|m| m.contains(needle)),
        _ => false,
    }
}

pub fn is_access_denied(err: &Error) -> bool {
    is_a(err, "AccessDeniedException") || is_a(err, "AccessDenied")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aws(code: &str, message: Option<&str>) -> Error {
        Error::Aws {
            code: Some(code.to_string()),
            message: message.map(str::to_string),
            display: code.to_string(),
        }
    }

    #[test]
    fn matches_code_exactly() {
        let err = aws("ResourceNotFoundException", None);
        assert!(is_a(&err, "ResourceNotFoundException"));
        assert!(!is_a(&err, "ResourceNotFound"));
        assert!(!is_a(&Error::EmptyResult, "ResourceNotFoundException"));
    }

    #[test]
    fn message_must_contain_needle() {
        let err = aws(
            "InvalidRequestException",
            Some("WorkGroup primary is not found."),
        );
        assert!(is_a_error_message_contains(&err, "InvalidRequestException", "is not found"));
        assert!(!is_a_error_message_contains(&err, "InvalidRequestException", "already exists"));
        assert!(!is_a_error_message_contains(&err, "ValidationException", "is not found"));
        assert!(!is_a_error_message_contains(
            &aws("InvalidRequestException", None),
            "InvalidRequestException",
            "is not found"
        ));
    }

    #[test]
    fn access_denied_codes() {
        assert!(is_access_denied(&aws("AccessDeniedException", None)));
        assert!(is_access_denied(&aws("AccessDenied", None)));
        assert!(!is_access_denied(&aws("UnauthorizedException", None)));
    }
}
