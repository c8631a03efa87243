pub mod client;
pub mod codes;
pub mod model;

pub use client::BiteshipClient;
pub use codes::{classify, Classification};

use serde::Deserialize;
use thiserror::Error;

/// A structured error returned by (or about) the logistics provider.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("provider error {code}: {message}")]
pub struct ProviderError {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: Option<i64>,
    error: Option<String>,
    message: Option<String>,
}

impl ProviderError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn unreachable(message: impl Into<String>) -> Self {
        Self::new(codes::ERR_PROVIDER_UNREACHABLE, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(codes::ERR_INVALID_PARSING_RESPONSE, message)
    }

    /// Decode the provider's `{"success": false, "code": .., "error": ..}`
    /// payload. Anything unreadable becomes a parsing failure.
    pub fn from_body(body: &[u8]) -> Self {
        match serde_json::from_slice::<ErrorBody>(body) {
            Ok(ErrorBody {
                code: Some(code),
                error,
                message,
            }) => Self::new(code, error.or(message).unwrap_or_default()),
            _ => Self::invalid_response("Failed to parse error response"),
        }
    }

    pub fn classification(&self) -> Classification {
        classify(self.code)
    }

    pub fn http_status(&self) -> u16 {
        self.classification().http_status
    }

    pub fn is_empty_result(&self) -> bool {
        self.classification().empty_result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_body_reads_code_and_error() {
        let body = br#"{"success": false, "code": 40001010, "error": "No courier"}"#;
        let err = ProviderError::from_body(body);
        assert_eq!(err.code, codes::ERR_RATE_NO_COURIER_AVAILABLE);
        assert_eq!(err.message, "No courier");
        assert!(err.is_empty_result());
    }

    #[test]
    fn test_from_body_with_garbage_is_parsing_failure() {
        for body in [&b""[..], b"<html>502</html>", br#"{"success": false}"#] {
            let err = ProviderError::from_body(body);
            assert_eq!(err.code, codes::ERR_INVALID_PARSING_RESPONSE);
            assert_eq!(err.http_status(), 500);
        }
    }

    #[test]
    fn test_unknown_code_never_panics() {
        let err = ProviderError::from_body(br#"{"code": 77777777, "error": "???"}"#);
        assert_eq!(err.http_status(), 500);
        assert!(!err.is_empty_result());
        assert_eq!(err.classification().message, "Unexpected error from Provider");
    }
}
