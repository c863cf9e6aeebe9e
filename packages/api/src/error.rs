//! Standard error response body.

use i14y_structure::{Error, ErrorKind};
use serde::{Deserialize, Serialize};

/// The JSON body returned for all error responses.
///
/// ```json
/// { "success": false, "error": "Protected", "message": "cannot delete the only dataset" }
/// ```
///
/// | `error` | HTTP status |
/// |---------|-------------|
/// | `NotFound` | 404 |
/// | `InvalidArgument` | 400 |
/// | `Conflict` | 409 |
/// | `Protected` | 403 |
/// | `ParseError` | 400 |
/// | `SchemaMismatch` | 422 |
/// | `NoDatasetFound` | 422 |
/// | `UpstreamUnavailable` | 503 |
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    pub success: bool,
    /// Machine-readable error kind.
    pub error: ErrorKind,
    /// Human-readable description of the problem.
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error,
            message: message.into(),
        }
    }
}

impl From<&Error> for ErrorResponse {
    fn from(e: &Error) -> Self {
        Self::new(e.kind(), e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_kind_name() {
        let e = ErrorResponse::from(&Error::Protected("only dataset".into()));
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "Protected");

        let parse = ErrorResponse::new(ErrorKind::ParseError, "bad");
        assert_eq!(serde_json::to_value(&parse).unwrap()["error"], "ParseError");
    }
}
