//! Error taxonomy shared by every core operation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Every failure a core operation can report.
///
/// Input-data problems always surface as one of these variants; the core
/// does not panic on malformed input.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
    /// A referenced node or edge id is absent.
    #[error("not found: {0}")]
    NotFound(String),

    /// A field or shape invariant would be violated.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An edge between the same ordered pair already exists.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Attempted deletion of the sole dataset.
    #[error("protected: {0}")]
    Protected(String),

    /// A malformed import payload.
    #[error("parse error: {0}")]
    Parse(String),

    /// A recoverable per-node import anomaly.
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Export requires a dataset node.
    #[error("no dataset node found")]
    NoDatasetFound,

    /// The concept lookup collaborator failed or timed out.
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Error::Conflict(_) => ErrorKind::Conflict,
            Error::Protected(_) => ErrorKind::Protected,
            Error::Parse(_) => ErrorKind::ParseError,
            Error::SchemaMismatch(_) => ErrorKind::SchemaMismatch,
            Error::NoDatasetFound => ErrorKind::NoDatasetFound,
            Error::UpstreamUnavailable(_) => ErrorKind::UpstreamUnavailable,
        }
    }
}

/// The discriminant of an [`Error`], as it appears on the wire.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    InvalidArgument,
    Conflict,
    Protected,
    ParseError,
    SchemaMismatch,
    NoDatasetFound,
    UpstreamUnavailable,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "NotFound",
            ErrorKind::InvalidArgument => "InvalidArgument",
            ErrorKind::Conflict => "Conflict",
            ErrorKind::Protected => "Protected",
            ErrorKind::ParseError => "ParseError",
            ErrorKind::SchemaMismatch => "SchemaMismatch",
            ErrorKind::NoDatasetFound => "NoDatasetFound",
            ErrorKind::UpstreamUnavailable => "UpstreamUnavailable",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

// --- tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names_match_wire_format() {
        assert_eq!(Error::Parse("x".into()).kind().as_str(), "ParseError");
        assert_eq!(Error::NoDatasetFound.kind().to_string(), "NoDatasetFound");
        assert_eq!(
            serde_json::to_string(&ErrorKind::Protected).unwrap(),
            r#""Protected""#
        );
    }
}
