//! Application-level error type returned by handlers.
//!
//! All variants serialise to the [`ErrorResponse`] JSON format and map to
//! an HTTP status code derived from the error kind.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use i14y_structure::{Error, ErrorKind};
use i14y_structure_api::ErrorResponse;

/// An error that a handler can return; converts directly to an HTTP response.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A failure of a graph, import or lookup operation.
    #[error(transparent)]
    Core(#[from] Error),
    /// A malformed request that never reached the graph, such as a missing
    /// multipart field.
    #[error("{0}")]
    BadRequest(String),
}

/// HTTP status of an error kind.
pub fn status_of(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::InvalidArgument | ErrorKind::ParseError => StatusCode::BAD_REQUEST,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Protected => StatusCode::FORBIDDEN,
        ErrorKind::SchemaMismatch | ErrorKind::NoDatasetFound => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        ErrorKind::UpstreamUnavailable => StatusCode::SERVICE_UNAVAILABLE,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = match &self {
            AppError::Core(e) => ErrorResponse::from(e),
            AppError::BadRequest(msg) => ErrorResponse::new(ErrorKind::InvalidArgument, msg),
        };
        (status_of(body.error), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_statuses() {
        let cases = [
            (Error::NotFound("n".into()), StatusCode::NOT_FOUND),
            (Error::InvalidArgument("i".into()), StatusCode::BAD_REQUEST),
            (Error::Conflict("c".into()), StatusCode::CONFLICT),
            (Error::Protected("p".into()), StatusCode::FORBIDDEN),
            (Error::Parse("p".into()), StatusCode::BAD_REQUEST),
            (Error::SchemaMismatch("s".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (Error::NoDatasetFound, StatusCode::UNPROCESSABLE_ENTITY),
            (Error::UpstreamUnavailable("u".into()), StatusCode::SERVICE_UNAVAILABLE),
        ];
        for (err, status) in cases {
            assert_eq!(AppError::from(err).into_response().status(), status);
        }
    }

    #[test]
    fn bad_request_is_invalid_argument() {
        let resp = AppError::BadRequest("missing file".into()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
