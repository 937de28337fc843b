use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use oracle_core::error::Error;
use serde::Serialize;

/// Wraps a core [`Error`] with the HTTP status it maps to, per the error
/// taxonomy: each code carries one status and never leaks the oracle
/// private key, a `k` value, or an internal stack trace.
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        ApiError(e)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::InvalidTimeFormat(_)
            | Error::InstantTooLate(_)
            | Error::InstantNotYetDue(_)
            | Error::UnsupportedEventType(_) => StatusCode::BAD_REQUEST,
            Error::UnknownAsset(_) | Error::NotFound => StatusCode::NOT_FOUND,
            Error::FeedUnavailable(_) => StatusCode::BAD_GATEWAY,
            Error::CryptoFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::StorageFailure(_) | Error::DuplicateKey | Error::SealConflict => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            log::error!("internal error: {}", self.0);
        }

        let body = ErrorBody {
            code: self.0.code(),
            message: self.0.to_string(),
        };

        (status, Json(body)).into_response()
    }
}
