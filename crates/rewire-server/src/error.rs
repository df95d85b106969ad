use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// Errors the Ingress surface maps to an HTTP status, per SPEC_FULL.md §7:
/// input errors -> 400, authz -> 401, not-found -> 404, transient storage
/// failures -> 5xx. No variant leaks an internal stack trace in its body.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("unknown expectation: {0}")]
    UnknownExpectation(String),

    #[error("unknown trial, or not pending: {0}")]
    UnknownOrNotPendingTrial(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("missing or invalid bearer token")]
    Unauthorized,

    #[error(transparent)]
    Store(#[from] rewire_store::StoreError),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::UnknownExpectation(_) | Self::UnknownOrNotPendingTrial(_) => {
                (StatusCode::NOT_FOUND, self.to_string())
            }
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            Self::Store(e) if e.is_transient() => {
                tracing::warn!(error = %e, "transient store error");
                (StatusCode::SERVICE_UNAVAILABLE, "storage temporarily unavailable".to_string())
            }
            Self::Store(e) => {
                tracing::warn!(error = %e, "store rejected request");
                (StatusCode::BAD_REQUEST, e.to_string())
            }
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}
