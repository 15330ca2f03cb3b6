use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::domain::{DomainError, ErrorKind};
use crate::infrastructure::QueueError;

#[derive(Debug)]
pub enum ApiError {
    Domain(DomainError),
    Queue(QueueError),
    NotFound(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    kind: Option<ErrorKind>,
    retryable: bool,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Domain(e) if e.is_retryable() => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Domain(e) => match e.kind() {
                ErrorKind::InvalidArgument => StatusCode::BAD_REQUEST,
                ErrorKind::NoContext => StatusCode::CONFLICT,
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Queue(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::Domain(e) => ErrorBody {
                error: e.to_string(),
                kind: Some(e.kind()),
                retryable: e.is_retryable(),
            },
            ApiError::Queue(e) => {
                tracing::error!(error = %e, "job queue unavailable");
                ErrorBody {
                    error: "job queue unavailable".into(),
                    kind: None,
                    retryable: true,
                }
            }
            ApiError::NotFound(what) => ErrorBody {
                error: format!("{what} not found"),
                kind: Some(ErrorKind::NotFound),
                retryable: false,
            },
        };

        if status.is_server_error() {
            tracing::warn!(status = status.as_u16(), error = %body.error, "request failed");
        }

        (status, Json(body)).into_response()
    }
}

impl From<DomainError> for ApiError {
    fn from(e: DomainError) -> Self {
        ApiError::Domain(e)
    }
}

impl From<QueueError> for ApiError {
    fn from(e: QueueError) -> Self {
        ApiError::Queue(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (DomainError::no_context("empty"), StatusCode::CONFLICT),
            (DomainError::invalid_argument("k"), StatusCode::BAD_REQUEST),
            (DomainError::timeout("llm"), StatusCode::SERVICE_UNAVAILABLE),
            (DomainError::transient("quota"), StatusCode::SERVICE_UNAVAILABLE),
            (DomainError::internal("bug"), StatusCode::INTERNAL_SERVER_ERROR),
            (
                DomainError::ModelMismatch {
                    expected: "a".into(),
                    actual: "b".into(),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(ApiError::from(error).status(), expected);
        }
    }
}
