use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;

use iou_api::{ApiError, ServiceError};

/// Unified API error type.
///
/// Produces `{"errors": ["<message>", ...]}` JSON responses.
#[derive(Debug)]
pub struct ApiErr {
    status: StatusCode,
    messages: Vec<String>,
}

impl ApiErr {
    fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            messages: vec![msg.into()],
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, msg)
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, msg)
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    /// Build a closure that logs a DB/IO error and returns `500 Internal Server Error`.
    pub fn from_db<E: fmt::Display>(context: &str) -> impl FnOnce(E) -> Self + '_ {
        move |e| {
            tracing::error!("{context}: {e}");
            Self::internal("internal server error")
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<ServiceError> for ApiErr {
    fn from(e: ServiceError) -> Self {
        if let ServiceError::Internal(ref detail) = e {
            tracing::error!("{detail}");
            return Self::internal("internal server error");
        }
        let status = StatusCode::from_u16(e.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self {
            status,
            messages: e.messages(),
        }
    }
}

impl From<JsonRejection> for ApiErr {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiErr {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiErr {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ApiError {
                errors: self.messages,
            }),
        )
            .into_response()
    }
}
