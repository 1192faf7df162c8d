//! API error type and the `{success, data, message}` response envelope.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::db::StorageError;

pub type ApiResult<T> = Result<T, ApiError>;

/// Every variant's message is safe to show to clients; causes go to the log.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Unauthenticated(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("Database operation failed")]
    Storage(#[from] StorageError),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn unauthenticated(msg: impl Into<String>) -> Self {
        Self::Unauthenticated(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Logs `cause` and keeps only `msg` for the response.
    pub fn internal(msg: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        let msg = msg.into();
        error!(error = %cause, "{}", msg);
        Self::Internal(msg)
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Storage(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body: Envelope<()> = Envelope {
            success: false,
            data: None,
            message: Some(self.to_string()),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

/// Successful response wrapped in the envelope.
#[derive(Debug)]
pub struct ApiResponse<T> {
    status: StatusCode,
    body: Envelope<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            status: StatusCode::OK,
            body: Envelope {
                success: true,
                data: Some(data),
                message: None,
            },
        }
    }

    pub fn created(data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            ..Self::ok(data)
        }
    }

    pub fn with_message(mut self, msg: impl Into<String>) -> Self {
        self.body.message = Some(msg.into());
        self
    }
}

impl ApiResponse<()> {
    /// Success with `data: null`.
    pub fn empty(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            body: Envelope {
                success: true,
                data: None,
                message: Some(msg.into()),
            },
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
