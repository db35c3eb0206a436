//! Error types for Bookshelf server

use std::{any::Any, backtrace::Backtrace};

use axum::{
    extract::rejection::PathRejection,
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

/// Body returned for every unexpected failure
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Content-Type must be application/json")]
    UnsupportedContentType,

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Malformed JSON body: {0}")]
    MalformedBody(#[from] serde_json::Error),

    #[error("Invalid path parameter: {0}")]
    Path(#[from] PathRejection),

    #[error("Failed to read request body: {0}")]
    Body(#[from] axum::Error),

    #[error("No route for {method} {path}")]
    UnmatchedRoute { method: Method, path: String },

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Client error body, `{"Error": "..."}`
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    #[serde(rename = "Error")]
    pub error: String,
}

/// Plain message body, `{"message": "..."}`
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

/// Opaque body for unexpected failures, `{"error": "Internal server error"}`
#[derive(Debug, Serialize, ToSchema)]
pub struct InternalErrorResponse {
    pub error: String,
}

/// Fixed 500 response used by every failure path
pub fn internal_error_response() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(InternalErrorResponse {
            error: INTERNAL_ERROR_MESSAGE.to_string(),
        }),
    )
        .into_response()
}

/// Response for a panic caught while serving a request
pub fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else {
        "unknown panic payload"
    };

    let backtrace = Backtrace::capture();
    tracing::error!(
        backtrace = %backtrace,
        "Unhandled exception: handler panicked: {}",
        detail
    );
    internal_error_response()
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::UnsupportedContentType => (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: self.to_string(),
                }),
            )
                .into_response(),
            AppError::Validation(message) => {
                (StatusCode::BAD_REQUEST, Json(MessageResponse { message })).into_response()
            }
            AppError::NotFound(error) => {
                (StatusCode::NOT_FOUND, Json(ErrorResponse { error })).into_response()
            }
            other => {
                tracing::error!(
                    error = ?other,
                    "Unhandled exception: {}",
                    error_chain(&other)
                );
                internal_error_response()
            }
        }
    }
}

/// Render an error followed by its sources, `outer: inner: root`
fn error_chain(error: &dyn std::error::Error) -> String {
    let mut rendered = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        rendered.push_str(": ");
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }
    rendered
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
