// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::{error, warn};

use crate::llm::CompletionError;
use crate::rag::RagError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error_type: String,
    /// Stable machine-readable code (e.g. `INDEX_NOT_READY`)
    pub code: String,
    pub message: String,
    pub request_id: Option<String>,
    pub details: Option<HashMap<String, serde_json::Value>>,
}

#[derive(Debug, Clone)]
pub enum ApiError {
    NotFound(String),
    InvalidRequest { code: &'static str, message: String },
    ValidationError { field: String, message: String },
    PayloadTooLarge(String),
    /// No index has been built yet
    NotReady(String),
    /// A required collaborator (API key, model) is not configured
    ServiceUnavailable { code: &'static str, message: String },
    RateLimitExceeded { retry_after: Option<u64> },
    /// The completion API failed or rejected the request
    Upstream { code: &'static str, message: String },
    Timeout,
    InternalError(String),
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::InvalidRequest { code, .. }
            | ApiError::ServiceUnavailable { code, .. }
            | ApiError::Upstream { code, .. } => code,
            ApiError::ValidationError { .. } => "VALIDATION_ERROR",
            ApiError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            ApiError::NotReady(_) => "INDEX_NOT_READY",
            ApiError::RateLimitExceeded { .. } => "RATE_LIMITED",
            ApiError::Timeout => "COMPLETION_TIMEOUT",
            ApiError::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    pub fn to_response(&self, request_id: Option<String>) -> ErrorResponse {
        let (error_type, message, details) = match self {
            ApiError::NotFound(msg) => ("not_found", msg.clone(), None),
            ApiError::InvalidRequest { message, .. } => ("invalid_request", message.clone(), None),
            ApiError::ValidationError { field, message } => {
                let mut details = HashMap::new();
                details.insert(
                    "field".to_string(),
                    serde_json::Value::String(field.clone()),
                );
                ("validation_error", message.clone(), Some(details))
            }
            ApiError::PayloadTooLarge(msg) => ("payload_too_large", msg.clone(), None),
            ApiError::NotReady(msg) => ("not_ready", msg.clone(), None),
            ApiError::ServiceUnavailable { message, .. } => {
                ("service_unavailable", message.clone(), None)
            }
            ApiError::RateLimitExceeded { retry_after } => {
                let details = retry_after.map(|secs| {
                    let mut details = HashMap::new();
                    details.insert(
                        "retryAfter".to_string(),
                        serde_json::Value::Number(secs.into()),
                    );
                    details
                });
                (
                    "rate_limit_exceeded",
                    "The language model is rate limited, please try again shortly".to_string(),
                    details,
                )
            }
            ApiError::Upstream { message, .. } => ("upstream_error", message.clone(), None),
            ApiError::Timeout => (
                "timeout",
                "The language model did not respond in time".to_string(),
                None,
            ),
            ApiError::InternalError(msg) => ("internal_error", msg.clone(), None),
        };

        ErrorResponse {
            error_type: error_type.to_string(),
            code: self.code().to_string(),
            message,
            request_id,
            details,
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::NotFound(_) => 404,
            ApiError::InvalidRequest { .. } | ApiError::ValidationError { .. } => 400,
            ApiError::PayloadTooLarge(_) => 413,
            ApiError::NotReady(_) => 409,
            ApiError::ServiceUnavailable { .. } => 503,
            ApiError::RateLimitExceeded { .. } => 429,
            ApiError::Upstream { .. } => 502,
            ApiError::Timeout => 504,
            ApiError::InternalError(_) => 500,
        }
    }

    /// Render as an HTTP response carrying `request_id`
    pub fn into_response_with_id(self, request_id: impl Into<String>) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            error!("Request failed ({}): {}", self.code(), self);
        } else {
            warn!("Request rejected ({}): {}", self.code(), self);
        }
        (status, Json(self.to_response(Some(request_id.into())))).into_response()
    }
}

impl From<RagError> for ApiError {
    fn from(err: RagError) -> Self {
        let code = err.error_code();
        let message = err.user_message();
        match err {
            RagError::NoFiles
            | RagError::EmptyQuestion
            | RagError::Document(_)
            | RagError::NoText
            | RagError::Config(_) => ApiError::InvalidRequest { code, message },
            RagError::IndexNotReady => ApiError::NotReady(message),
            RagError::MissingApiKey => ApiError::ServiceUnavailable { code, message },
            RagError::Completion(CompletionError::RateLimited { retry_after_secs }) => {
                ApiError::RateLimitExceeded {
                    retry_after: retry_after_secs,
                }
            }
            RagError::Completion(CompletionError::Timeout) => ApiError::Timeout,
            RagError::Completion(_) => ApiError::Upstream { code, message },
            RagError::Index(ref index_err) => match index_err {
                crate::vector::IndexError::ModelMismatch { .. }
                | crate::vector::IndexError::DimensionMismatch { .. } => {
                    ApiError::NotReady(message)
                }
                _ => ApiError::InternalError(message),
            },
            RagError::Internal(_) => ApiError::InternalError(message),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.into_response_with_id(uuid::Uuid::new_v4().to_string())
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::InvalidRequest { message, .. } => write!(f, "Invalid request: {}", message),
            ApiError::ValidationError { field, message } => {
                write!(f, "Validation error for {}: {}", field, message)
            }
            ApiError::PayloadTooLarge(msg) => write!(f, "Payload too large: {}", msg),
            ApiError::NotReady(msg) => write!(f, "Not ready: {}", msg),
            ApiError::ServiceUnavailable { message, .. } => {
                write!(f, "Service unavailable: {}", message)
            }
            ApiError::RateLimitExceeded { retry_after } => match retry_after {
                Some(secs) => write!(f, "Rate limit exceeded, retry after {} seconds", secs),
                None => write!(f, "Rate limit exceeded"),
            },
            ApiError::Upstream { message, .. } => write!(f, "Upstream error: {}", message),
            ApiError::Timeout => write!(f, "Request timed out"),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}
