//! Maps service failures to HTTP responses.
//!
//! Body shape: `{"message": string, "errors"?: {field: [messages]}}`.
//! Causes of upstream and internal failures are logged, never returned.

use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::error;
use serde_json::json;
use taskhub_core::{EntityId, EntityKind, EntityRef, ServiceError, ValidationErrors};
use uuid::Uuid;

const RETRY_AFTER_SECS: &str = "3";

#[derive(Debug)]
pub enum ApiError {
    Service(ServiceError),
    /// Malformed request body (JSON or multipart).
    BadRequest(String),
    PayloadTooLarge,
}

impl ApiError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Service(ServiceError::Internal(message.into()))
    }

    pub fn not_found(kind: EntityKind) -> Self {
        Self::Service(ServiceError::NotFound(EntityRef::new(kind, Uuid::nil())))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Service(err) => service_status(err),
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }
}

/// Parses a path segment as an id; anything malformed cannot name an
/// existing entity.
pub fn parse_id(kind: EntityKind, raw: &str) -> Result<EntityId, ApiError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::not_found(kind))
}

fn service_status(err: &ServiceError) -> StatusCode {
    match err {
        ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
        ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
        ServiceError::ValidationFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ServiceError::Unauthorized => StatusCode::UNAUTHORIZED,
        ServiceError::Upstream { .. } => StatusCode::SERVICE_UNAVAILABLE,
        ServiceError::Repo(_) | ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            Self::Service(ServiceError::NotFound(entity)) => {
                json!({"message": format!("{} not found", entity.kind.label())})
            }
            Self::Service(ServiceError::Forbidden(_)) => json!({"message": "Forbidden"}),
            Self::Service(ServiceError::ValidationFailed(errors)) => validation_body(errors),
            Self::Service(ServiceError::Unauthorized) => json!({"message": "Invalid credentials"}),
            Self::Service(err @ ServiceError::Upstream { .. }) => {
                error!("event=http_error module=http status=error kind=upstream error={err}");
                json!({"message": "Service temporarily unavailable"})
            }
            Self::Service(err) => {
                error!("event=http_error module=http status=error kind=internal error={err}");
                json!({"message": "Server Error"})
            }
            Self::BadRequest(message) => json!({"message": message}),
            Self::PayloadTooLarge => json!({"message": "Payload too large"}),
        };

        let mut response = (status, Json(body)).into_response();
        if matches!(&self, Self::Service(err) if err.is_retryable()) {
            response
                .headers_mut()
                .insert("retry-after", HeaderValue::from_static(RETRY_AFTER_SECS));
        }
        response
    }
}

fn validation_body(errors: &ValidationErrors) -> serde_json::Value {
    json!({
        "message": "The given data was invalid.",
        "errors": errors.fields(),
    })
}

impl From<ServiceError> for ApiError {
    fn from(value: ServiceError) -> Self {
        Self::Service(value)
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(value: ValidationErrors) -> Self {
        Self::Service(ServiceError::ValidationFailed(value))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(value: JsonRejection) -> Self {
        if value.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return Self::PayloadTooLarge;
        }
        Self::BadRequest(value.body_text())
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(value: MultipartRejection) -> Self {
        Self::BadRequest(value.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(value: MultipartError) -> Self {
        if value.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return Self::PayloadTooLarge;
        }
        Self::BadRequest(value.body_text())
    }
}
