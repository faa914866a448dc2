use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue, json};

use crate::engine::{FaultKind, ResolveError, SimulatedFault};
use crate::sharing::SharingError;
use crate::store::StoreError;

/// Error response type
///
/// Pagination and simulated errors carry extra context fields
/// (`records`, `index`, `errorIndex`, ...) next to these.
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub message: String,
    #[serde(rename = "errorType", default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
}

/// Response type for health check endpoint
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

/// Response type for unhealthy status
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct UnhealthyResponse {
    pub status: String,
    pub error: String,
}

/// Custom error type for API endpoints
///
/// This error type provides consistent error handling across all endpoints,
/// automatically mapping different error types to appropriate HTTP status codes
/// and formatting them as JSON responses.
#[derive(Debug)]
pub enum ApiError {
    /// Malformed request body or parameter
    InvalidRequest(String),
    /// Missing or malformed principal
    Unauthorized(String),
    NotFound(String),
    /// Uniqueness constraint violated
    Conflict(String),
    /// Database operation error
    DatabaseError(anyhow::Error),
    /// Dynamic resolution failure
    Resolve(ResolveError),
}

/// Status, message, error type and context of a failed resolution
struct ErrorParts {
    status: StatusCode,
    message: String,
    error_type: Option<&'static str>,
    context: Map<String, JsonValue>,
}

impl ErrorParts {
    fn plain(status: StatusCode, message: String) -> Self {
        Self {
            status,
            message,
            error_type: None,
            context: Map::new(),
        }
    }
}

fn fault_status(kind: FaultKind) -> StatusCode {
    match kind {
        FaultKind::PerrorSimulation => StatusCode::INTERNAL_SERVER_ERROR,
        FaultKind::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
        FaultKind::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        FaultKind::RequestTimeout => StatusCode::REQUEST_TIMEOUT,
        FaultKind::BadGateway => StatusCode::BAD_GATEWAY,
        FaultKind::ForbiddenAccess => StatusCode::FORBIDDEN,
    }
}

fn fault_context(fault: &SimulatedFault) -> Map<String, JsonValue> {
    let mut context = Map::new();
    context.insert("records".into(), json!(fault.records));
    context.insert("index".into(), json!(fault.index));
    context.insert("errorIndex".into(), json!(fault.error_index));
    context.insert(
        "requestedRange".into(),
        json!({ "start": fault.index, "end": fault.range_end() }),
    );
    context.insert("retryable".into(), json!(fault.kind.retryable()));
    if let Some(secs) = fault.kind.retry_after_secs() {
        context.insert("retryAfter".into(), json!(secs));
    }
    context
}

fn resolve_parts(err: &ResolveError) -> ErrorParts {
    let message = err.to_string();
    let mut context = Map::new();

    let (status, error_type) = match err {
        ResolveError::InvalidPaginationParameters {
            records,
            index,
            error_index,
            ..
        } => {
            for (key, value) in [("records", records), ("index", index), ("errorIndex", error_index)] {
                if let Some(value) = value {
                    context.insert(key.into(), json!(value));
                }
            }
            (StatusCode::BAD_REQUEST, "INVALID_PAGINATION_PARAMETERS")
        }
        ResolveError::RouteNotFound { path } => {
            context.insert("path".into(), json!(path));
            (StatusCode::NOT_FOUND, "ROUTE_NOT_FOUND")
        }
        ResolveError::UnsupportedResponseType { path, .. } => {
            context.insert("path".into(), json!(path));
            (StatusCode::BAD_REQUEST, "UNSUPPORTED_RESPONSE_TYPE")
        }
        ResolveError::IndexOutOfBounds { records, index, total } => {
            context.insert("records".into(), json!(records));
            context.insert("index".into(), json!(index));
            context.insert("total".into(), json!(total));
            (StatusCode::BAD_REQUEST, "INDEX_OUT_OF_BOUNDS")
        }
        ResolveError::Simulated(fault) => {
            context = fault_context(fault);
            (fault_status(fault.kind), fault.kind.error_type())
        }
        ResolveError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_FAILURE"),
    };

    ErrorParts {
        status,
        message,
        error_type: Some(error_type),
        context,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let parts = match &self {
            ApiError::InvalidRequest(msg) => ErrorParts::plain(StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Unauthorized(msg) => ErrorParts::plain(StatusCode::UNAUTHORIZED, msg.clone()),
            ApiError::NotFound(msg) => ErrorParts::plain(StatusCode::NOT_FOUND, msg.clone()),
            ApiError::Conflict(msg) => ErrorParts::plain(StatusCode::CONFLICT, msg.clone()),
            ApiError::DatabaseError(err) => ErrorParts::plain(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Database error: {}", err),
            ),
            ApiError::Resolve(err) => resolve_parts(err),
        };

        let mut body = Map::new();
        body.insert("message".into(), JsonValue::String(parts.message));
        if let Some(error_type) = parts.error_type {
            body.insert("errorType".into(), JsonValue::String(error_type.to_string()));
        }
        body.extend(parts.context);

        let mut response = (parts.status, Json(JsonValue::Object(body))).into_response();

        if let ApiError::Resolve(ResolveError::Simulated(fault)) = &self {
            if let Some(secs) = fault.kind.retry_after_secs() {
                response
                    .headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from(secs));
            }
        }

        response
    }
}

impl From<ResolveError> for ApiError {
    fn from(err: ResolveError) -> Self {
        ApiError::Resolve(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicatePath { .. } | StoreError::DuplicateEmail { .. } => {
                ApiError::Conflict(err.to_string())
            }
            StoreError::Other(err) => ApiError::DatabaseError(err),
        }
    }
}

impl From<SharingError> for ApiError {
    fn from(err: SharingError) -> Self {
        match err {
            SharingError::InvalidFolder(_) | SharingError::SelfShare => {
                ApiError::InvalidRequest(err.to_string())
            }
            SharingError::UserNotFound(_) => ApiError::NotFound(err.to_string()),
            SharingError::Store(err) => err.into(),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::DatabaseError(err)
    }
}
