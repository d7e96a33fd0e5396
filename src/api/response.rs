use std::collections::BTreeMap;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::error;

use crate::error::{ErrorKind, RegistryError};
use crate::registry::Committed;

/// Non-fatal problem reported alongside a successful write
#[derive(Debug, Clone, Serialize)]
pub struct Warning {
    pub error: &'static str,
    pub message: String,
}

/// Success envelope shared by every endpoint
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    #[serde(skip)]
    status: StatusCode,
    pub success: bool,
    pub message: String,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<Warning>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            status: StatusCode::OK,
            success: true,
            message: message.into(),
            data,
            warning: None,
        }
    }

    pub fn created(message: impl Into<String>, data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            ..Self::ok(message, data)
        }
    }

    /// Wrap a committed write, turning its side-effect failure into a warning
    pub fn committed(message: impl Into<String>, committed: Committed<T>) -> Self {
        let warning = committed.warning.map(|e| Warning {
            error: e.kind().as_str(),
            message: e.to_string(),
        });
        Self {
            warning,
            ..Self::ok(message, committed.value)
        }
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, axum::Json(self)).into_response()
    }
}

/// Failure envelope
#[derive(Debug, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    pub status: StatusCode,
    pub success: bool,
    pub message: String,
    pub error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<BTreeMap<String, String>>,
}

impl ApiError {
    pub fn new(status: StatusCode, error: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            success: false,
            message: message.into(),
            error,
            fields: None,
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "unauthorized", message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::ValidationError.as_str(),
            message,
        )
    }
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::InvalidStatus => StatusCode::BAD_REQUEST,
        ErrorKind::ValidationError => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::StorageUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        let kind = err.kind();
        let message = match kind {
            ErrorKind::Internal => {
                error!(error = %err, "Internal error while handling request");
                "internal server error".to_string()
            }
            _ => err.to_string(),
        };

        let mut api_error = ApiError::new(status_for(kind), kind.as_str(), message);
        if let RegistryError::Validation(fields) = err {
            api_error.fields = Some(fields);
        }
        api_error
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, axum::Json(self)).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<ApiResponse<T>, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_carries_fields() {
        let err = ApiError::from(RegistryError::invalid_field("province", "is required"));
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.error, "validation_error");

        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["fields"]["province"], "is required");
    }

    #[test]
    fn test_internal_errors_hide_details() {
        let err = ApiError::from(RegistryError::Database(sqlx::Error::PoolTimedOut));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, "internal server error");
    }

    #[test]
    fn test_committed_warning_is_serialized() {
        let committed = Committed {
            value: 5,
            warning: Some(RegistryError::StorageUnavailable("converter missing".to_string())),
        };
        let json = serde_json::to_value(ApiResponse::committed("done", committed)).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["data"], 5);
        assert_eq!(json["warning"]["error"], "storage_unavailable");

        let clean = serde_json::to_value(ApiResponse::ok("done", 5)).unwrap();
        assert!(clean.get("warning").is_none());
    }
}
