use axum::{
    response::{IntoResponse, Response},
    Json,
};
use http::StatusCode;
use serde::Serialize;
use tracing::{debug, error};
use yamdb_types::DenyReason;

pub type ApiResult<T, E = ApiError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Validation error ({code}): {message}")]
    Validation { code: &'static str, message: String },

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Not allowed: {}", .0.message())]
    Forbidden(DenyReason),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid confirmation code")]
    InvalidCode,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation {
            code: "invalid",
            message: message.into(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Validation { .. } | ApiError::InvalidQuery(_) => "validation_error",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::NotFound(_) => "not_found",
            ApiError::InvalidCode => "invalid_code",
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::Internal(_) => "internal_error",
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::Validation { code, .. } => code,
            ApiError::InvalidQuery(_) => "invalid_query",
            ApiError::Forbidden(DenyReason::Unauthenticated) => "not_authenticated",
            ApiError::Forbidden(DenyReason::Forbidden) => "permission_denied",
            ApiError::NotFound(_) => "not_found",
            ApiError::InvalidCode => "invalid_code",
            ApiError::Unauthorized(_) => "invalid_token",
            ApiError::Internal(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } | ApiError::InvalidQuery(_) | ApiError::InvalidCode => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub kind: &'static str,
    pub code: &'static str,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = match &self {
            ApiError::Internal(msg) => {
                error!(error = %msg, "Internal error");
                "An internal error occurred".to_string()
            }
            ApiError::Validation { message, .. } => message.clone(),
            ApiError::InvalidQuery(msg) => msg.clone(),
            ApiError::Forbidden(reason) => reason.message().to_string(),
            ApiError::NotFound(what) => format!("{what} not found"),
            ApiError::InvalidCode => "Invalid or expired confirmation code".to_string(),
            ApiError::Unauthorized(_) => "Invalid or expired token".to_string(),
        };
        let body = ErrorBody {
            kind: self.kind(),
            code: self.code(),
            message,
        };
        (self.status(), Json(body)).into_response()
    }
}

impl From<yamdb_dal::Error> for ApiError {
    fn from(value: yamdb_dal::Error) -> Self {
        use yamdb_dal::Error as DalError;
        match value {
            DalError::RecordNotFound(what) => ApiError::NotFound(what),
            DalError::InvalidOrderByField(field) => {
                ApiError::InvalidQuery(format!("Invalid order by field: {field}"))
            }
            DalError::UnknownReference { entity, slug } => ApiError::Validation {
                code: "unknown_reference",
                message: format!("Unknown {entity}: {slug}"),
            },
            DalError::UniqueViolation(msg) => {
                debug!("Unique constraint violated: {msg}");
                ApiError::Validation {
                    code: "unique",
                    message: "Record with the same unique value already exists".to_string(),
                }
            }
            DalError::DuplicateReview => ApiError::Validation {
                code: "duplicate_review",
                message: "You have already reviewed this title".to_string(),
            },
            e @ (DalError::DatabaseError(_) | DalError::MigrationError(_)) => {
                ApiError::Internal(e.to_string())
            }
        }
    }
}

impl From<yamdb_auth::Error> for ApiError {
    fn from(value: yamdb_auth::Error) -> Self {
        ApiError::Internal(value.to_string())
    }
}

impl From<DenyReason> for ApiError {
    fn from(value: DenyReason) -> Self {
        ApiError::Forbidden(value)
    }
}

impl From<garde::Report> for ApiError {
    fn from(value: garde::Report) -> Self {
        ApiError::validation(value.to_string())
    }
}
