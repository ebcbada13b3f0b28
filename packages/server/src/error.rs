use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::{DbErr, SqlErr};
use serde::Serialize;

/// Structured error response returned by all endpoints on failure.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Machine-readable error code. One of: `VALIDATION_ERROR`, `DATE_TOO_EARLY`,
    /// `DATE_TOO_LATE`, `TOKEN_MISSING`, `TOKEN_INVALID`, `INVALID_CREDENTIALS`,
    /// `PERMISSION_DENIED`, `PROFILE_REQUIRED`, `ACCOUNT_DISABLED`, `NOT_FOUND`,
    /// `CONFLICT`, `USERNAME_TAKEN`, `INTERNAL_ERROR`.
    #[schema(example = "VALIDATION_ERROR")]
    pub code: &'static str,
    /// Human-readable error description.
    #[schema(example = "Name must be 1-50 characters")]
    pub message: String,
}

/// Application-level error type.
#[derive(Debug)]
pub enum AppError {
    Validation(String),
    /// Requested date falls before the activity window.
    TooEarly(String),
    /// Requested date falls after the activity window.
    TooLate(String),
    TokenMissing,
    TokenInvalid,
    InvalidCredentials,
    PermissionDenied,
    /// The caller has no profile to attribute the write to.
    ProfileRequired,
    AccountDisabled,
    NotFound(String),
    Conflict(String),
    UsernameTaken,
    Internal(String),
}

impl AppError {
    /// The machine-readable code sent in [`ErrorBody::code`].
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::TooEarly(_) => "DATE_TOO_EARLY",
            AppError::TooLate(_) => "DATE_TOO_LATE",
            AppError::TokenMissing => "TOKEN_MISSING",
            AppError::TokenInvalid => "TOKEN_INVALID",
            AppError::InvalidCredentials => "INVALID_CREDENTIALS",
            AppError::PermissionDenied => "PERMISSION_DENIED",
            AppError::ProfileRequired => "PROFILE_REQUIRED",
            AppError::AccountDisabled => "ACCOUNT_DISABLED",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::UsernameTaken => "USERNAME_TAKEN",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// The message shown to the user. Internal details are never exposed.
    pub fn message(&self) -> String {
        match self {
            AppError::Validation(msg)
            | AppError::TooEarly(msg)
            | AppError::TooLate(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg) => msg.clone(),
            AppError::TokenMissing => "Authentication required".into(),
            AppError::TokenInvalid => "Invalid or expired token".into(),
            AppError::InvalidCredentials => "Invalid username or password".into(),
            AppError::PermissionDenied => "Insufficient permissions".into(),
            AppError::ProfileRequired => {
                "Your account has no profile; attendance cannot be attributed".into()
            }
            AppError::AccountDisabled => {
                "Your account is disabled. Contact an administrator".into()
            }
            AppError::UsernameTaken => "Username is already taken".into(),
            AppError::Internal(_) => "An unexpected error occurred".into(),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::TooEarly(_) | AppError::TooLate(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::TokenMissing | AppError::TokenInvalid | AppError::InvalidCredentials => {
                StatusCode::UNAUTHORIZED
            }
            AppError::PermissionDenied | AppError::ProfileRequired | AppError::AccountDisabled => {
                StatusCode::FORBIDDEN
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) | AppError::UsernameTaken => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Internal(detail) = &self {
            tracing::error!("Internal error: {}", detail);
        }

        let status = self.status();
        let body = ErrorBody {
            code: self.code(),
            message: self.message(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => {
                tracing::debug!("Unique constraint violated: {detail}");
                AppError::Conflict("A record with the same unique values already exists".into())
            }
            _ => AppError::Internal(err.to_string()),
        }
    }
}
