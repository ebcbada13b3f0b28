use crate::error::AppError;
use serde::{Deserialize, Serialize};

/// Request body for user login.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    /// Username of the account to log into.
    #[schema(example = "mlopez")]
    pub username: String,
    /// Account password.
    #[schema(example = "s3cure_P@ss!")]
    pub password: String,
}

pub fn validate_login_request(payload: &LoginRequest) -> Result<(), AppError> {
    if payload.username.trim().is_empty() {
        return Err(AppError::Validation("Username must not be empty".into()));
    }
    if payload.password.is_empty() {
        return Err(AppError::Validation("Password must not be empty".into()));
    }
    Ok(())
}

/// Successful login response. The token is also set as the `token` cookie.
#[derive(Serialize, utoipa::ToSchema)]
pub struct LoginResponse {
    /// JWT bearer token.
    #[schema(example = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9...")]
    pub token: String,
    #[schema(example = "mlopez")]
    pub username: String,
    /// Profile role; `null` for accounts without a profile.
    #[schema(example = "trainer")]
    pub role: Option<String>,
    pub superuser: bool,
    /// Permissions granted through the role.
    #[schema(example = json!(["attendance:mark", "attendance:view"]))]
    pub permissions: Vec<String>,
}

/// Current authenticated user.
#[derive(Serialize, utoipa::ToSchema)]
pub struct MeResponse {
    #[schema(example = 42)]
    pub id: i32,
    #[schema(example = "mlopez")]
    pub username: String,
    pub profile_id: Option<i32>,
    #[schema(example = "trainer")]
    pub role: Option<String>,
    pub superuser: bool,
    #[schema(example = json!(["attendance:mark"]))]
    pub permissions: Vec<String>,
}
