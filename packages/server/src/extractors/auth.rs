use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::CookieJar;
use sea_orm::EntityTrait;

use crate::entity::profile;
use crate::error::AppError;
use crate::state::AppState;
use crate::utils::jwt;

/// Cookie carrying the JWT for form-based clients.
pub const TOKEN_COOKIE: &str = "token";

/// Authenticated user extracted from the `Authorization: Bearer <token>` header
/// or, failing that, the `token` cookie.
///
/// Add this as a handler parameter to require authentication.
/// Permission checks happen via `require_permission()` in the handler body.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i32,
    pub username: String,
    pub profile_id: Option<i32>,
    pub role: Option<String>,
    pub superuser: bool,
    pub permissions: Vec<String>,
}

impl AuthUser {
    /// Superusers hold every permission.
    pub fn has_permission(&self, permission: &str) -> bool {
        self.superuser || self.permissions.iter().any(|p| p == permission)
    }

    /// Returns `Ok(())` if the user has the given permission, `Err(PermissionDenied)` otherwise.
    pub fn require_permission(&self, permission: &str) -> Result<(), AppError> {
        if self.has_permission(permission) {
            Ok(())
        } else {
            Err(AppError::PermissionDenied)
        }
    }
}

fn bearer_token(parts: &Parts) -> Result<Option<String>, AppError> {
    let Some(header) = parts.headers.get("Authorization") else {
        return Ok(None);
    };
    let value = header.to_str().map_err(|_| AppError::TokenInvalid)?;
    let token = value
        .strip_prefix("Bearer ")
        .ok_or(AppError::TokenInvalid)?;
    Ok(Some(token.to_string()))
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = match bearer_token(parts)? {
            Some(token) => token,
            None => {
                let jar = CookieJar::from_headers(&parts.headers);
                jar.get(TOKEN_COOKIE)
                    .map(|c| c.value().to_string())
                    .ok_or(AppError::TokenMissing)?
            }
        };

        let claims = jwt::verify(&token, &state.config.auth.jwt_secret)
            .map_err(|_| AppError::TokenInvalid)?;

        // Tokens outlive a profile being disabled, so re-check on every request.
        if let Some(pid) = claims.pid {
            let active = profile::Entity::find_by_id(pid)
                .one(&state.db)
                .await?
                .map(|p| p.active)
                .unwrap_or(false);
            if !active {
                return Err(AppError::AccountDisabled);
            }
        }

        Ok(AuthUser {
            user_id: claims.uid,
            username: claims.sub,
            profile_id: claims.pid,
            role: claims.role,
            superuser: claims.superuser,
            permissions: claims.permissions,
        })
    }
}
