use axum::{Json, extract::State, response::IntoResponse};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use sea_orm::*;
use tracing::instrument;

use crate::entity::{profile, role_permission, user};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::{AuthUser, TOKEN_COOKIE};
use crate::extractors::validated::AppJson;
use crate::models::auth::{LoginRequest, LoginResponse, MeResponse, validate_login_request};
use crate::models::shared::MessageResponse;
use crate::state::AppState;
use crate::utils::{hash, jwt};

#[utoipa::path(
    post,
    path = "/login",
    tag = "Auth",
    operation_id = "login",
    summary = "Log in",
    description = "Checks the credentials and returns a JWT. The token is also set as an HTTP-only `token` cookie for form clients. Accounts whose profile is disabled cannot log in.",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Bad credentials (INVALID_CREDENTIALS)", body = ErrorBody),
        (status = 403, description = "Profile disabled (ACCOUNT_DISABLED)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, jar, payload), fields(username = %payload.username))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_login_request(&payload)?;

    let username = payload.username.trim();

    let user = user::Entity::find()
        .filter(user::Column::Username.eq(username))
        .one(&state.db)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    let is_valid = hash::verify_password(&payload.password, &user.password)
        .map_err(|e| AppError::Internal(format!("Password verify error: {}", e)))?;

    if !is_valid {
        return Err(AppError::InvalidCredentials);
    }

    let profile = profile::Entity::find()
        .filter(profile::Column::UserId.eq(user.id))
        .one(&state.db)
        .await?;

    if let Some(ref p) = profile
        && !p.active
    {
        tracing::info!(user_id = user.id, "Login refused for disabled profile");
        return Err(AppError::AccountDisabled);
    }

    let permissions: Vec<String> = match profile {
        Some(ref p) => role_permission::Entity::find()
            .filter(role_permission::Column::Role.eq(&p.role))
            .all(&state.db)
            .await?
            .into_iter()
            .map(|rp| rp.permission)
            .collect(),
        None => Vec::new(),
    };

    let role = profile.as_ref().map(|p| p.role.clone());
    let token = jwt::sign(
        jwt::TokenSubject {
            user_id: user.id,
            username: &user.username,
            profile_id: profile.as_ref().map(|p| p.id),
            role: role.as_deref(),
            superuser: user.is_superuser,
            permissions: permissions.clone(),
        },
        &state.config.auth.jwt_secret,
        state.config.auth.token_ttl_hours,
    )
    .map_err(|e| AppError::Internal(format!("JWT sign error: {}", e)))?;

    let cookie = Cookie::build((TOKEN_COOKIE, token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax);

    Ok((
        jar.add(cookie),
        Json(LoginResponse {
            token,
            username: user.username,
            role,
            superuser: user.is_superuser,
            permissions,
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/logout",
    tag = "Auth",
    operation_id = "logout",
    summary = "Log out",
    description = "Clears the `token` cookie. Bearer tokens stay valid until they expire.",
    responses(
        (status = 200, description = "Logged out", body = MessageResponse),
    ),
)]
#[instrument(skip(jar))]
pub async fn logout(jar: CookieJar) -> impl IntoResponse {
    (
        jar.remove(Cookie::build(TOKEN_COOKIE).path("/")),
        Json(MessageResponse {
            message: "Logged out.".into(),
        }),
    )
}

#[utoipa::path(
    get,
    path = "/me",
    tag = "Auth",
    operation_id = "getMe",
    summary = "Get current user",
    description = "Returns the identity carried by the caller's token.",
    responses(
        (status = 200, description = "Current user", body = MeResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Profile disabled (ACCOUNT_DISABLED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(auth_user), fields(user_id = auth_user.user_id))]
pub async fn me(auth_user: AuthUser) -> Json<MeResponse> {
    Json(MeResponse {
        id: auth_user.user_id,
        username: auth_user.username,
        profile_id: auth_user.profile_id,
        role: auth_user.role,
        superuser: auth_user.superuser,
        permissions: auth_user.permissions,
    })
}
