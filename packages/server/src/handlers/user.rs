use std::collections::HashMap;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use sea_orm::sea_query::Query as SeaQuery;
use sea_orm::*;
use tracing::instrument;

use crate::entity::{course, profile, role, student, user};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::validated::{AppJson, AppQuery};
use crate::models::shared::{Pagination, like_pattern, page_offset, page_params};
use crate::models::user::*;
use crate::permissions;
use crate::state::AppState;
use crate::utils::hash;
use crate::utils::search::ilike_any;

async fn find_user<C: ConnectionTrait>(conn: &C, id: i32) -> Result<user::Model, AppError> {
    user::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))
}

async fn find_profile<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
) -> Result<Option<profile::Model>, DbErr> {
    profile::Entity::find()
        .filter(profile::Column::UserId.eq(user_id))
        .one(conn)
        .await
}

async fn find_student<C: ConnectionTrait>(
    conn: &C,
    profile: Option<&profile::Model>,
) -> Result<Option<student::Model>, DbErr> {
    let Some(profile) = profile else {
        return Ok(None);
    };
    student::Entity::find()
        .filter(student::Column::ProfileId.eq(profile.id))
        .one(conn)
        .await
}

async fn ensure_course_exists<C: ConnectionTrait>(conn: &C, course_id: i32) -> Result<(), AppError> {
    if course::Entity::find_by_id(course_id).one(conn).await?.is_none() {
        return Err(AppError::Validation("Course not found".into()));
    }
    Ok(())
}

async fn ensure_run_free<C: ConnectionTrait>(
    conn: &C,
    run: &str,
    except_profile: Option<i32>,
) -> Result<(), AppError> {
    let mut query = profile::Entity::find().filter(profile::Column::Run.eq(run));
    if let Some(id) = except_profile {
        query = query.filter(profile::Column::Id.ne(id));
    }
    if query.count(conn).await? > 0 {
        return Err(AppError::Conflict("That RUN is already registered".into()));
    }
    Ok(())
}

async fn user_response<C: ConnectionTrait>(
    conn: &C,
    user: user::Model,
) -> Result<UserResponse, AppError> {
    let profile = find_profile(conn, user.id).await?;
    let student = find_student(conn, profile.as_ref()).await?;
    Ok(UserResponse::new(user, profile, student))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Users",
    operation_id = "registerUser",
    summary = "Register a user",
    description = "Creates a user, its profile and, for the `student` role, its student record in one transaction. Requires `user:manage` permission.",
    request_body = RegisterUserRequest,
    responses(
        (status = 201, description = "User registered", body = UserResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 409, description = "Username or RUN taken (USERNAME_TAKEN, CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(username = %payload.username))]
pub async fn register_user(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission(permissions::USER_MANAGE)?;
    validate_register_request(&payload)?;

    let username = payload.username.trim().to_string();
    let run = payload.run.trim().to_string();

    let hash = hash::hash_password(&payload.password)
        .map_err(|e| AppError::Internal(format!("Password hash error: {}", e)))?;

    let txn = state.db.begin().await?;

    let taken = user::Entity::find()
        .filter(user::Column::Username.eq(&username))
        .count(&txn)
        .await?;
    if taken > 0 {
        return Err(AppError::UsernameTaken);
    }
    ensure_run_free(&txn, &run, None).await?;

    let now = chrono::Utc::now();
    let user = user::ActiveModel {
        username: Set(username),
        password: Set(hash),
        email: Set(payload.email.trim().to_string()),
        first_name: Set(payload.first_name.trim().to_string()),
        last_name: Set(payload.last_name.trim().to_string()),
        is_superuser: Set(false),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await
    .map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            tracing::debug!("Registration race condition: unique constraint caught on insert");
            AppError::UsernameTaken
        }
        _ => AppError::from(e),
    })?;

    let profile = profile::ActiveModel {
        user_id: Set(user.id),
        run: Set(run),
        phone: Set(payload.phone.trim().to_string()),
        address: Set(payload.address.trim().to_string()),
        role: Set(payload.role.clone()),
        active: Set(true),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let student = match (payload.role.as_str(), payload.course_id, payload.admission_date) {
        (role::STUDENT, Some(course_id), Some(admission_date)) => {
            ensure_course_exists(&txn, course_id).await?;
            let model = student::ActiveModel {
                profile_id: Set(profile.id),
                course_id: Set(course_id),
                admission_date: Set(admission_date),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
            Some(model)
        }
        _ => None,
    };

    txn.commit().await?;

    tracing::info!(user_id = user.id, role = %profile.role, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(UserResponse::new(user, Some(profile), student)),
    ))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Users",
    operation_id = "listUsers",
    summary = "List users",
    description = "Paginated list ordered by username. `q` searches username, names, email, RUN, phone, address and role; words like `activo`/`inactivo`, `si`/`no` additionally match the active flag. Requires `user:manage` permission.",
    params(UserListQuery),
    responses(
        (status = 200, description = "List of users", body = UserListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query))]
pub async fn list_users(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<UserListQuery>,
) -> Result<Json<UserListResponse>, AppError> {
    auth_user.require_permission(permissions::USER_MANAGE)?;
    let (page, per_page) = page_params(query.page, query.per_page);

    let mut select = user::Entity::find();

    if let Some(pattern) = like_pattern(query.q.as_deref()) {
        let mut profile_match = ilike_any(
            [
                profile::Column::Run,
                profile::Column::Phone,
                profile::Column::Address,
                profile::Column::Role,
            ],
            &pattern,
        );
        if let Some(active) = query.q.as_deref().and_then(active_keyword) {
            profile_match = profile_match.add(profile::Column::Active.eq(active));
        }

        select = select.filter(
            Condition::any()
                .add(ilike_any(
                    [
                        user::Column::Username,
                        user::Column::FirstName,
                        user::Column::LastName,
                        user::Column::Email,
                    ],
                    &pattern,
                ))
                .add(
                    user::Column::Id.in_subquery(
                        SeaQuery::select()
                            .column(profile::Column::UserId)
                            .from(profile::Entity)
                            .cond_where(profile_match)
                            .to_owned(),
                    ),
                ),
        );
    }

    let total = select
        .clone()
        .paginate(&state.db, per_page)
        .num_items()
        .await?;

    let users = select
        .order_by_asc(user::Column::Username)
        .offset(Some(page_offset(page, per_page)))
        .limit(Some(per_page))
        .all(&state.db)
        .await?;

    let user_ids: Vec<i32> = users.iter().map(|u| u.id).collect();
    let mut profiles: HashMap<i32, profile::Model> = profile::Entity::find()
        .filter(profile::Column::UserId.is_in(user_ids))
        .all(&state.db)
        .await?
        .into_iter()
        .map(|p| (p.user_id, p))
        .collect();
    let profile_ids: Vec<i32> = profiles.values().map(|p| p.id).collect();
    let mut students: HashMap<i32, student::Model> = student::Entity::find()
        .filter(student::Column::ProfileId.is_in(profile_ids))
        .all(&state.db)
        .await?
        .into_iter()
        .map(|s| (s.profile_id, s))
        .collect();

    let data = users
        .into_iter()
        .map(|u| {
            let profile = profiles.remove(&u.id);
            let student = profile.as_ref().and_then(|p| students.remove(&p.id));
            UserResponse::new(u, profile, student)
        })
        .collect();

    Ok(Json(UserListResponse {
        data,
        pagination: Pagination::new(page, per_page, total),
    }))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Users",
    operation_id = "getUser",
    summary = "Get a user by ID",
    description = "Returns the user with its profile and student record. Requires `user:manage` permission.",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User details", body = UserResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "User not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn get_user(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<UserResponse>, AppError> {
    auth_user.require_permission(permissions::USER_MANAGE)?;
    let user = find_user(&state.db, id).await?;
    Ok(Json(user_response(&state.db, user).await?))
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Users",
    operation_id = "updateUser",
    summary = "Update a user",
    description = "Partially updates the user and its profile. The password is changed only when given. Switching a user to the `student` role without an existing student record requires `course_id` and `admission_date`. Requires `user:manage` permission.",
    params(("id" = i32, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "User not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "RUN taken (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id))]
pub async fn update_user(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateUserRequest>,
) -> Result<Json<UserResponse>, AppError> {
    auth_user.require_permission(permissions::USER_MANAGE)?;
    validate_update_request(&payload)?;

    let txn = state.db.begin().await?;
    let existing = find_user(&txn, id).await?;
    let profile = find_profile(&txn, id).await?;

    let touches_profile = payload.run.is_some()
        || payload.phone.is_some()
        || payload.address.is_some()
        || payload.role.is_some();
    if touches_profile && profile.is_none() {
        return Err(AppError::Validation("This user has no profile".into()));
    }

    let mut active: user::ActiveModel = existing.into();
    if let Some(ref email) = payload.email {
        active.email = Set(email.trim().to_string());
    }
    if let Some(ref first_name) = payload.first_name {
        active.first_name = Set(first_name.trim().to_string());
    }
    if let Some(ref last_name) = payload.last_name {
        active.last_name = Set(last_name.trim().to_string());
    }
    if let Some(ref password) = payload.password {
        let hash = hash::hash_password(password)
            .map_err(|e| AppError::Internal(format!("Password hash error: {}", e)))?;
        active.password = Set(hash);
    }
    let user = active.update(&txn).await?;

    let profile = match profile {
        Some(profile) if touches_profile => {
            if let Some(ref run) = payload.run {
                ensure_run_free(&txn, run.trim(), Some(profile.id)).await?;
            }
            let becomes_student = payload.role.as_deref() == Some(role::STUDENT);

            let mut active: profile::ActiveModel = profile.into();
            if let Some(ref run) = payload.run {
                active.run = Set(run.trim().to_string());
            }
            if let Some(ref phone) = payload.phone {
                active.phone = Set(phone.trim().to_string());
            }
            if let Some(ref address) = payload.address {
                active.address = Set(address.trim().to_string());
            }
            if let Some(ref role) = payload.role {
                active.role = Set(role.clone());
            }
            let profile = active.update(&txn).await?;

            if becomes_student && find_student(&txn, Some(&profile)).await?.is_none() {
                let (Some(course_id), Some(admission_date)) =
                    (payload.course_id, payload.admission_date)
                else {
                    return Err(AppError::Validation(
                        "Students need a course and an admission date".into(),
                    ));
                };
                ensure_course_exists(&txn, course_id).await?;
                student::ActiveModel {
                    profile_id: Set(profile.id),
                    course_id: Set(course_id),
                    admission_date: Set(admission_date),
                    ..Default::default()
                }
                .insert(&txn)
                .await?;
            }
            Some(profile)
        }
        other => other,
    };

    let student = find_student(&txn, profile.as_ref()).await?;
    txn.commit().await?;

    Ok(Json(UserResponse::new(user, profile, student)))
}

#[utoipa::path(
    post,
    path = "/{id}/toggle",
    tag = "Users",
    operation_id = "toggleUser",
    summary = "Enable or disable a user",
    description = "Flips the active flag of the user's profile. Disabled users cannot log in and their tokens are rejected. Requires `user:manage` permission.",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User toggled", body = ToggleUserResponse),
        (status = 400, description = "User has no profile (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "User not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn toggle_user(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ToggleUserResponse>, AppError> {
    auth_user.require_permission(permissions::USER_MANAGE)?;

    let user = find_user(&state.db, id).await?;
    let profile = find_profile(&state.db, id)
        .await?
        .ok_or_else(|| AppError::Validation("This user has no profile".into()))?;

    let now_active = !profile.active;
    let mut active: profile::ActiveModel = profile.into();
    active.active = Set(now_active);
    let profile = active.update(&state.db).await?;

    tracing::info!(user_id = id, active = now_active, "User toggled");

    let message = format!(
        "User «{}» was {}.",
        user.display_name(),
        if now_active { "enabled" } else { "disabled" }
    );
    let student = find_student(&state.db, Some(&profile)).await?;

    Ok(Json(ToggleUserResponse {
        user: UserResponse::new(user, Some(profile), student),
        message,
    }))
}
