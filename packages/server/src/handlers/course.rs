use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use sea_orm::*;
use tracing::instrument;

use crate::entity::{course, student};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::validated::{AppJson, AppQuery};
use crate::models::course::*;
use crate::models::shared::{MessageResponse, Pagination, like_pattern, page_offset, page_params};
use crate::permissions;
use crate::state::AppState;
use crate::utils::search::ilike_any;

#[utoipa::path(
    post,
    path = "/",
    tag = "Courses",
    operation_id = "createCourse",
    summary = "Create a course",
    description = "Requires `course:manage` permission. Names are unique.",
    request_body = CreateCourseRequest,
    responses(
        (status = 201, description = "Course created", body = CourseResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 409, description = "Name taken (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(name = %payload.name))]
pub async fn create_course(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateCourseRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission(permissions::COURSE_MANAGE)?;
    validate_create_course(&payload)?;

    let model = course::ActiveModel {
        name: Set(payload.name.trim().to_string()),
        ..Default::default()
    }
    .insert(&state.db)
    .await
    .map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AppError::Conflict("A course with that name already exists".into())
        }
        _ => AppError::from(e),
    })?;

    Ok((StatusCode::CREATED, Json(CourseResponse::from(model))))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Courses",
    operation_id = "listCourses",
    summary = "List courses",
    description = "Paginated, ordered by name. Requires `course:view` permission.",
    params(CourseListQuery),
    responses(
        (status = 200, description = "List of courses", body = CourseListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query))]
pub async fn list_courses(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<CourseListQuery>,
) -> Result<Json<CourseListResponse>, AppError> {
    auth_user.require_permission(permissions::COURSE_VIEW)?;
    let (page, per_page) = page_params(query.page, query.per_page);

    let mut select = course::Entity::find();
    if let Some(pattern) = like_pattern(query.q.as_deref()) {
        select = select.filter(ilike_any([course::Column::Name], &pattern));
    }

    let total = select
        .clone()
        .paginate(&state.db, per_page)
        .num_items()
        .await?;

    let data = select
        .order_by_asc(course::Column::Name)
        .offset(Some(page_offset(page, per_page)))
        .limit(Some(per_page))
        .all(&state.db)
        .await?
        .into_iter()
        .map(CourseResponse::from)
        .collect();

    Ok(Json(CourseListResponse {
        data,
        pagination: Pagination::new(page, per_page, total),
    }))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Courses",
    operation_id = "deleteCourse",
    summary = "Delete a course",
    description = "Refused with 409 while students belong to the course. Requires `course:manage` permission.",
    params(("id" = i32, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Course deleted", body = MessageResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Course not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Course has students (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn delete_course(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<MessageResponse>, AppError> {
    auth_user.require_permission(permissions::COURSE_MANAGE)?;

    let txn = state.db.begin().await?;
    let existing = course::Entity::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Course not found".into()))?;

    let students = student::Entity::find()
        .filter(student::Column::CourseId.eq(id))
        .count(&txn)
        .await?;
    if students > 0 {
        return Err(AppError::Conflict(
            "Cannot delete a course that still has students".into(),
        ));
    }

    course::Entity::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;

    Ok(Json(MessageResponse {
        message: format!("Course \"{}\" deleted.", existing.name),
    }))
}
