use std::collections::HashMap;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use sea_orm::sea_query::Query as SeaQuery;
use sea_orm::*;
use tracing::instrument;

use crate::entity::enrollment::EnrollmentStatus;
use crate::entity::{discipline, enrollment, profile, student, user};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::validated::{AppJson, AppQuery};
use crate::models::enrollment::*;
use crate::models::shared::{MessageResponse, Pagination, like_pattern, page_offset, page_params};
use crate::permissions;
use crate::state::AppState;
use crate::utils::search::{ilike, ilike_any};

async fn find_enrollment<C: ConnectionTrait>(
    conn: &C,
    id: i32,
) -> Result<enrollment::Model, AppError> {
    enrollment::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Enrollment not found".into()))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Enrollments",
    operation_id = "createEnrollment",
    summary = "Enroll a student in a discipline",
    description = "A student has at most one enrollment per discipline. Requires `enrollment:manage` permission.",
    request_body = CreateEnrollmentRequest,
    responses(
        (status = 201, description = "Enrollment created", body = EnrollmentResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 409, description = "Already enrolled (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(student_id = payload.student_id, discipline_id = payload.discipline_id))]
pub async fn create_enrollment(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateEnrollmentRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission(permissions::ENROLLMENT_MANAGE)?;

    let txn = state.db.begin().await?;

    if student::Entity::find_by_id(payload.student_id)
        .one(&txn)
        .await?
        .is_none()
    {
        return Err(AppError::Validation("Student not found".into()));
    }
    if discipline::Entity::find_by_id(payload.discipline_id)
        .one(&txn)
        .await?
        .is_none()
    {
        return Err(AppError::Validation("Discipline not found".into()));
    }

    let duplicate = enrollment::Entity::find()
        .filter(enrollment::Column::StudentId.eq(payload.student_id))
        .filter(enrollment::Column::DisciplineId.eq(payload.discipline_id))
        .count(&txn)
        .await?;
    if duplicate > 0 {
        return Err(AppError::Conflict(
            "The student is already enrolled in this discipline".into(),
        ));
    }

    let model = enrollment::ActiveModel {
        student_id: Set(payload.student_id),
        discipline_id: Set(payload.discipline_id),
        enrolled_on: Set(payload
            .enrolled_on
            .unwrap_or_else(|| chrono::Utc::now().date_naive())),
        status: Set(payload.status.unwrap_or(EnrollmentStatus::Active)),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    Ok((StatusCode::CREATED, Json(EnrollmentResponse::from(model))))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Enrollments",
    operation_id = "listEnrollments",
    summary = "List enrollments",
    description = "Paginated, newest enrollment first. `q` searches the student's names and username and the discipline name. Requires `enrollment:view` permission.",
    params(EnrollmentListQuery),
    responses(
        (status = 200, description = "List of enrollments", body = EnrollmentListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query))]
pub async fn list_enrollments(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<EnrollmentListQuery>,
) -> Result<Json<EnrollmentListResponse>, AppError> {
    auth_user.require_permission(permissions::ENROLLMENT_VIEW)?;
    let (page, per_page) = page_params(query.page, query.per_page);

    let mut select = enrollment::Entity::find();
    if let Some(id) = query.discipline_id {
        select = select.filter(enrollment::Column::DisciplineId.eq(id));
    }
    if let Some(id) = query.student_id {
        select = select.filter(enrollment::Column::StudentId.eq(id));
    }
    if let Some(status) = query.status {
        select = select.filter(enrollment::Column::Status.eq(status));
    }
    if let Some(pattern) = like_pattern(query.q.as_deref()) {
        let matching_students = SeaQuery::select()
            .column(student::Column::Id)
            .from(student::Entity)
            .and_where(
                student::Column::ProfileId.in_subquery(
                    SeaQuery::select()
                        .column(profile::Column::Id)
                        .from(profile::Entity)
                        .and_where(
                            profile::Column::UserId.in_subquery(
                                SeaQuery::select()
                                    .column(user::Column::Id)
                                    .from(user::Entity)
                                    .cond_where(ilike_any(
                                        [
                                            user::Column::FirstName,
                                            user::Column::LastName,
                                            user::Column::Username,
                                        ],
                                        &pattern,
                                    ))
                                    .to_owned(),
                            ),
                        )
                        .to_owned(),
                ),
            )
            .to_owned();
        let matching_disciplines = SeaQuery::select()
            .column(discipline::Column::Id)
            .from(discipline::Entity)
            .cond_where(ilike(discipline::Column::Name, &pattern))
            .to_owned();

        select = select.filter(
            Condition::any()
                .add(enrollment::Column::StudentId.in_subquery(matching_students))
                .add(enrollment::Column::DisciplineId.in_subquery(matching_disciplines)),
        );
    }

    let total = select
        .clone()
        .paginate(&state.db, per_page)
        .num_items()
        .await?;

    let rows = select
        .order_by_desc(enrollment::Column::EnrolledOn)
        .order_by_desc(enrollment::Column::Id)
        .offset(Some(page_offset(page, per_page)))
        .limit(Some(per_page))
        .all(&state.db)
        .await?;

    let students: HashMap<i32, student::Model> = student::Entity::find()
        .filter(student::Column::Id.is_in(rows.iter().map(|e| e.student_id).collect::<Vec<_>>()))
        .all(&state.db)
        .await?
        .into_iter()
        .map(|s| (s.id, s))
        .collect();
    let profiles: HashMap<i32, i32> = profile::Entity::find()
        .filter(
            profile::Column::Id.is_in(students.values().map(|s| s.profile_id).collect::<Vec<_>>()),
        )
        .all(&state.db)
        .await?
        .into_iter()
        .map(|p| (p.id, p.user_id))
        .collect();
    let users: HashMap<i32, user::Model> = user::Entity::find()
        .filter(user::Column::Id.is_in(profiles.values().copied().collect::<Vec<_>>()))
        .all(&state.db)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();
    let disciplines: HashMap<i32, String> = discipline::Entity::find()
        .filter(
            discipline::Column::Id.is_in(rows.iter().map(|e| e.discipline_id).collect::<Vec<_>>()),
        )
        .all(&state.db)
        .await?
        .into_iter()
        .map(|d| (d.id, d.name))
        .collect();

    let data = rows
        .into_iter()
        .map(|e| {
            let user = students
                .get(&e.student_id)
                .and_then(|s| profiles.get(&s.profile_id))
                .and_then(|uid| users.get(uid));
            EnrollmentListItem {
                student_username: user.map(|u| u.username.clone()).unwrap_or_default(),
                student_name: user.map(|u| u.display_name()).unwrap_or_default(),
                discipline_name: disciplines.get(&e.discipline_id).cloned().unwrap_or_default(),
                enrollment: e.into(),
            }
        })
        .collect();

    Ok(Json(EnrollmentListResponse {
        data,
        pagination: Pagination::new(page, per_page, total),
    }))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Enrollments",
    operation_id = "getEnrollment",
    summary = "Get an enrollment by ID",
    description = "Requires `enrollment:view` permission.",
    params(("id" = i32, Path, description = "Enrollment ID")),
    responses(
        (status = 200, description = "Enrollment", body = EnrollmentResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Enrollment not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn get_enrollment(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<EnrollmentResponse>, AppError> {
    auth_user.require_permission(permissions::ENROLLMENT_VIEW)?;
    Ok(Json(find_enrollment(&state.db, id).await?.into()))
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Enrollments",
    operation_id = "updateEnrollment",
    summary = "Update an enrollment",
    description = "Changes the status or enrollment date. A non-active status removes the student from ordinary-activity rosters. Requires `enrollment:manage` permission.",
    params(("id" = i32, Path, description = "Enrollment ID")),
    request_body = UpdateEnrollmentRequest,
    responses(
        (status = 200, description = "Enrollment updated", body = EnrollmentResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Enrollment not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id))]
pub async fn update_enrollment(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateEnrollmentRequest>,
) -> Result<Json<EnrollmentResponse>, AppError> {
    auth_user.require_permission(permissions::ENROLLMENT_MANAGE)?;

    let existing = find_enrollment(&state.db, id).await?;
    let mut active: enrollment::ActiveModel = existing.into();
    if let Some(status) = payload.status {
        active.status = Set(status);
    }
    if let Some(enrolled_on) = payload.enrolled_on {
        active.enrolled_on = Set(enrolled_on);
    }

    let model = active.update(&state.db).await?;
    Ok(Json(model.into()))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Enrollments",
    operation_id = "deleteEnrollment",
    summary = "Delete an enrollment",
    description = "Requires `enrollment:manage` permission.",
    params(("id" = i32, Path, description = "Enrollment ID")),
    responses(
        (status = 200, description = "Enrollment deleted", body = MessageResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Enrollment not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn delete_enrollment(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<MessageResponse>, AppError> {
    auth_user.require_permission(permissions::ENROLLMENT_MANAGE)?;

    find_enrollment(&state.db, id).await?;
    enrollment::Entity::delete_by_id(id).exec(&state.db).await?;

    Ok(Json(MessageResponse {
        message: "Enrollment deleted.".into(),
    }))
}
