use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use sea_orm::*;
use tracing::instrument;

use crate::attendance::roster;
use crate::entity::enrollment::EnrollmentStatus;
use crate::entity::{activity, discipline, enrollment};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::validated::{AppJson, AppQuery};
use crate::models::discipline::*;
use crate::models::shared::{MessageResponse, Pagination, like_pattern, page_offset, page_params};
use crate::permissions;
use crate::state::AppState;
use crate::utils::search::ilike_any;

pub(crate) async fn find_discipline<C: ConnectionTrait>(
    conn: &C,
    id: i32,
) -> Result<discipline::Model, AppError> {
    discipline::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Discipline not found".into()))
}

async fn ensure_name_free<C: ConnectionTrait>(
    conn: &C,
    name: &str,
    except: Option<i32>,
) -> Result<(), AppError> {
    let mut query = discipline::Entity::find().filter(discipline::Column::Name.eq(name));
    if let Some(id) = except {
        query = query.filter(discipline::Column::Id.ne(id));
    }
    if query.count(conn).await? > 0 {
        return Err(AppError::Conflict(
            "A discipline with that name already exists".into(),
        ));
    }
    Ok(())
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Disciplines",
    operation_id = "createDiscipline",
    summary = "Create a discipline",
    description = "Requires `discipline:manage` permission. Names are unique.",
    request_body = CreateDisciplineRequest,
    responses(
        (status = 201, description = "Discipline created", body = DisciplineResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 409, description = "Name taken (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(name = %payload.name))]
pub async fn create_discipline(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateDisciplineRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission(permissions::DISCIPLINE_MANAGE)?;
    validate_create_discipline(&payload)?;

    let name = payload.name.trim().to_string();
    ensure_name_free(&state.db, &name, None).await?;

    let model = discipline::ActiveModel {
        name: Set(name),
        description: Set(payload.description.trim().to_string()),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(DisciplineResponse::from(model))))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Disciplines",
    operation_id = "listDisciplines",
    summary = "List disciplines",
    description = "Paginated, ordered by name. `q` searches name and description. Requires `discipline:manage` permission.",
    params(DisciplineListQuery),
    responses(
        (status = 200, description = "List of disciplines", body = DisciplineListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query))]
pub async fn list_disciplines(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<DisciplineListQuery>,
) -> Result<Json<DisciplineListResponse>, AppError> {
    auth_user.require_permission(permissions::DISCIPLINE_MANAGE)?;
    let (page, per_page) = page_params(query.page, query.per_page);

    let mut select = discipline::Entity::find();
    if let Some(pattern) = like_pattern(query.q.as_deref()) {
        select = select.filter(ilike_any(
            [discipline::Column::Name, discipline::Column::Description],
            &pattern,
        ));
    }

    let total = select
        .clone()
        .paginate(&state.db, per_page)
        .num_items()
        .await?;

    let data = select
        .order_by_asc(discipline::Column::Name)
        .offset(Some(page_offset(page, per_page)))
        .limit(Some(per_page))
        .all(&state.db)
        .await?
        .into_iter()
        .map(DisciplineResponse::from)
        .collect();

    Ok(Json(DisciplineListResponse {
        data,
        pagination: Pagination::new(page, per_page, total),
    }))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Disciplines",
    operation_id = "getDiscipline",
    summary = "Get a discipline by ID",
    description = "Requires `discipline:manage` permission.",
    params(("id" = i32, Path, description = "Discipline ID")),
    responses(
        (status = 200, description = "Discipline", body = DisciplineResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Discipline not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn get_discipline(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<DisciplineResponse>, AppError> {
    auth_user.require_permission(permissions::DISCIPLINE_MANAGE)?;
    Ok(Json(find_discipline(&state.db, id).await?.into()))
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Disciplines",
    operation_id = "updateDiscipline",
    summary = "Update a discipline",
    description = "Partial update. Requires `discipline:manage` permission.",
    params(("id" = i32, Path, description = "Discipline ID")),
    request_body = UpdateDisciplineRequest,
    responses(
        (status = 200, description = "Discipline updated", body = DisciplineResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Discipline not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Name taken (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id))]
pub async fn update_discipline(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateDisciplineRequest>,
) -> Result<Json<DisciplineResponse>, AppError> {
    auth_user.require_permission(permissions::DISCIPLINE_MANAGE)?;
    validate_update_discipline(&payload)?;

    let existing = find_discipline(&state.db, id).await?;
    let mut active: discipline::ActiveModel = existing.into();

    if let Some(ref name) = payload.name {
        let name = name.trim();
        ensure_name_free(&state.db, name, Some(id)).await?;
        active.name = Set(name.to_string());
    }
    if let Some(ref description) = payload.description {
        active.description = Set(description.trim().to_string());
    }

    let model = active.update(&state.db).await?;
    Ok(Json(model.into()))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Disciplines",
    operation_id = "deleteDiscipline",
    summary = "Delete a discipline",
    description = "Refused with 409 while the discipline still has activities or enrollments. Requires `discipline:manage` permission.",
    params(("id" = i32, Path, description = "Discipline ID")),
    responses(
        (status = 200, description = "Discipline deleted", body = MessageResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Discipline not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Discipline in use (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn delete_discipline(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<MessageResponse>, AppError> {
    auth_user.require_permission(permissions::DISCIPLINE_MANAGE)?;

    let txn = state.db.begin().await?;
    let existing = find_discipline(&txn, id).await?;

    let activities = activity::Entity::find()
        .filter(activity::Column::DisciplineId.eq(id))
        .count(&txn)
        .await?;
    let enrollments = enrollment::Entity::find()
        .filter(enrollment::Column::DisciplineId.eq(id))
        .count(&txn)
        .await?;
    if activities > 0 || enrollments > 0 {
        return Err(AppError::Conflict(
            "Cannot delete a discipline that has activities or enrollments".into(),
        ));
    }

    discipline::Entity::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;

    Ok(Json(MessageResponse {
        message: format!("Discipline \"{}\" deleted.", existing.name),
    }))
}

#[utoipa::path(
    get,
    path = "/{id}/students",
    tag = "Disciplines",
    operation_id = "listDisciplineStudents",
    summary = "List students actively enrolled in a discipline",
    description = "Ordered by last name, then first name. Students with a disabled profile are left out. Requires `enrollment:view` permission.",
    params(("id" = i32, Path, description = "Discipline ID")),
    responses(
        (status = 200, description = "Enrolled students", body = DisciplineStudentsResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Discipline not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn list_discipline_students(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<DisciplineStudentsResponse>, AppError> {
    auth_user.require_permission(permissions::ENROLLMENT_VIEW)?;
    let discipline = find_discipline(&state.db, id).await?;

    let student_ids: Vec<i32> = enrollment::Entity::find()
        .select_only()
        .column(enrollment::Column::StudentId)
        .filter(enrollment::Column::DisciplineId.eq(id))
        .filter(enrollment::Column::Status.eq(EnrollmentStatus::Active))
        .into_tuple()
        .all(&state.db)
        .await?;
    let students = roster::load_students(&state.db, &student_ids, true).await?;

    Ok(Json(DisciplineStudentsResponse {
        discipline: discipline.into(),
        students,
    }))
}
