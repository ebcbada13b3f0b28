use std::collections::{BTreeSet, HashMap};

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use sea_orm::sea_query::Query as SeaQuery;
use sea_orm::*;
use tracing::instrument;

use crate::entity::activity::ActivityKind;
use crate::entity::enrollment::EnrollmentStatus;
use crate::entity::{activity, activity_student, attendance_session, discipline, enrollment};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::validated::{AppJson, AppQuery};
use crate::models::activity::*;
use crate::models::shared::{MessageResponse, Pagination, like_pattern, page_offset, page_params};
use crate::permissions;
use crate::state::AppState;
use crate::utils::search::{ilike, ilike_any};

async fn find_activity<C: ConnectionTrait>(conn: &C, id: i32) -> Result<activity::Model, AppError> {
    activity::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Activity not found".into()))
}

async fn ensure_discipline<C: ConnectionTrait>(conn: &C, id: i32) -> Result<(), AppError> {
    if discipline::Entity::find_by_id(id).one(conn).await?.is_none() {
        return Err(AppError::Validation("Discipline not found".into()));
    }
    Ok(())
}

async fn roster_ids<C: ConnectionTrait>(conn: &C, activity_id: i32) -> Result<Vec<i32>, DbErr> {
    activity_student::Entity::find()
        .select_only()
        .column(activity_student::Column::StudentId)
        .filter(activity_student::Column::ActivityId.eq(activity_id))
        .order_by_asc(activity_student::Column::StudentId)
        .into_tuple()
        .all(conn)
        .await
}

/// Deduplicate a tournament roster and check every student is actively
/// enrolled in the discipline.
async fn check_tournament_roster<C: ConnectionTrait>(
    conn: &C,
    discipline_id: i32,
    student_ids: &[i32],
) -> Result<Vec<i32>, AppError> {
    let wanted: BTreeSet<i32> = student_ids.iter().copied().collect();
    if wanted.is_empty() {
        return Ok(Vec::new());
    }

    let enrolled: BTreeSet<i32> = enrollment::Entity::find()
        .select_only()
        .column(enrollment::Column::StudentId)
        .filter(enrollment::Column::DisciplineId.eq(discipline_id))
        .filter(enrollment::Column::Status.eq(EnrollmentStatus::Active))
        .filter(enrollment::Column::StudentId.is_in(wanted.iter().copied().collect::<Vec<_>>()))
        .into_tuple::<i32>()
        .all(conn)
        .await?
        .into_iter()
        .collect();

    let missing: Vec<String> = wanted
        .difference(&enrolled)
        .map(|id| id.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(AppError::Validation(format!(
            "Students not actively enrolled in this discipline: {}",
            missing.join(", ")
        )));
    }
    Ok(wanted.into_iter().collect())
}

async fn replace_roster<C: ConnectionTrait>(
    conn: &C,
    activity_id: i32,
    student_ids: &[i32],
) -> Result<(), DbErr> {
    activity_student::Entity::delete_many()
        .filter(activity_student::Column::ActivityId.eq(activity_id))
        .exec(conn)
        .await?;
    if student_ids.is_empty() {
        return Ok(());
    }
    let rows = student_ids.iter().map(|&student_id| activity_student::ActiveModel {
        activity_id: Set(activity_id),
        student_id: Set(student_id),
    });
    activity_student::Entity::insert_many(rows)
        .exec_without_returning(conn)
        .await?;
    Ok(())
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Activities",
    operation_id = "createActivity",
    summary = "Schedule an activity",
    description = "Creates an ordinary activity or a tournament. Tournament rosters may only contain students actively enrolled in the discipline. Requires `activity:manage` permission.",
    request_body = CreateActivityRequest,
    responses(
        (status = 201, description = "Activity created", body = ActivityResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(name = %payload.name))]
pub async fn create_activity(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateActivityRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission(permissions::ACTIVITY_MANAGE)?;
    validate_create_activity(&payload)?;

    let txn = state.db.begin().await?;
    ensure_discipline(&txn, payload.discipline_id).await?;
    let student_ids =
        check_tournament_roster(&txn, payload.discipline_id, &payload.student_ids).await?;

    let model = activity::ActiveModel {
        name: Set(payload.name.trim().to_string()),
        kind: Set(payload.kind),
        discipline_id: Set(payload.discipline_id),
        start_date: Set(payload.start_date),
        end_date: Set(payload.end_date),
        location: Set(payload.location.trim().to_string()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    replace_roster(&txn, model.id, &student_ids).await?;
    txn.commit().await?;

    Ok((
        StatusCode::CREATED,
        Json(ActivityResponse::new(model, student_ids)),
    ))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Activities",
    operation_id = "listActivities",
    summary = "List activities",
    description = "Paginated, newest start date first. `q` searches name, location and discipline name. Requires `activity:manage` permission.",
    params(ActivityListQuery),
    responses(
        (status = 200, description = "List of activities", body = ActivityListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query))]
pub async fn list_activities(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<ActivityListQuery>,
) -> Result<Json<ActivityListResponse>, AppError> {
    auth_user.require_permission(permissions::ACTIVITY_MANAGE)?;
    let (page, per_page) = page_params(query.page, query.per_page);

    let mut select = activity::Entity::find();
    if let Some(id) = query.discipline_id {
        select = select.filter(activity::Column::DisciplineId.eq(id));
    }
    if let Some(pattern) = like_pattern(query.q.as_deref()) {
        select = select.filter(
            ilike_any([activity::Column::Name, activity::Column::Location], &pattern).add(
                activity::Column::DisciplineId.in_subquery(
                    SeaQuery::select()
                        .column(discipline::Column::Id)
                        .from(discipline::Entity)
                        .cond_where(ilike(discipline::Column::Name, &pattern))
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

    let activities = select
        .order_by_desc(activity::Column::StartDate)
        .order_by_desc(activity::Column::Id)
        .offset(Some(page_offset(page, per_page)))
        .limit(Some(per_page))
        .all(&state.db)
        .await?;

    let ids: Vec<i32> = activities.iter().map(|a| a.id).collect();
    let mut rosters: HashMap<i32, Vec<i32>> = HashMap::new();
    if !ids.is_empty() {
        let rows = activity_student::Entity::find()
            .filter(activity_student::Column::ActivityId.is_in(ids))
            .order_by_asc(activity_student::Column::StudentId)
            .all(&state.db)
            .await?;
        for row in rows {
            rosters.entry(row.activity_id).or_default().push(row.student_id);
        }
    }

    let data = activities
        .into_iter()
        .map(|a| {
            let roster = rosters.remove(&a.id).unwrap_or_default();
            ActivityResponse::new(a, roster)
        })
        .collect();

    Ok(Json(ActivityListResponse {
        data,
        pagination: Pagination::new(page, per_page, total),
    }))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Activities",
    operation_id = "getActivity",
    summary = "Get an activity by ID",
    description = "Includes the tournament roster. Requires `activity:manage` permission.",
    params(("id" = i32, Path, description = "Activity ID")),
    responses(
        (status = 200, description = "Activity", body = ActivityResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Activity not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn get_activity(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ActivityResponse>, AppError> {
    auth_user.require_permission(permissions::ACTIVITY_MANAGE)?;
    let model = find_activity(&state.db, id).await?;
    let roster = roster_ids(&state.db, id).await?;
    Ok(Json(ActivityResponse::new(model, roster)))
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Activities",
    operation_id = "updateActivity",
    summary = "Update an activity",
    description = "Partial update; `end_date: null` clears the end date. Turning a tournament into an ordinary activity drops its roster. Changing the discipline of a tournament re-checks its roster. Requires `activity:manage` permission.",
    params(("id" = i32, Path, description = "Activity ID")),
    request_body = UpdateActivityRequest,
    responses(
        (status = 200, description = "Activity updated", body = ActivityResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Activity not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id))]
pub async fn update_activity(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateActivityRequest>,
) -> Result<Json<ActivityResponse>, AppError> {
    auth_user.require_permission(permissions::ACTIVITY_MANAGE)?;

    let txn = state.db.begin().await?;
    let existing = find_activity(&txn, id).await?;
    validate_update_activity(&payload, &existing)?;

    let kind = payload.kind.unwrap_or(existing.kind);
    let discipline_id = payload.discipline_id.unwrap_or(existing.discipline_id);
    if payload.discipline_id.is_some() {
        ensure_discipline(&txn, discipline_id).await?;
    }

    let roster = match kind {
        ActivityKind::Ordinary => Vec::new(),
        ActivityKind::Tournament => {
            let requested = match payload.student_ids {
                Some(ref ids) => ids.clone(),
                None => roster_ids(&txn, id).await?,
            };
            check_tournament_roster(&txn, discipline_id, &requested).await?
        }
    };

    let mut active: activity::ActiveModel = existing.into();
    if let Some(ref name) = payload.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(kind) = payload.kind {
        active.kind = Set(kind);
    }
    if let Some(discipline_id) = payload.discipline_id {
        active.discipline_id = Set(discipline_id);
    }
    if let Some(start_date) = payload.start_date {
        active.start_date = Set(start_date);
    }
    if let Some(end_date) = payload.end_date {
        active.end_date = Set(end_date);
    }
    if let Some(ref location) = payload.location {
        active.location = Set(location.trim().to_string());
    }

    let model = active.update(&txn).await?;
    replace_roster(&txn, id, &roster).await?;
    txn.commit().await?;

    Ok(Json(ActivityResponse::new(model, roster)))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Activities",
    operation_id = "deleteActivity",
    summary = "Delete an activity",
    description = "Removes the activity and its tournament roster. Refused with 409 once attendance has been recorded. Requires `activity:manage` permission.",
    params(("id" = i32, Path, description = "Activity ID")),
    responses(
        (status = 200, description = "Activity deleted", body = MessageResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Activity not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Activity has sessions (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn delete_activity(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<MessageResponse>, AppError> {
    auth_user.require_permission(permissions::ACTIVITY_MANAGE)?;

    let txn = state.db.begin().await?;
    let existing = find_activity(&txn, id).await?;

    let sessions = attendance_session::Entity::find()
        .filter(attendance_session::Column::ActivityId.eq(id))
        .count(&txn)
        .await?;
    if sessions > 0 {
        return Err(AppError::Conflict(
            "Cannot delete an activity with recorded attendance".into(),
        ));
    }

    activity_student::Entity::delete_many()
        .filter(activity_student::Column::ActivityId.eq(id))
        .exec(&txn)
        .await?;
    activity::Entity::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;

    Ok(Json(MessageResponse {
        message: format!("Activity \"{}\" deleted.", existing.name),
    }))
}
