use axum::Json;
use axum::extract::{Path, State};
use tracing::instrument;

use crate::attendance::AttendanceService;
use crate::attendance::service::SessionFilter;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::validated::{AppJson, AppQuery};
use crate::models::activity::ActivityResponse;
use crate::models::attendance::*;
use crate::models::shared::{Pagination, display_date, like_pattern, page_params, parse_date};
use crate::permissions;
use crate::state::AppState;

/// Parse an optional date string, treating blanks as absent.
pub(crate) fn optional_date(raw: Option<&str>) -> Result<Option<chrono::NaiveDate>, AppError> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(parse_date)
        .transpose()
}

/// Marking view shared by the JSON and form entry points.
pub(crate) async fn marking_view(
    state: &AppState,
    auth_user: &AuthUser,
    activity_id: i32,
    raw_date: Option<&str>,
) -> Result<MarkingView, AppError> {
    auth_user.require_permission(permissions::ATTENDANCE_MARK)?;
    let date = optional_date(raw_date)?;

    Ok(AttendanceService::new(&state.db, &state.config.attendance)
        .marking_view(activity_id, date)
        .await?)
}

pub(crate) fn session_filter(query: &SessionListQuery) -> Result<SessionFilter, AppError> {
    let from = optional_date(query.from.as_deref())?;
    let to = optional_date(query.to.as_deref())?;
    if let (Some(from), Some(to)) = (from, to)
        && from > to
    {
        return Err(AppError::Validation(
            "`from` must not be after `to`".into(),
        ));
    }
    Ok(SessionFilter {
        discipline_id: query.discipline_id,
        activity_id: query.activity_id,
        from,
        to,
        participant: like_pattern(query.q.as_deref()),
    })
}

pub(crate) async fn session_page(
    state: &AppState,
    query: &SessionListQuery,
) -> Result<SessionListResponse, AppError> {
    let filter = session_filter(query)?;
    let (page, per_page) = page_params(query.page, query.per_page);
    let (data, total) = AttendanceService::new(&state.db, &state.config.attendance)
        .list(&filter, page, per_page)
        .await?;
    Ok(SessionListResponse {
        data,
        pagination: Pagination::new(page, per_page, total),
    })
}

#[utoipa::path(
    get,
    path = "/activities/{activity_id}/mark",
    tag = "Attendance",
    operation_id = "getMarkingView",
    summary = "Expected roster and current presence",
    description = "Returns the activity's expected participants for a date (default today) with the presence already recorded. Never creates a session. Requires `attendance:mark` permission.",
    params(
        ("activity_id" = i32, Path, description = "Activity ID"),
        MarkQuery,
    ),
    responses(
        (status = 200, description = "Marking view", body = MarkingView),
        (status = 400, description = "Bad or out-of-window date (VALIDATION_ERROR, DATE_TOO_EARLY, DATE_TOO_LATE)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Activity not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query), fields(activity_id))]
pub async fn get_marking_view(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(activity_id): Path<i32>,
    AppQuery(query): AppQuery<MarkQuery>,
) -> Result<Json<MarkingView>, AppError> {
    let view = marking_view(&state, &auth_user, activity_id, query.raw_date()).await?;
    Ok(Json(view))
}

#[utoipa::path(
    post,
    path = "/activities/{activity_id}/mark",
    tag = "Attendance",
    operation_id = "markAttendance",
    summary = "Save attendance",
    description = "Finds or creates the session for the date (default today) and replaces its presence list with the submitted participants that are on the roster. Runs in one transaction. An empty roster saves nothing and answers with `saved: false`. The caller must have an active profile. Requires `attendance:mark` permission.",
    params(("activity_id" = i32, Path, description = "Activity ID")),
    request_body = MarkAttendanceRequest,
    responses(
        (status = 200, description = "Attendance saved, or nothing to save", body = MarkAttendanceResponse),
        (status = 400, description = "Bad or out-of-window date (VALIDATION_ERROR, DATE_TOO_EARLY, DATE_TOO_LATE)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED, PROFILE_REQUIRED, ACCOUNT_DISABLED)", body = ErrorBody),
        (status = 404, description = "Activity not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Concurrent session creation (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(activity_id, present = payload.present.len()))]
pub async fn mark_attendance(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(activity_id): Path<i32>,
    AppJson(payload): AppJson<MarkAttendanceRequest>,
) -> Result<Json<MarkAttendanceResponse>, AppError> {
    auth_user.require_permission(permissions::ATTENDANCE_MARK)?;
    let date = optional_date(payload.date.as_deref())?;

    let outcome = AttendanceService::new(&state.db, &state.config.attendance)
        .save(activity_id, date, &payload.present, &auth_user)
        .await?;
    Ok(Json(outcome.into()))
}

#[utoipa::path(
    get,
    path = "/sessions",
    tag = "Attendance",
    operation_id = "listSessions",
    summary = "List attendance sessions",
    description = "Newest first, with the present count of each session. Filters by discipline, activity, inclusive date range and participant name. Requires `attendance:view` permission.",
    params(SessionListQuery),
    responses(
        (status = 200, description = "Sessions", body = SessionListResponse),
        (status = 400, description = "Bad filter (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query))]
pub async fn list_sessions(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<SessionListQuery>,
) -> Result<Json<SessionListResponse>, AppError> {
    auth_user.require_permission(permissions::ATTENDANCE_VIEW)?;
    Ok(Json(session_page(&state, &query).await?))
}

#[utoipa::path(
    get,
    path = "/activities/{activity_id}/sessions/{date}",
    tag = "Attendance",
    operation_id = "getSession",
    summary = "Presents and absents of a session",
    description = "Absents are the current roster minus the recorded presents. Requires `attendance:view` permission.",
    params(
        ("activity_id" = i32, Path, description = "Activity ID"),
        ("date" = String, Path, description = "Session date (YYYY-MM-DD)"),
    ),
    responses(
        (status = 200, description = "Session detail", body = SessionDetailResponse),
        (status = 400, description = "Bad date (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Activity or session not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user))]
pub async fn get_session(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((activity_id, date)): Path<(i32, String)>,
) -> Result<Json<SessionDetailResponse>, AppError> {
    auth_user.require_permission(permissions::ATTENDANCE_VIEW)?;
    let date = parse_date(&date)?;

    let detail = AttendanceService::new(&state.db, &state.config.attendance)
        .session_detail(activity_id, date)
        .await?;
    Ok(Json(detail))
}

#[utoipa::path(
    post,
    path = "/activities/{activity_id}/sessions/{date}/toggle",
    tag = "Attendance",
    operation_id = "toggleSession",
    summary = "Enable or disable a session",
    description = "Flips the session's active flag. Recorded presence is kept. Requires `attendance:toggle` permission.",
    params(
        ("activity_id" = i32, Path, description = "Activity ID"),
        ("date" = String, Path, description = "Session date (YYYY-MM-DD)"),
    ),
    responses(
        (status = 200, description = "Session toggled", body = ToggleSessionResponse),
        (status = 400, description = "Bad date (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Session not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user))]
pub async fn toggle_session(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((activity_id, date)): Path<(i32, String)>,
) -> Result<Json<ToggleSessionResponse>, AppError> {
    auth_user.require_permission(permissions::ATTENDANCE_TOGGLE)?;
    let date = parse_date(&date)?;

    let session = AttendanceService::new(&state.db, &state.config.attendance)
        .toggle(activity_id, date)
        .await?;
    let message = format!(
        "The session of {} was {}.",
        display_date(session.date),
        if session.active { "enabled" } else { "disabled" }
    );
    Ok(Json(ToggleSessionResponse {
        session: session.into(),
        message,
    }))
}

#[utoipa::path(
    get,
    path = "/selectable",
    tag = "Attendance",
    operation_id = "listSelectableActivities",
    summary = "Activities that can be opened for marking",
    description = "Newest start first, optionally limited to one discipline. In single-session mode, activities that already have a session are left out. Requires `attendance:mark` permission.",
    params(SelectableQuery),
    responses(
        (status = 200, description = "Activities", body = Vec<ActivityResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query))]
pub async fn list_selectable(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<SelectableQuery>,
) -> Result<Json<Vec<ActivityResponse>>, AppError> {
    auth_user.require_permission(permissions::ATTENDANCE_MARK)?;

    let activities = AttendanceService::new(&state.db, &state.config.attendance)
        .selectable(query.discipline_id)
        .await?;
    Ok(Json(activities.into_iter().map(ActivityResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/select",
    tag = "Attendance",
    operation_id = "selectActivity",
    summary = "Pick an activity to mark",
    description = "Checks that the activity belongs to the chosen discipline and, in single-session mode, has no session yet. Returns where to open the marking view. Requires `attendance:mark` permission.",
    request_body = SelectActivityRequest,
    responses(
        (status = 200, description = "Selection accepted", body = SelectActivityResponse),
        (status = 400, description = "Invalid pick (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Activity not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Already recorded (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload))]
pub async fn select_activity(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<SelectActivityRequest>,
) -> Result<Json<SelectActivityResponse>, AppError> {
    auth_user.require_permission(permissions::ATTENDANCE_MARK)?;

    let activity = AttendanceService::new(&state.db, &state.config.attendance)
        .select(payload.discipline_id, payload.activity_id)
        .await?;
    Ok(Json(SelectActivityResponse {
        activity_id: activity.id,
        mark_url: format!("/api/v1/attendance/activities/{}/mark", activity.id),
    }))
}
