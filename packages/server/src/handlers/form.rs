//! Form-shaped attendance entry points. Submissions always answer with a
//! redirect to the session list and report their outcome as a flash.

use axum::Json;
use axum::extract::{Path, State};
use axum::response::Redirect;
use axum_extra::extract::{CookieJar, Form, FormRejection};
use serde::Serialize;
use tracing::instrument;

use super::attendance::{marking_view, optional_date, session_page};
use crate::attendance::{AttendanceService, SaveOutcome};
use crate::error::AppError;
use crate::extractors::auth::AuthUser;
use crate::extractors::validated::AppQuery;
use crate::models::attendance::{
    MarkAttendanceForm, MarkQuery, MarkingView, SessionListItem, SessionListQuery,
};
use crate::models::shared::Pagination;
use crate::permissions;
use crate::state::AppState;
use crate::utils::flash::{self, Flash, FlashLevel};

pub const SESSION_LIST_PATH: &str = "/asistencia/";

#[derive(Serialize)]
pub struct SessionListPage {
    /// Outcome of the submission that redirected here, shown once.
    pub flash: Option<Flash>,
    pub data: Vec<SessionListItem>,
    pub pagination: Pagination,
}

#[instrument(skip(state, auth_user, jar, query))]
pub async fn session_list(
    auth_user: AuthUser,
    State(state): State<AppState>,
    jar: CookieJar,
    AppQuery(query): AppQuery<SessionListQuery>,
) -> Result<(CookieJar, Json<SessionListPage>), AppError> {
    auth_user.require_permission(permissions::ATTENDANCE_VIEW)?;
    let page = session_page(&state, &query).await?;
    let (jar, flash) = flash::take(jar);
    Ok((
        jar,
        Json(SessionListPage {
            flash,
            data: page.data,
            pagination: page.pagination,
        }),
    ))
}

#[instrument(skip(state, auth_user, query), fields(activity_id))]
pub async fn mark_form(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(activity_id): Path<i32>,
    AppQuery(query): AppQuery<MarkQuery>,
) -> Result<Json<MarkingView>, AppError> {
    let view = marking_view(&state, &auth_user, activity_id, query.raw_date()).await?;
    Ok(Json(view))
}

/// The form posts back to its own URL, so a date carried in the query string
/// applies unless the body names one.
async fn save_form(
    state: &AppState,
    auth_user: AuthUser,
    activity_id: i32,
    query: MarkQuery,
    form: MarkAttendanceForm,
) -> Result<SaveOutcome, AppError> {
    auth_user.require_permission(permissions::ATTENDANCE_MARK)?;
    let raw_date = form
        .fecha
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .or(query.raw_date());
    let date = optional_date(raw_date)?;

    Ok(AttendanceService::new(&state.db, &state.config.attendance)
        .save(activity_id, date, &form.presentes, &auth_user)
        .await?)
}

#[instrument(skip(state, auth_user, query, jar, form), fields(activity_id))]
pub async fn submit_mark_form(
    auth_user: Result<AuthUser, AppError>,
    State(state): State<AppState>,
    Path(activity_id): Path<i32>,
    query: Result<AppQuery<MarkQuery>, AppError>,
    jar: CookieJar,
    form: Result<Form<MarkAttendanceForm>, FormRejection>,
) -> (CookieJar, Redirect) {
    let result = match (auth_user, query, form) {
        (Err(e), _, _) | (Ok(_), Err(e), _) => Err(e),
        (Ok(_), Ok(_), Err(rejection)) => Err(AppError::Validation(rejection.to_string())),
        (Ok(user), Ok(AppQuery(query)), Ok(Form(form))) => {
            save_form(&state, user, activity_id, query, form).await
        }
    };

    let flash = match result {
        Ok(outcome @ SaveOutcome::Saved { .. }) => {
            Flash::new(FlashLevel::Success, outcome.message())
        }
        Ok(outcome @ SaveOutcome::NothingToSave { .. }) => {
            Flash::new(FlashLevel::Info, outcome.message())
        }
        Err(e) => {
            if let AppError::Internal(ref detail) = e {
                tracing::error!("Attendance form failed: {}", detail);
            } else {
                tracing::warn!(code = e.code(), "Attendance form rejected");
            }
            Flash::new(FlashLevel::Error, e.message())
        }
    };

    (flash::push(jar, &flash), Redirect::to(SESSION_LIST_PATH))
}
