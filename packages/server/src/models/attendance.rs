use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::IntoParams;

use super::shared::{Pagination, empty_string_as_none};
use crate::entity::activity::ActivityKind;
use crate::entity::attendance_session;

/// Query for the marking view.
#[derive(Deserialize, IntoParams)]
pub struct MarkQuery {
    /// Session date (`YYYY-MM-DD`). Defaults to today.
    pub date: Option<String>,
    /// Alias of `date` used by the form entry point.
    pub fecha: Option<String>,
}

impl MarkQuery {
    pub fn raw_date(&self) -> Option<&str> {
        nonblank(&self.date).or_else(|| nonblank(&self.fecha))
    }
}

fn nonblank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.trim().is_empty())
}

/// Request body for saving attendance.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct MarkAttendanceRequest {
    /// Session date (`YYYY-MM-DD`). Defaults to today.
    #[schema(example = "2024-03-05")]
    pub date: Option<String>,
    /// Profile IDs of the participants present. IDs not on the roster are ignored.
    #[schema(example = json!([12, 14]))]
    #[serde(default)]
    pub present: Vec<i32>,
}

/// Urlencoded body of the form entry point; `presentes` repeats once per participant.
#[derive(Deserialize)]
pub struct MarkAttendanceForm {
    #[serde(default)]
    pub fecha: Option<String>,
    #[serde(default)]
    pub presentes: Vec<i32>,
}

/// One expected participant of an activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct RosterEntry {
    /// Participant identifier used in `present` lists.
    pub profile_id: i32,
    pub student_id: i32,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ActivitySummary {
    pub id: i32,
    pub name: String,
    pub kind: ActivityKind,
    pub discipline_id: i32,
    pub discipline_name: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct MarkingRow {
    #[serde(flatten)]
    pub participant: RosterEntry,
    pub present: bool,
}

/// Roster with current presence for one activity and date. Never creates a session.
#[derive(Serialize, utoipa::ToSchema)]
pub struct MarkingView {
    pub activity: ActivitySummary,
    pub date: NaiveDate,
    /// `None` until attendance is first saved.
    pub session_id: Option<i32>,
    pub roster: Vec<MarkingRow>,
    pub present_count: usize,
}

/// Outcome of a save.
#[derive(Serialize, utoipa::ToSchema)]
pub struct MarkAttendanceResponse {
    /// `false` when there was nothing to save (empty roster).
    pub saved: bool,
    pub session_id: Option<i32>,
    pub date: NaiveDate,
    pub present_count: u64,
    #[schema(example = "Attendance for 05-03-2024 saved. Presentes: 2.")]
    pub message: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct SessionResponse {
    pub id: i32,
    pub activity_id: i32,
    pub date: NaiveDate,
    pub recorder_id: Option<i32>,
    pub trainer_id: Option<i32>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<attendance_session::Model> for SessionResponse {
    fn from(m: attendance_session::Model) -> Self {
        Self {
            id: m.id,
            activity_id: m.activity_id,
            date: m.date,
            recorder_id: m.recorder_id,
            trainer_id: m.trainer_id,
            active: m.active,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct PresentParticipant {
    pub profile_id: i32,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub marked_at: DateTime<Utc>,
}

/// Presents and absents of one session.
#[derive(Serialize, utoipa::ToSchema)]
pub struct SessionDetailResponse {
    pub activity: ActivitySummary,
    pub session: SessionResponse,
    pub present: Vec<PresentParticipant>,
    pub present_count: usize,
    /// Current roster minus presents.
    pub absent: Vec<RosterEntry>,
    pub absent_count: usize,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ToggleSessionResponse {
    pub session: SessionResponse,
    #[schema(example = "The session of 05-03-2024 was disabled.")]
    pub message: String,
}

#[derive(Deserialize, IntoParams, Default)]
pub struct SessionListQuery {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub discipline_id: Option<i32>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub activity_id: Option<i32>,
    /// Inclusive lower bound (`YYYY-MM-DD`).
    pub from: Option<String>,
    /// Inclusive upper bound (`YYYY-MM-DD`).
    pub to: Option<String>,
    /// Matches first name, last name or username of any present participant.
    pub q: Option<String>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct SessionListItem {
    pub id: i32,
    pub activity_id: i32,
    pub activity_name: String,
    pub discipline_id: i32,
    pub discipline_name: String,
    pub date: NaiveDate,
    pub recorder_username: Option<String>,
    pub active: bool,
    pub present_count: u64,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct SessionListResponse {
    pub data: Vec<SessionListItem>,
    pub pagination: Pagination,
}

#[derive(Deserialize, IntoParams)]
pub struct SelectableQuery {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub discipline_id: Option<i32>,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct SelectActivityRequest {
    pub discipline_id: Option<i32>,
    pub activity_id: Option<i32>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct SelectActivityResponse {
    pub activity_id: i32,
    /// Where to open the marking view.
    #[schema(example = "/api/v1/attendance/activities/3/mark")]
    pub mark_url: String,
}
