use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::IntoParams;

use super::shared::{Pagination, double_option, empty_string_as_none, validate_max_len, validate_name};
use crate::entity::activity::{self, ActivityKind};
use crate::error::AppError;

/// Request body for scheduling an activity.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateActivityRequest {
    #[schema(example = "Volleyball Training")]
    pub name: String,
    pub kind: ActivityKind,
    pub discipline_id: i32,
    #[schema(example = "2024-03-01")]
    pub start_date: NaiveDate,
    /// Open-ended when absent.
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    #[schema(example = "Main gym")]
    pub location: String,
    /// Tournament roster (student IDs). Must be empty for ordinary activities.
    #[serde(default)]
    pub student_ids: Vec<i32>,
}

fn validate_dates(start: NaiveDate, end: Option<NaiveDate>) -> Result<(), AppError> {
    if let Some(end) = end
        && end < start
    {
        return Err(AppError::Validation(
            "End date must not be before the start date".into(),
        ));
    }
    Ok(())
}

fn validate_roster_kind(kind: ActivityKind, student_ids: &[i32]) -> Result<(), AppError> {
    if kind == ActivityKind::Ordinary && !student_ids.is_empty() {
        return Err(AppError::Validation(
            "Only tournaments carry an explicit student list".into(),
        ));
    }
    Ok(())
}

pub fn validate_create_activity(payload: &CreateActivityRequest) -> Result<(), AppError> {
    validate_name("Name", &payload.name, 100)?;
    validate_max_len("Location", &payload.location, 100)?;
    validate_dates(payload.start_date, payload.end_date)?;
    validate_roster_kind(payload.kind, &payload.student_ids)
}

/// Partial update. `end_date: null` clears the end date.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct UpdateActivityRequest {
    pub name: Option<String>,
    pub kind: Option<ActivityKind>,
    pub discipline_id: Option<i32>,
    pub start_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<NaiveDate>)]
    pub end_date: Option<Option<NaiveDate>>,
    pub location: Option<String>,
    /// Replaces the tournament roster when present.
    pub student_ids: Option<Vec<i32>>,
}

/// Validate an update against the activity it applies to.
pub fn validate_update_activity(
    payload: &UpdateActivityRequest,
    current: &activity::Model,
) -> Result<(), AppError> {
    if let Some(ref name) = payload.name {
        validate_name("Name", name, 100)?;
    }
    if let Some(ref location) = payload.location {
        validate_max_len("Location", location, 100)?;
    }
    let start = payload.start_date.unwrap_or(current.start_date);
    let end = payload.end_date.unwrap_or(current.end_date);
    validate_dates(start, end)?;
    if let Some(ref ids) = payload.student_ids {
        validate_roster_kind(payload.kind.unwrap_or(current.kind), ids)?;
    }
    Ok(())
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ActivityResponse {
    pub id: i32,
    pub name: String,
    pub kind: ActivityKind,
    pub discipline_id: i32,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub location: String,
    /// Tournament roster; empty for ordinary activities.
    pub student_ids: Vec<i32>,
}

impl ActivityResponse {
    pub fn new(m: activity::Model, student_ids: Vec<i32>) -> Self {
        Self {
            id: m.id,
            name: m.name,
            kind: m.kind,
            discipline_id: m.discipline_id,
            start_date: m.start_date,
            end_date: m.end_date,
            location: m.location,
            student_ids,
        }
    }
}

impl From<activity::Model> for ActivityResponse {
    fn from(m: activity::Model) -> Self {
        Self::new(m, Vec::new())
    }
}

#[derive(Deserialize, IntoParams)]
pub struct ActivityListQuery {
    /// Searches name, location and discipline name.
    pub q: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub discipline_id: Option<i32>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ActivityListResponse {
    pub data: Vec<ActivityResponse>,
    pub pagination: Pagination,
}
