use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::IntoParams;

use super::shared::{Pagination, empty_string_as_none};
use crate::entity::enrollment::{self, EnrollmentStatus};

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateEnrollmentRequest {
    pub student_id: i32,
    pub discipline_id: i32,
    /// Defaults to today.
    pub enrolled_on: Option<NaiveDate>,
    /// Defaults to `active`.
    pub status: Option<EnrollmentStatus>,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct UpdateEnrollmentRequest {
    pub status: Option<EnrollmentStatus>,
    pub enrolled_on: Option<NaiveDate>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct EnrollmentResponse {
    pub id: i32,
    pub student_id: i32,
    pub discipline_id: i32,
    pub enrolled_on: NaiveDate,
    pub status: EnrollmentStatus,
}

impl From<enrollment::Model> for EnrollmentResponse {
    fn from(m: enrollment::Model) -> Self {
        Self {
            id: m.id,
            student_id: m.student_id,
            discipline_id: m.discipline_id,
            enrolled_on: m.enrolled_on,
            status: m.status,
        }
    }
}

#[derive(Deserialize, IntoParams)]
pub struct EnrollmentListQuery {
    /// Searches student names, username and discipline name.
    pub q: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub discipline_id: Option<i32>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub student_id: Option<i32>,
    pub status: Option<EnrollmentStatus>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct EnrollmentListItem {
    #[serde(flatten)]
    pub enrollment: EnrollmentResponse,
    pub student_username: String,
    pub student_name: String,
    pub discipline_name: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct EnrollmentListResponse {
    pub data: Vec<EnrollmentListItem>,
    pub pagination: Pagination,
}
