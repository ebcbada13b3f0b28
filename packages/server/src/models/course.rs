use serde::{Deserialize, Serialize};
use utoipa::IntoParams;

use super::shared::{Pagination, validate_name};
use crate::entity::course;
use crate::error::AppError;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateCourseRequest {
    #[schema(example = "3°B")]
    pub name: String,
}

pub fn validate_create_course(payload: &CreateCourseRequest) -> Result<(), AppError> {
    validate_name("Name", &payload.name, 50)
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct CourseResponse {
    pub id: i32,
    pub name: String,
}

impl From<course::Model> for CourseResponse {
    fn from(m: course::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
        }
    }
}

#[derive(Deserialize, IntoParams)]
pub struct CourseListQuery {
    pub q: Option<String>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct CourseListResponse {
    pub data: Vec<CourseResponse>,
    pub pagination: Pagination,
}
