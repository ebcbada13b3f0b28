use serde::{Deserialize, Serialize};
use utoipa::IntoParams;

use super::attendance::RosterEntry;
use super::shared::{Pagination, validate_max_len, validate_name};
use crate::entity::discipline;
use crate::error::AppError;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateDisciplineRequest {
    /// Unique name (1-50 characters).
    #[schema(example = "Volleyball")]
    pub name: String,
    #[serde(default)]
    #[schema(example = "Indoor volleyball, mixed teams")]
    pub description: String,
}

pub fn validate_create_discipline(payload: &CreateDisciplineRequest) -> Result<(), AppError> {
    validate_name("Name", &payload.name, 50)?;
    validate_max_len("Description", &payload.description, 500)
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct UpdateDisciplineRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

pub fn validate_update_discipline(payload: &UpdateDisciplineRequest) -> Result<(), AppError> {
    if let Some(ref name) = payload.name {
        validate_name("Name", name, 50)?;
    }
    if let Some(ref description) = payload.description {
        validate_max_len("Description", description, 500)?;
    }
    Ok(())
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct DisciplineResponse {
    pub id: i32,
    pub name: String,
    pub description: String,
}

impl From<discipline::Model> for DisciplineResponse {
    fn from(m: discipline::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            description: m.description,
        }
    }
}

#[derive(Deserialize, IntoParams)]
pub struct DisciplineListQuery {
    /// Searches name and description.
    pub q: Option<String>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct DisciplineListResponse {
    pub data: Vec<DisciplineResponse>,
    pub pagination: Pagination,
}

/// Students actively enrolled in a discipline.
#[derive(Serialize, utoipa::ToSchema)]
pub struct DisciplineStudentsResponse {
    pub discipline: DisciplineResponse,
    pub students: Vec<RosterEntry>,
}
