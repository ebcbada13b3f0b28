use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::IntoParams;

use super::shared::{Pagination, validate_max_len, validate_name};
use crate::entity::{profile, role, student, user};
use crate::error::AppError;
use crate::permissions::DEFAULT_ROLES;

/// Request body for registering a user with its profile.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct RegisterUserRequest {
    /// Unique username (1-32 chars, alphanumeric and underscores).
    #[schema(example = "mlopez")]
    pub username: String,
    /// Password (8-128 characters).
    #[schema(example = "s3cure_P@ss!")]
    pub password: String,
    /// Must equal `password`.
    pub password_confirm: String,
    #[serde(default)]
    #[schema(example = "mlopez@school.cl")]
    pub email: String,
    #[schema(example = "María")]
    pub first_name: String,
    #[schema(example = "López")]
    pub last_name: String,
    /// National identity number, unique.
    #[schema(example = "12.345.678-9")]
    pub run: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    /// One of `admin`, `coordinator`, `trainer`, `student`.
    #[schema(example = "student")]
    pub role: String,
    /// Required when `role` is `student`.
    pub course_id: Option<i32>,
    /// Required when `role` is `student`.
    pub admission_date: Option<NaiveDate>,
}

fn validate_username(username: &str) -> Result<(), AppError> {
    if username.is_empty() || username.chars().count() > 32 {
        return Err(AppError::Validation(
            "Username must be 1-32 characters".into(),
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(AppError::Validation(
            "Username must contain only letters, digits, and underscores".into(),
        ));
    }
    Ok(())
}

fn validate_password(password: &str, confirm: &str) -> Result<(), AppError> {
    if password.len() < 8 || password.len() > 128 {
        return Err(AppError::Validation(
            "Password must be 8-128 characters".into(),
        ));
    }
    if password != confirm {
        return Err(AppError::Validation("Passwords do not match".into()));
    }
    Ok(())
}

fn validate_role(role_name: &str) -> Result<(), AppError> {
    if !DEFAULT_ROLES.contains(&role_name) {
        return Err(AppError::Validation(format!(
            "Role must be one of: {}",
            DEFAULT_ROLES.join(", ")
        )));
    }
    Ok(())
}

fn validate_contact(email: &str, phone: &str, address: &str) -> Result<(), AppError> {
    validate_max_len("Email", email, 254)?;
    if !email.trim().is_empty() && !email.contains('@') {
        return Err(AppError::Validation("Email is not valid".into()));
    }
    validate_max_len("Phone", phone, 20)?;
    validate_max_len("Address", address, 200)
}

pub fn validate_register_request(payload: &RegisterUserRequest) -> Result<(), AppError> {
    validate_username(payload.username.trim())?;
    validate_password(&payload.password, &payload.password_confirm)?;
    validate_name("First name", &payload.first_name, 150)?;
    validate_name("Last name", &payload.last_name, 150)?;
    validate_name("RUN", &payload.run, 20)?;
    validate_contact(&payload.email, &payload.phone, &payload.address)?;
    validate_role(&payload.role)?;
    if payload.role == role::STUDENT
        && (payload.course_id.is_none() || payload.admission_date.is_none())
    {
        return Err(AppError::Validation(
            "Students need a course and an admission date".into(),
        ));
    }
    Ok(())
}

/// Partial update of a user and its profile. Absent fields are left as they are.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub run: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub role: Option<String>,
    /// New password; leave out to keep the current one.
    pub password: Option<String>,
    pub password_confirm: Option<String>,
    /// Used when the user becomes a student without a student record.
    pub course_id: Option<i32>,
    pub admission_date: Option<NaiveDate>,
}

pub fn validate_update_request(payload: &UpdateUserRequest) -> Result<(), AppError> {
    if let Some(ref v) = payload.first_name {
        validate_name("First name", v, 150)?;
    }
    if let Some(ref v) = payload.last_name {
        validate_name("Last name", v, 150)?;
    }
    if let Some(ref v) = payload.run {
        validate_name("RUN", v, 20)?;
    }
    validate_contact(
        payload.email.as_deref().unwrap_or_default(),
        payload.phone.as_deref().unwrap_or_default(),
        payload.address.as_deref().unwrap_or_default(),
    )?;
    if let Some(ref v) = payload.role {
        validate_role(v)?;
    }
    if let Some(ref password) = payload.password {
        validate_password(
            password,
            payload.password_confirm.as_deref().unwrap_or_default(),
        )?;
    }
    Ok(())
}

#[derive(Deserialize, IntoParams)]
pub struct UserListQuery {
    /// Searches username, names, RUN, phone, address and role. `activo`/`inactivo`
    /// style words also match the active flag.
    pub q: Option<String>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

/// Active-flag filter implied by a search word, if any.
pub fn active_keyword(term: &str) -> Option<bool> {
    match term.trim().to_lowercase().as_str() {
        "si" | "sí" | "true" | "1" | "activo" | "activos" => Some(true),
        "no" | "false" | "0" | "inactivo" | "inactivos" => Some(false),
        _ => None,
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ProfileInfo {
    pub id: i32,
    pub run: String,
    pub phone: String,
    pub address: String,
    #[schema(example = "trainer")]
    pub role: String,
    pub active: bool,
}

impl From<profile::Model> for ProfileInfo {
    fn from(p: profile::Model) -> Self {
        Self {
            id: p.id,
            run: p.run,
            phone: p.phone,
            address: p.address,
            role: p.role,
            active: p.active,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct StudentInfo {
    pub id: i32,
    pub course_id: i32,
    pub admission_date: NaiveDate,
}

impl From<student::Model> for StudentInfo {
    fn from(s: student::Model) -> Self {
        Self {
            id: s.id,
            course_id: s.course_id,
            admission_date: s.admission_date,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct UserResponse {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_superuser: bool,
    pub created_at: DateTime<Utc>,
    pub profile: Option<ProfileInfo>,
    pub student: Option<StudentInfo>,
}

impl UserResponse {
    pub fn new(
        user: user::Model,
        profile: Option<profile::Model>,
        student: Option<student::Model>,
    ) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            is_superuser: user.is_superuser,
            created_at: user.created_at,
            profile: profile.map(Into::into),
            student: student.map(Into::into),
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct UserListResponse {
    pub data: Vec<UserResponse>,
    pub pagination: Pagination,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ToggleUserResponse {
    pub user: UserResponse,
    #[schema(example = "User «María López» was disabled.")]
    pub message: String,
}
