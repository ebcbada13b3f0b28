//! Attendance taking: who is expected, which session a save lands on, and
//! which participants end up recorded as present.

pub mod actor;
pub mod locator;
pub mod reconciler;
pub mod roster;
pub mod service;

use chrono::NaiveDate;
use sea_orm::DbErr;

use crate::error::AppError;
use crate::models::shared::display_date;

pub use actor::Actor;
pub use service::{AttendanceService, SaveOutcome};

#[derive(Debug, thiserror::Error)]
pub enum AttendanceError {
    #[error(
        "The activity has not started yet; attendance opens on {}",
        display_date(*.start)
    )]
    NotStarted { start: NaiveDate },
    #[error(
        "The date {} is before the activity start ({})",
        display_date(*.requested),
        display_date(*.start)
    )]
    BeforeStart {
        requested: NaiveDate,
        start: NaiveDate,
    },
    #[error(
        "The date {} is after the activity end ({})",
        display_date(*.requested),
        display_date(*.end)
    )]
    AfterEnd { requested: NaiveDate, end: NaiveDate },
    #[error("caller has no profile")]
    MissingProfile,
    #[error("caller profile is disabled")]
    InactiveProfile,
    #[error("Activity not found")]
    ActivityNotFound,
    #[error("No attendance session on {}", display_date(*.date))]
    SessionNotFound { date: NaiveDate },
    #[error("{0}")]
    Invalid(&'static str),
    #[error("This activity already has an attendance session")]
    AlreadyRecorded,
    #[error(transparent)]
    Db(#[from] DbErr),
}

impl From<AttendanceError> for AppError {
    fn from(e: AttendanceError) -> Self {
        match e {
            AttendanceError::NotStarted { .. } | AttendanceError::BeforeStart { .. } => {
                AppError::TooEarly(e.to_string())
            }
            AttendanceError::AfterEnd { .. } => AppError::TooLate(e.to_string()),
            AttendanceError::MissingProfile => AppError::ProfileRequired,
            AttendanceError::InactiveProfile => AppError::AccountDisabled,
            AttendanceError::ActivityNotFound | AttendanceError::SessionNotFound { .. } => {
                AppError::NotFound(e.to_string())
            }
            AttendanceError::Invalid(msg) => AppError::Validation(msg.into()),
            AttendanceError::AlreadyRecorded => AppError::Conflict(e.to_string()),
            AttendanceError::Db(db) => AppError::from(db),
        }
    }
}
