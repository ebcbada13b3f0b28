//! Permission names checked by handlers, and the default role grants.

use crate::entity::role::{ADMIN, COORDINATOR, STUDENT, TRAINER};

pub const USER_MANAGE: &str = "user:manage";
pub const COURSE_MANAGE: &str = "course:manage";
pub const COURSE_VIEW: &str = "course:view";
pub const DISCIPLINE_MANAGE: &str = "discipline:manage";
pub const ACTIVITY_MANAGE: &str = "activity:manage";
pub const ENROLLMENT_VIEW: &str = "enrollment:view";
pub const ENROLLMENT_MANAGE: &str = "enrollment:manage";
pub const ATTENDANCE_VIEW: &str = "attendance:view";
pub const ATTENDANCE_MARK: &str = "attendance:mark";
pub const ATTENDANCE_TOGGLE: &str = "attendance:toggle";

/// Roles seeded on startup.
pub const DEFAULT_ROLES: &[&str] = &[ADMIN, COORDINATOR, TRAINER, STUDENT];

/// Role-permission grants seeded on startup.
pub const DEFAULT_MAPPINGS: &[(&str, &str)] = &[
    // Admin
    (ADMIN, USER_MANAGE),
    (ADMIN, COURSE_MANAGE),
    (ADMIN, COURSE_VIEW),
    (ADMIN, DISCIPLINE_MANAGE),
    (ADMIN, ACTIVITY_MANAGE),
    (ADMIN, ENROLLMENT_VIEW),
    (ADMIN, ENROLLMENT_MANAGE),
    (ADMIN, ATTENDANCE_VIEW),
    (ADMIN, ATTENDANCE_MARK),
    (ADMIN, ATTENDANCE_TOGGLE),
    // Sports coordinator
    (COORDINATOR, COURSE_VIEW),
    (COORDINATOR, DISCIPLINE_MANAGE),
    (COORDINATOR, ACTIVITY_MANAGE),
    (COORDINATOR, ENROLLMENT_VIEW),
    (COORDINATOR, ENROLLMENT_MANAGE),
    // Trainer
    (TRAINER, DISCIPLINE_MANAGE),
    (TRAINER, ACTIVITY_MANAGE),
    (TRAINER, ENROLLMENT_VIEW),
    (TRAINER, ATTENDANCE_VIEW),
    (TRAINER, ATTENDANCE_MARK),
    (TRAINER, ATTENDANCE_TOGGLE),
];
