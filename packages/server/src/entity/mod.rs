pub mod activity;
pub mod activity_student;
pub mod attendance_detail;
pub mod attendance_session;
pub mod course;
pub mod discipline;
pub mod enrollment;
pub mod profile;
pub mod role;
pub mod role_permission;
pub mod student;
pub mod user;
