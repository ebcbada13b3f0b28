pub mod activity;
pub mod attendance;
pub mod auth;
pub mod course;
pub mod discipline;
pub mod enrollment;
pub mod form;
pub mod user;
