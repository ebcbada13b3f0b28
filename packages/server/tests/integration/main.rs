mod auth;
mod catalog;
mod common;
mod forms;
mod users;
