use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::handlers;
use crate::state::AppState;

pub fn routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .nest("/auth", auth_routes())
        .nest("/users", user_routes())
        .nest("/courses", course_routes())
        .nest("/disciplines", discipline_routes())
        .nest("/activities", activity_routes())
        .nest("/enrollments", enrollment_routes())
        .nest("/attendance", attendance_routes())
}

fn auth_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::auth::login))
        .routes(routes!(handlers::auth::logout))
        .routes(routes!(handlers::auth::me))
}

fn user_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::user::register_user,
            handlers::user::list_users
        ))
        .routes(routes!(handlers::user::get_user, handlers::user::update_user))
        .routes(routes!(handlers::user::toggle_user))
}

fn course_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::course::create_course,
            handlers::course::list_courses
        ))
        .routes(routes!(handlers::course::delete_course))
}

fn discipline_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::discipline::create_discipline,
            handlers::discipline::list_disciplines
        ))
        .routes(routes!(
            handlers::discipline::get_discipline,
            handlers::discipline::update_discipline,
            handlers::discipline::delete_discipline
        ))
        .routes(routes!(handlers::discipline::list_discipline_students))
}

fn activity_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::activity::create_activity,
            handlers::activity::list_activities
        ))
        .routes(routes!(
            handlers::activity::get_activity,
            handlers::activity::update_activity,
            handlers::activity::delete_activity
        ))
}

fn enrollment_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::enrollment::create_enrollment,
            handlers::enrollment::list_enrollments
        ))
        .routes(routes!(
            handlers::enrollment::get_enrollment,
            handlers::enrollment::update_enrollment,
            handlers::enrollment::delete_enrollment
        ))
}

fn attendance_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::attendance::get_marking_view,
            handlers::attendance::mark_attendance
        ))
        .routes(routes!(handlers::attendance::list_sessions))
        .routes(routes!(handlers::attendance::get_session))
        .routes(routes!(handlers::attendance::toggle_session))
        .routes(routes!(handlers::attendance::list_selectable))
        .routes(routes!(handlers::attendance::select_activity))
}
