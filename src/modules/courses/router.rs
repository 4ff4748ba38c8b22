use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

use super::controller::{
    create_course, delete_course, get_course, get_course_students, get_courses, join_course,
    leave_course, search_courses, update_course,
};

pub fn init_courses_router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_courses).post(create_course))
        .route("/search", get(search_courses))
        .route("/join", post(join_course))
        .route("/leave", post(leave_course))
        .route(
            "/{id}",
            get(get_course).put(update_course).delete(delete_course),
        )
        .route("/{id}/students", get(get_course_students))
}
