use axum::{Router, routing::get};

use crate::state::AppState;

use super::controller::{
    assign_grade, delete_grade, get_grade, get_grades, get_student_course_grades, update_grade,
};

pub fn init_grades_router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_grades).post(assign_grade))
        .route("/{id}", get(get_grade).put(update_grade).delete(delete_grade))
        .route(
            "/courses/{course_id}/students/{student_id}/grades",
            get(get_student_course_grades),
        )
}
