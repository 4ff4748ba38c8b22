use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

use super::controller::{change_password, get_profile, login_user, register_user};

pub fn init_auth_router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register_user))
        .route("/login", post(login_user))
        .route("/profile", get(get_profile))
        .route("/change-password", post(change_password))
}
