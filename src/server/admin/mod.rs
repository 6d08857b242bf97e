mod students;

use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post},
};

use crate::server::AppState;

pub fn admin_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/students", post(students::create_student))
        .route("/students", get(students::list_students))
        .route("/students/{id}", delete(students::delete_student))
}
