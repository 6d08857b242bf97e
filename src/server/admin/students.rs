use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::auth::RequireAdmin;
use crate::server::AppState;
use crate::server::dto::CreateStudentRequest;
use crate::server::response::{ApiError, ApiResponse};

pub async fn create_student(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateStudentRequest>,
) -> impl IntoResponse {
    let student = state.passes.create_student(&req.roll_number, &req.name)?;
    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(student))))
}

pub async fn list_students(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let students = state.passes.list_students()?;
    Ok::<_, ApiError>(Json(ApiResponse::success(students)))
}

pub async fn delete_student(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    state.passes.delete_student(&id)?;
    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
