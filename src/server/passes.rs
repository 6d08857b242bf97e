use std::sync::Arc;

use axum::{
    Json,
    Router,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::json;

use super::AppState;
use super::dto::{ActivityParams, IssuePassRequest, IssuePassResponse, ScanRequest, ScanResponse};
use super::response::{ApiError, ApiResponse};
use crate::error::Error;
use crate::qr;

const DEFAULT_ACTIVITY_LIMIT: i64 = 20;
const MAX_ACTIVITY_LIMIT: i64 = 200;

pub fn pass_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/passes", post(issue_pass))
        .route("/scan", post(scan_pass))
        .route("/stats", get(stats))
        .route("/activity", get(recent_activity))
}

fn qr_data_url(token: &str) -> Result<String, ApiError> {
    let png = qr::encode_png(token)?;
    Ok(format!("data:image/png;base64,{}", STANDARD.encode(png)))
}

async fn issue_pass(
    State(state): State<Arc<AppState>>,
    Json(req): Json<IssuePassRequest>,
) -> impl IntoResponse {
    match state.passes.issue(&req.roll_number) {
        Ok(issued) => {
            let qr_code = qr_data_url(&issued.token)?;
            Ok((
                StatusCode::CREATED,
                Json(ApiResponse::success(IssuePassResponse {
                    message: format!("Welcome {}! Your lunch pass is ready.", issued.student_name),
                    qr_code,
                    token: issued.token,
                    student_name: issued.student_name,
                    roll_number: issued.roll_number,
                })),
            ))
        }
        // Re-display the existing pass instead of minting a duplicate
        Err(Error::ActivePassExists {
            token,
            student_name,
        }) => {
            let qr_code = qr_data_url(&token)?;
            Err(
                ApiError::conflict("You already have an active lunch pass!").with_detail(json!({
                    "token": token,
                    "qr_code": qr_code,
                    "student_name": student_name,
                })),
            )
        }
        Err(e) => Err(ApiError::from(e)),
    }
}

async fn scan_pass(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ScanRequest>,
) -> impl IntoResponse {
    let granted = state.passes.redeem(&req.token)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(ScanResponse {
        valid: true,
        message: "Lunch pass valid! Entry granted.".to_string(),
        student_name: granted.student_name,
        roll_number: granted.roll_number,
    })))
}

async fn stats(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let stats = state.passes.stats()?;
    Ok::<_, ApiError>(Json(ApiResponse::success(stats)))
}

async fn recent_activity(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ActivityParams>,
) -> impl IntoResponse {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_ACTIVITY_LIMIT)
        .clamp(1, MAX_ACTIVITY_LIMIT);

    let activity = state.passes.recent_activity(limit)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(activity)))
}
