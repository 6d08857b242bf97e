use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct IssuePassRequest {
    pub roll_number: String,
}

#[derive(Debug, Serialize)]
pub struct IssuePassResponse {
    pub token: String,
    /// PNG QR image as a data URL, ready for an <img> src.
    pub qr_code: String,
    pub student_name: String,
    pub roll_number: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct ScanRequest {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct ScanResponse {
    pub valid: bool,
    pub student_name: String,
    pub roll_number: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateStudentRequest {
    pub roll_number: String,
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ActivityParams {
    #[serde(default)]
    pub limit: Option<i64>,
}
