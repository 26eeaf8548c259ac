//! Attendance report endpoints.

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use tracing::info;

use super::error::ApiError;
use super::json_body;
use super::request_context::RequestContext;
use crate::reports::{deserialize_optional_key, ReportCriteria, ReportRow};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/getAttendanceReport", post(get_attendance_report))
        .route("/getAttendanceById", post(get_attendance_by_id))
}

/// Request for one student's attendance in a semester and subject.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentReportRequest {
    pub student_id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_key")]
    pub semester: Option<String>,
    pub subject: Option<String>,
}

/// POST /api/getAttendanceReport
async fn get_attendance_report(
    State(state): State<AppState>,
    ctx: RequestContext,
    body: Result<Json<ReportCriteria>, JsonRejection>,
) -> Result<Json<Vec<ReportRow>>, ApiError> {
    let criteria = json_body(body, &ctx)?;

    let rows = state
        .reports()
        .report(&criteria)
        .await
        .map_err(|e| ApiError::from(e).with_request_id(ctx.request_id.clone()))?;

    info!(
        request_id = %ctx.request_id,
        rows = rows.len(),
        "Attendance report served"
    );
    Ok(Json(rows))
}

/// POST /api/getAttendanceById
async fn get_attendance_by_id(
    State(state): State<AppState>,
    ctx: RequestContext,
    body: Result<Json<StudentReportRequest>, JsonRejection>,
) -> Result<Json<ReportRow>, ApiError> {
    let req = json_body(body, &ctx)?;

    let row = state
        .reports()
        .student_report(
            req.student_id.as_deref().unwrap_or_default(),
            req.semester.as_deref().unwrap_or_default(),
            req.subject.as_deref().unwrap_or_default(),
        )
        .await
        .map_err(|e| ApiError::from(e).with_request_id(ctx.request_id.clone()))?;

    Ok(Json(row))
}
