use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;

use crate::response::ApiResponse;
use util::state::AppState;

use super::common::AttendanceSessionResponse;
use db::models::attendance_session::Model as Session;

/// PUT /api/modules/{module_id}/attendance/sessions/{session_id}/end
///
/// End a session ahead of its expiry. Ending is one-way: the active flag
/// drops and `ended_at` is set, which immediately stops PIN check-ins and
/// makes QR attempts report as expired. Ending an already-ended session is
/// a no-op that returns the session unchanged.
///
/// **Auth**: Lecturer or AssistantLecturer for the module (router layer).
pub async fn end_session(
    State(state): State<AppState>,
    Path((module_id, session_id)): Path<(i64, i64)>,
) -> (StatusCode, Json<ApiResponse<AttendanceSessionResponse>>) {
    let db = state.db();

    let existing = match Session::find_by_id_and_module(db, session_id, module_id).await {
        Ok(Some(row)) => row,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ApiResponse::error("Attendance session not found")),
            );
        }
        Err(_) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error(
                    "Database error retrieving attendance session",
                )),
            );
        }
    };

    match existing.end(db, Utc::now()).await {
        Ok(ended) => {
            let student_count = Session::student_count_for_module(db, module_id)
                .await
                .unwrap_or(0);
            let attended_count = Session::attended_count(db, session_id).await.unwrap_or(0);
            (
                StatusCode::OK,
                Json(ApiResponse::success(
                    AttendanceSessionResponse::from_with_counts(
                        ended,
                        attended_count,
                        student_count,
                    ),
                    "Attendance session ended",
                )),
            )
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error(format!(
                "Failed to end attendance session: {e}"
            ))),
        ),
    }
}
