use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::{Duration, Utc};
use validator::Validate;

use crate::{auth::AuthUser, response::ApiResponse};
use util::state::AppState;
use util::validation::format_validation_errors;

use super::common::{AttendanceSessionResponse, CreateSessionReq};
use db::models::attendance_session::Model as Session;

/// POST /api/modules/{module_id}/attendance/sessions
///
/// Open a new time-boxed attendance session for the module. The QR token
/// and PIN are generated server-side and fixed for the session's lifetime;
/// expiry is `now + duration_minutes` and is never extended.
///
/// **Auth**: Lecturer or AssistantLecturer for the module (router layer).
///
/// ### Request Body
/// ```json
/// {
///   "title": "Week 5 lecture",
///   "duration_minutes": 30
/// }
/// ```
///
/// ### Responses
/// - `201 Created` with the session (counts included, `attended_count` 0)
/// - `400 Bad Request` on validation failure
pub async fn create_session(
    State(state): State<AppState>,
    Path(module_id): Path<i64>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
    Json(body): Json<CreateSessionReq>,
) -> (StatusCode, Json<ApiResponse<AttendanceSessionResponse>>) {
    if let Err(validation_errors) = body.validate() {
        let error_message = format_validation_errors(&validation_errors);
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error(error_message)),
        );
    }

    let title = body.title.trim();
    if title.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("Title must not be blank")),
        );
    }

    let db = state.db();
    let now = Utc::now();

    match Session::create(
        db,
        module_id,
        claims.sub,
        title,
        Duration::minutes(body.duration_minutes),
        now,
    )
    .await
    {
        Ok(row) => {
            let student_count = Session::student_count_for_module(db, module_id)
                .await
                .unwrap_or(0);
            (
                StatusCode::CREATED,
                Json(ApiResponse::success(
                    AttendanceSessionResponse::from_with_counts(row, 0, student_count),
                    "Attendance session created",
                )),
            )
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error(format!(
                "Failed to create attendance session: {e}"
            ))),
        ),
    }
}
