//! Attendance module: read-only routes (list sessions, get session, fetch
//! the QR payload, the active session, and the attendee view).

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};
use std::collections::HashMap;
use util::state::AppState;

use crate::response::ApiResponse;

use super::common::{AttendanceSessionResponse, AttendeeResponse, ListQuery, ListResponse};
use db::models::attendance_record;
use db::models::attendance_session::{
    Column as SessionCol, Entity as SessionEntity, Model as Session,
};
use db::models::user::{Column as UserCol, Entity as UserEntity};

/// GET `/api/modules/{module_id}/attendance/sessions`
///
/// List attendance sessions for a module.
///
/// **Auth**: Lecturer or AssistantLecturer for the module (router layer).
///
/// **Query**:
/// - `q` *(optional)*: fuzzy match on title
/// - `active` *(optional bool)*
/// - `sort` *(optional)*: `created_at` | `title` | `expires_at` (prefix `-` for desc)
/// - `page` *(default 1)*
/// - `per_page` *(default 20, max 100)*
///
/// **Response**: `ListResponse` with `attended_count` and `student_count` per session.
pub async fn list_sessions(
    State(state): State<AppState>,
    Path(module_id): Path<i64>,
    Query(q): Query<ListQuery>,
) -> (StatusCode, Json<ApiResponse<ListResponse>>) {
    let db = state.db();
    let page = q.page.unwrap_or(1).max(1) as u64;
    let per_page = q.per_page.unwrap_or(20).clamp(1, 100) as u64;

    // Base select
    let mut sel = SessionEntity::find().filter(SessionCol::ModuleId.eq(module_id));
    if let Some(s) = q.q.as_ref().filter(|s| !s.trim().is_empty()) {
        sel = sel.filter(SessionCol::Title.contains(s));
    }
    if let Some(a) = q.active {
        sel = sel.filter(SessionCol::Active.eq(a));
    }
    sel = match q.sort.as_deref() {
        Some(sort) if sort.starts_with('-') => match &sort[1..] {
            "created_at" => sel.order_by_desc(SessionCol::CreatedAt),
            "title" => sel.order_by_desc(SessionCol::Title),
            "expires_at" => sel.order_by_desc(SessionCol::ExpiresAt),
            _ => sel.order_by_desc(SessionCol::CreatedAt),
        },
        Some("created_at") => sel.order_by_asc(SessionCol::CreatedAt),
        Some("title") => sel.order_by_asc(SessionCol::Title),
        Some("expires_at") => sel.order_by_asc(SessionCol::ExpiresAt),
        _ => sel.order_by_desc(SessionCol::CreatedAt), // default newest first
    };

    let paginator = sel.paginate(db, per_page);
    let total = paginator.num_items().await.unwrap_or(0) as i32;
    let rows: Vec<Session> = paginator
        .fetch_page(page.saturating_sub(1))
        .await
        .unwrap_or_default();

    // Counts
    let student_count = Session::student_count_for_module(db, module_id)
        .await
        .unwrap_or(0);

    let session_ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
    let attended_map = Session::attended_counts_for(db, &session_ids)
        .await
        .unwrap_or_default();

    let resp = ListResponse {
        sessions: rows
            .into_iter()
            .map(|s| {
                let attended = *attended_map.get(&s.id).unwrap_or(&0);
                AttendanceSessionResponse::from_with_counts(s, attended, student_count)
            })
            .collect(),
        page: page as i32,
        per_page: per_page as i32,
        total,
    };

    (
        StatusCode::OK,
        Json(ApiResponse::success(resp, "Attendance sessions retrieved")),
    )
}

/// GET `/api/modules/{module_id}/attendance/sessions/{session_id}`
///
/// Fetch a single attendance session with counts.
///
/// **Auth**: Lecturer or AssistantLecturer for the module.
pub async fn get_session(
    State(state): State<AppState>,
    Path((module_id, session_id)): Path<(i64, i64)>,
) -> (StatusCode, Json<ApiResponse<AttendanceSessionResponse>>) {
    let db = state.db();

    match Session::find_by_id_and_module(db, session_id, module_id).await {
        Ok(Some(row)) => {
            let student_count = Session::student_count_for_module(db, module_id)
                .await
                .unwrap_or(0);
            let attended_count = Session::attended_count(db, session_id).await.unwrap_or(0);

            let resp =
                AttendanceSessionResponse::from_with_counts(row, attended_count, student_count);

            (
                StatusCode::OK,
                Json(ApiResponse::success(resp, "Attendance session retrieved")),
            )
        }
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error("Attendance session not found")),
        ),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error(
                "Database error retrieving attendance session",
            )),
        ),
    }
}

/// GET `/api/modules/{module_id}/attendance/sessions/{session_id}/qr`
///
/// Get the opaque payload a displayed QR code carries for this session.
///
/// **Auth**: Lecturer or AssistantLecturer.
///
/// **Notes**:
/// - Returns `400` if the session has been ended or its window has elapsed.
/// - The payload is a capability: anyone who captures it before expiry can
///   redeem it once per student identity. It is not a signed credential.
pub async fn get_session_qr(
    State(state): State<AppState>,
    Path((module_id, session_id)): Path<(i64, i64)>,
) -> (StatusCode, Json<ApiResponse<String>>) {
    let db = state.db();

    let Some(session) = Session::find_by_id_and_module(db, session_id, module_id)
        .await
        .ok()
        .flatten()
    else {
        return (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error("Attendance session not found")),
        );
    };

    if !session.usable_at(Utc::now()) {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("Session is not open for check-in")),
        );
    }

    (
        StatusCode::OK,
        Json(ApiResponse::success(session.qr_payload(), "QR payload")),
    )
}

/// GET `/api/modules/{module_id}/attendance/active`
///
/// The newest active session for the module, or `null` when none is open.
///
/// **Auth**: Any user assigned to the module.
pub async fn get_active_session(
    State(state): State<AppState>,
    Path(module_id): Path<i64>,
) -> (StatusCode, Json<ApiResponse<Option<AttendanceSessionResponse>>>) {
    let db = state.db();

    match Session::find_active_for_module(db, module_id).await {
        Ok(Some(row)) => {
            let student_count = Session::student_count_for_module(db, module_id)
                .await
                .unwrap_or(0);
            let attended_count = Session::attended_count(db, row.id).await.unwrap_or(0);
            let resp =
                AttendanceSessionResponse::from_with_counts(row, attended_count, student_count);
            (
                StatusCode::OK,
                Json(ApiResponse::success(Some(resp), "Active session retrieved")),
            )
        }
        Ok(None) => (
            StatusCode::OK,
            Json(ApiResponse::success(None, "No active session")),
        ),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error(
                "Database error retrieving active session",
            )),
        ),
    }
}

/// GET `/api/modules/{module_id}/attendance/sessions/{session_id}/attendees`
///
/// List check-in records for a session joined with each student's display
/// name and optional signature image reference, newest first.
///
/// **Auth**: Lecturer or AssistantLecturer.
///
/// Missing identity or signature data degrades to empty fields rather than
/// failing the whole response.
pub async fn list_attendees(
    State(state): State<AppState>,
    Path((module_id, session_id)): Path<(i64, i64)>,
) -> (StatusCode, Json<ApiResponse<Vec<AttendeeResponse>>>) {
    let db = state.db();

    match Session::find_by_id_and_module(db, session_id, module_id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ApiResponse::error("Attendance session not found")),
            );
        }
        Err(_) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error("Database error retrieving attendees")),
            );
        }
    }

    let records = match attendance_record::Model::for_session(db, session_id).await {
        Ok(v) => v,
        Err(_) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error("Database error retrieving attendees")),
            );
        }
    };

    // Resolve identities for the records in one query.
    let user_ids: Vec<i64> = records.iter().map(|r| r.user_id).collect();
    let mut user_map = HashMap::new();
    if !user_ids.is_empty() {
        let users = UserEntity::find()
            .filter(UserCol::Id.is_in(user_ids))
            .all(db)
            .await
            .unwrap_or_default();
        for u in users {
            user_map.insert(u.id, u);
        }
    }

    let attendees = records
        .into_iter()
        .map(|r| {
            let (username, display_name, signature_path) = match user_map.get(&r.user_id) {
                Some(u) => (
                    u.username.clone(),
                    u.display_name.clone(),
                    u.signature_path.clone(),
                ),
                None => (String::new(), String::new(), None),
            };
            AttendeeResponse {
                user_id: r.user_id,
                username,
                display_name,
                signature_path,
                method: r.method.to_string(),
                offline: r.offline,
                recorded_at: r.recorded_at.to_rfc3339(),
                captured_at: r.captured_at.map(|t| t.to_rfc3339()),
            }
        })
        .collect();

    (
        StatusCode::OK,
        Json(ApiResponse::success(attendees, "Attendees retrieved")),
    )
}
