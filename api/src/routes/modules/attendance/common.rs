use serde::{Deserialize, Serialize};
use validator::Validate;

/// Session DTO for lecturer-facing views. The PIN is included because the
/// lecturer displays it to the class; the QR token is not, the `/qr` route
/// serves the encoded payload instead.
#[derive(Debug, Serialize, Default)]
pub struct AttendanceSessionResponse {
    pub id: i64,
    pub module_id: i64,
    pub created_by: i64,
    pub title: String,
    pub pin_code: String,
    pub active: bool,
    pub created_at: String,
    pub expires_at: String,
    pub ended_at: Option<String>,
    pub attended_count: i64, // students who checked in for this session
    pub student_count: i64,  // total students in module
}

impl From<db::models::attendance_session::Model> for AttendanceSessionResponse {
    fn from(m: db::models::attendance_session::Model) -> Self {
        Self {
            id: m.id,
            module_id: m.module_id,
            created_by: m.created_by,
            title: m.title,
            pin_code: m.pin_code,
            active: m.active,
            created_at: m.created_at.to_rfc3339(),
            expires_at: m.expires_at.to_rfc3339(),
            ended_at: m.ended_at.map(|t| t.to_rfc3339()),
            attended_count: 0,
            student_count: 0,
        }
    }
}

impl AttendanceSessionResponse {
    pub fn from_with_counts(
        m: db::models::attendance_session::Model,
        attended_count: i64,
        student_count: i64,
    ) -> Self {
        let mut base = Self::from(m);
        base.attended_count = attended_count;
        base.student_count = student_count;
        base
    }
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub page: Option<i32>,
    pub per_page: Option<i32>,
    pub q: Option<String>,    // search in title
    pub active: Option<bool>, // filter by current status
    pub sort: Option<String>, // "created_at", "title", "expires_at"; "-" prefix for desc
}

#[derive(Debug, Serialize, Default)]
pub struct ListResponse {
    pub sessions: Vec<AttendanceSessionResponse>,
    pub page: i32,
    pub per_page: i32,
    pub total: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSessionReq {
    #[validate(length(min = 1, max = 120, message = "Title must be 1 to 120 characters"))]
    pub title: String,

    #[validate(range(min = 1, max = 1440, message = "Duration must be 1 to 1440 minutes"))]
    pub duration_minutes: i64,
}

/// One row of the attendee view: a check-in record joined with the student's
/// identity and optional signature image reference.
#[derive(Debug, Serialize)]
pub struct AttendeeResponse {
    pub user_id: i64,
    pub username: String,
    pub display_name: String,
    pub signature_path: Option<String>,
    pub method: String,
    pub offline: bool,
    pub recorded_at: String,
    pub captured_at: Option<String>,
}
