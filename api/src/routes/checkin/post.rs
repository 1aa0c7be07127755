//! Student-facing check-in endpoints. Both channels funnel into the same
//! admission call; the data store's uniqueness constraint settles duplicates,
//! so these handlers never pre-check for an existing record.

use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use validator::Validate;

use crate::{auth::AuthUser, response::ApiResponse};
use util::state::AppState;
use util::validation::format_validation_errors;

use super::common::{CheckinAccepted, CheckinRejection, PinCheckinReq, QrCheckinReq};
use db::checkin::{CheckinAttempt, CheckinError};
use db::models::attendance_record;

/// Which channel the attempt arrived on. The PIN path folds "unknown" and
/// "expired" into the same user-facing message so guessing PINs learns
/// nothing from the distinction; the QR path reports them apart because a
/// scanning client wants "right code, too late" told apart from "wrong code".
enum Channel {
    Qr,
    Pin,
}

/// POST /api/attendance/check-in/qr
///
/// Check in with a scanned QR payload. A request carrying `captured_at` is
/// an offline replay: the record keeps the device-side scan time and is
/// flagged as offline-origin.
///
/// **Auth**: Any authenticated user; the admission logic requires the
/// Student role in the session's module.
///
/// ### Request Body
/// ```json
/// {
///   "session_id": 42,
///   "qr_token": "0000019c21f06a80f3b1...",
///   "captured_at": "2026-03-02T09:14:05Z"
/// }
/// ```
///
/// ### Responses
/// - `200 OK` → `{ "ok": true, "session_id": 42, "method": "qr", ... }`
/// - `404` `data.error = "not_found"`, `400` `"expired"`, `409` `"duplicate"`,
///   `400` `"invalid_request"`, `403` generic.
pub async fn check_in_qr(
    State(state): State<AppState>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
    Json(body): Json<QrCheckinReq>,
) -> Response {
    if let Err(validation_errors) = body.validate() {
        return reject(
            StatusCode::BAD_REQUEST,
            "invalid_request",
            format_validation_errors(&validation_errors),
        );
    }

    let attempt = match body.captured_at {
        Some(captured_at) => CheckinAttempt::QrOfflineSync {
            session_id: body.session_id,
            qr_token: body.qr_token,
            captured_at,
        },
        None => CheckinAttempt::Qr {
            session_id: body.session_id,
            qr_token: body.qr_token,
        },
    };

    let outcome =
        attendance_record::Model::admit(state.db(), attempt, claims.sub, Utc::now()).await;
    respond(Channel::Qr, outcome)
}

/// POST /api/attendance/check-in/pin
///
/// Check in with the session's six-digit PIN. PINs resolve among active
/// sessions only, so an ended session's PIN reads as invalid.
///
/// **Auth**: Any authenticated user; the admission logic requires the
/// Student role in the session's module.
///
/// ### Request Body
/// ```json
/// { "pin_code": "204916" }
/// ```
///
/// ### Responses
/// - `200 OK` → `{ "ok": true, ... }`
/// - `404` `data.error = "invalid_pin"` and `400` `"expired"` share the
///   message "Invalid or expired PIN"; `409` `"duplicate"`, `403` generic.
pub async fn check_in_pin(
    State(state): State<AppState>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
    Json(body): Json<PinCheckinReq>,
) -> Response {
    if let Err(validation_errors) = body.validate() {
        return reject(
            StatusCode::BAD_REQUEST,
            "invalid_request",
            format_validation_errors(&validation_errors),
        );
    }

    let attempt = CheckinAttempt::Pin {
        code: body.pin_code,
    };

    let outcome =
        attendance_record::Model::admit(state.db(), attempt, claims.sub, Utc::now()).await;
    respond(Channel::Pin, outcome)
}

/// Renders an admission outcome as the wire response. Every rejection class
/// carries its stable code in `data.error`; authorization and transport
/// failures stay generic so callers cannot probe which check refused them.
fn respond(
    channel: Channel,
    outcome: Result<attendance_record::Model, CheckinError>,
) -> Response {
    match outcome {
        Ok(record) => (
            StatusCode::OK,
            Json(ApiResponse::success(
                CheckinAccepted {
                    ok: true,
                    session_id: record.session_id,
                    method: record.method.to_string(),
                    recorded_at: record.recorded_at.to_rfc3339(),
                },
                "Attendance recorded",
            )),
        )
            .into_response(),
        Err(CheckinError::NotFound) => {
            let (code, message) = match channel {
                Channel::Qr => ("not_found", "Attendance session not found"),
                Channel::Pin => ("invalid_pin", "Invalid or expired PIN"),
            };
            reject(StatusCode::NOT_FOUND, code, message)
        }
        Err(CheckinError::Expired) => {
            let message = match channel {
                Channel::Qr => "Session is no longer open for check-in",
                Channel::Pin => "Invalid or expired PIN",
            };
            reject(StatusCode::BAD_REQUEST, "expired", message)
        }
        Err(CheckinError::Duplicate) => reject(
            StatusCode::CONFLICT,
            "duplicate",
            "Attendance already recorded",
        ),
        Err(CheckinError::Validation(message)) => {
            reject(StatusCode::BAD_REQUEST, "invalid_request", message)
        }
        Err(CheckinError::Forbidden) => (
            StatusCode::FORBIDDEN,
            Json(ApiResponse::<CheckinRejection>::error(
                "Not permitted to check in for this session",
            )),
        )
            .into_response(),
        Err(CheckinError::Db(e)) => {
            tracing::error!(error = %e, "Database error during check-in");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<CheckinRejection>::error(
                    "Failed to record attendance",
                )),
            )
                .into_response()
        }
    }
}

fn reject(status: StatusCode, code: &str, message: impl Into<String>) -> Response {
    (
        status,
        Json(ApiResponse::failure(
            CheckinRejection {
                error: code.to_string(),
            },
            message,
        )),
    )
        .into_response()
}
