use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

lazy_static::lazy_static! {
    static ref PIN_REGEX: regex::Regex = regex::Regex::new("^\\d{6}$").unwrap();
}

#[derive(Debug, Deserialize, Validate)]
pub struct QrCheckinReq {
    pub session_id: i64,

    #[validate(length(min = 1, message = "qr_token is required"))]
    pub qr_token: String,

    /// Device-side scan time. Present only when the scan was captured
    /// offline and is being replayed; its presence selects the
    /// offline-sync method and is stored on the record.
    pub captured_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct PinCheckinReq {
    #[validate(regex(path = &*PIN_REGEX, message = "PIN must be exactly 6 digits"))]
    pub pin_code: String,
}

#[derive(Debug, Serialize, Default)]
pub struct CheckinAccepted {
    pub ok: bool,
    pub session_id: i64,
    pub method: String,
    pub recorded_at: String,
}

/// Machine-readable rejection payload. `error` is a stable code the scanner
/// client switches on: `not_found`, `invalid_pin`, `expired`, `duplicate`,
/// or `invalid_request`.
#[derive(Debug, Serialize, Default)]
pub struct CheckinRejection {
    pub error: String,
}
