//! The wire client a check-in device talks through.
//!
//! [`CheckinApi`] is the seam between capture/reconcile logic and the
//! network, so tests can script verdicts without a server. [`HttpCheckinApi`]
//! is the real implementation over the attendance service's check-in
//! endpoints, translating the `ApiResponse` envelope's stable error codes
//! into [`ReplayError`] verdicts.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::Serialize;

use crate::error::ReplayError;

/// Body of `POST /api/attendance/check-in/qr`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QrCheckinRequest {
    pub session_id: i64,
    pub qr_token: String,
    /// Original device-side scan time; present only when replaying an
    /// offline capture.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub captured_at: Option<DateTime<Utc>>,
}

/// Body of `POST /api/attendance/check-in/pin`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PinCheckinRequest {
    pub pin_code: String,
}

/// Where and as whom the device submits.
#[derive(Debug, Clone)]
pub struct DeviceSession {
    /// Server root, e.g. `https://rollcall.example.com`.
    pub base_url: String,
    /// The student's bearer token from `POST /api/auth/login`.
    pub bearer_token: String,
}

/// What the capture and reconcile flows need from the server.
#[async_trait]
pub trait CheckinApi {
    /// Cheap connectivity probe deciding live submit versus queueing.
    async fn is_online(&self) -> bool;
    async fn submit_qr(&self, req: &QrCheckinRequest) -> Result<(), ReplayError>;
    async fn submit_pin(&self, req: &PinCheckinRequest) -> Result<(), ReplayError>;
}

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// [`CheckinApi`] over HTTP with bearer auth.
pub struct HttpCheckinApi {
    session: DeviceSession,
    client: reqwest::Client,
}

impl HttpCheckinApi {
    pub fn new(session: DeviceSession) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { session, client })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.session.base_url.trim_end_matches('/'), path)
    }

    async fn post_checkin<B: Serialize>(&self, path: &str, body: &B) -> Result<(), ReplayError> {
        let resp = self
            .client
            .post(self.url(path))
            .bearer_auth(&self.session.bearer_token)
            .json(body)
            .send()
            .await
            .map_err(|e| ReplayError::Transport(e.to_string()))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        // Failure envelope: { success, data: { error: <code> }, message }.
        // Bodies that are not the envelope fall back to the status line.
        let body: serde_json::Value = resp.json().await.unwrap_or(serde_json::Value::Null);
        let code = body["data"]["error"].as_str().unwrap_or("");
        let message = body["message"].as_str().unwrap_or("");
        Err(classify(status, code, message))
    }
}

/// Maps a non-success response onto the replay taxonomy. The envelope's
/// stable error code is authoritative; the status line is the fallback for
/// responses carrying no envelope.
fn classify(status: StatusCode, code: &str, message: &str) -> ReplayError {
    match code {
        "duplicate" => return ReplayError::Duplicate,
        "expired" => return ReplayError::Expired,
        "not_found" | "invalid_pin" => return ReplayError::SessionGone,
        _ => {}
    }
    if status == StatusCode::CONFLICT {
        return ReplayError::Duplicate;
    }
    if status.is_server_error() {
        return ReplayError::Transport(format!("server error {status}"));
    }
    if message.is_empty() {
        ReplayError::Rejected(status.to_string())
    } else {
        ReplayError::Rejected(message.to_string())
    }
}

#[async_trait]
impl CheckinApi for HttpCheckinApi {
    async fn is_online(&self) -> bool {
        let url = self.url("/api/health");
        match self.client.get(url).timeout(PROBE_TIMEOUT).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    async fn submit_qr(&self, req: &QrCheckinRequest) -> Result<(), ReplayError> {
        self.post_checkin("/api/attendance/check-in/qr", req).await
    }

    async fn submit_pin(&self, req: &PinCheckinRequest) -> Result<(), ReplayError> {
        self.post_checkin("/api/attendance/check-in/pin", req).await
    }
}
