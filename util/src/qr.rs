//! Opaque QR payload codec shared by the server and the scanner kit.
//!
//! A displayed attendance QR carries `encode(...)` of the session id, the
//! session's QR token and its expiry timestamp. The encoding is reversible
//! hex over a JSON document: possession of a payload before expiry is what
//! admits a check-in, so the payload is a capability, not a signed credential.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The decoded contents of an attendance QR code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QrPayload {
    pub session_id: i64,
    pub qr_token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Error, PartialEq)]
pub enum QrDecodeError {
    #[error("payload is not valid hex")]
    Hex,
    #[error("payload does not decode to a QR document")]
    Document,
}

/// Encodes a payload into the opaque string rendered as a QR code.
pub fn encode(payload: &QrPayload) -> String {
    let json = serde_json::to_vec(payload).expect("QR payload serializes");
    hex::encode(json)
}

/// Decodes a scanned string back into a payload.
///
/// Leading and trailing whitespace is tolerated since scanner input often
/// arrives with it.
pub fn decode(raw: &str) -> Result<QrPayload, QrDecodeError> {
    let bytes = hex::decode(raw.trim()).map_err(|_| QrDecodeError::Hex)?;
    serde_json::from_slice(&bytes).map_err(|_| QrDecodeError::Document)
}
