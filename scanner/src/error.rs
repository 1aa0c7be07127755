//! Error taxonomy for the scanner kit.
//!
//! [`ReplayError`] is the device-side rendering of the server's check-in
//! verdicts; [`QueueError`] covers the durable queue file; [`CaptureError`]
//! is what one capture call can fail with.

use thiserror::Error;

/// The fate of one submitted check-in attempt, live or replayed.
///
/// `Transport` is the only retryable class: the attempt never reached a
/// verdict. Every other variant is the server's final word for that intent.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReplayError {
    /// The session no longer resolves: unknown token, or a PIN whose session
    /// has ended.
    #[error("attendance session no longer resolves")]
    SessionGone,
    /// The check-in window has closed.
    #[error("attendance session is no longer open for check-in")]
    Expired,
    /// The server already holds a record for this student and session.
    #[error("attendance already recorded")]
    Duplicate,
    /// Refused for another reason (wrong role, malformed request).
    #[error("check-in rejected: {0}")]
    Rejected(String),
    /// The attempt died in transit; worth retrying later.
    #[error("transport failure: {0}")]
    Transport(String),
}

/// Failures of the queue file itself.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue storage failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("queue state does not serialize: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Failures of one capture or PIN entry handed to the kit.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The scanned string is not an attendance QR payload.
    #[error("unreadable QR payload: {0}")]
    Payload(#[from] util::qr::QrDecodeError),
    /// A terminal check-in verdict, from the server or from the payload's
    /// own expiry snapshot.
    #[error(transparent)]
    Replay(ReplayError),
    #[error(transparent)]
    Queue(#[from] QueueError),
}
