//! Check-in vocabulary: the typed attempt and the admission error taxonomy.

use chrono::{DateTime, Utc};
use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

/// One check-in request, typed per channel.
///
/// The capture timestamp only exists on the offline-replay variant, so a
/// live attempt carrying a stale timestamp (or a replay missing one) is
/// unrepresentable.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckinAttempt {
    /// Live QR scan submitted while connected.
    Qr { session_id: i64, qr_token: String },
    /// QR scan captured offline, replayed later with its original scan time.
    QrOfflineSync {
        session_id: i64,
        qr_token: String,
        captured_at: DateTime<Utc>,
    },
    /// Manual six-digit PIN entry; resolves against active sessions only.
    Pin { code: String },
}

/// Admission outcomes that are not a recorded check-in.
///
/// `NotFound`, `Expired`, `Duplicate` and `Forbidden` are expected,
/// user-facing and terminal for the attempt that produced them. `Db` covers
/// infrastructure failures and is the only retryable class.
#[derive(Debug, Error)]
pub enum CheckinError {
    #[error("attendance session not found")]
    NotFound,
    #[error("attendance session is no longer accepting check-ins")]
    Expired,
    #[error("attendance already recorded for this session")]
    Duplicate,
    #[error("user may not check into this session")]
    Forbidden,
    #[error("invalid check-in request: {0}")]
    Validation(String),
    #[error(transparent)]
    Db(#[from] DbErr),
}

impl CheckinError {
    /// Classifies a failed record insert.
    ///
    /// A unique-key violation on the records table means a concurrent or
    /// earlier attempt for the same (session, student) already won; anything
    /// else is an infrastructure error.
    pub fn from_insert_error(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => CheckinError::Duplicate,
            _ => CheckinError::Db(err),
        }
    }
}
