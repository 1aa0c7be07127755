//! # Check-in Routes Module
//!
//! Defines and wires up routes for the `/attendance` endpoint group: the
//! student-facing QR and PIN check-in channels.
//!
//! ## Structure
//! - `common.rs` — request/response DTOs shared by both channels
//! - `post.rs` — POST handlers (QR check-in, PIN check-in)

pub mod common;
pub mod post;

use axum::{Router, routing::post};
use util::state::AppState;

use post::{check_in_pin, check_in_qr};

/// Builds the `/attendance` route group.
///
/// - `POST /attendance/check-in/qr` → `check_in_qr`
/// - `POST /attendance/check-in/pin` → `check_in_pin`
pub fn checkin_routes() -> Router<AppState> {
    Router::new()
        .route("/check-in/qr", post(check_in_qr))
        .route("/check-in/pin", post(check_in_pin))
}
