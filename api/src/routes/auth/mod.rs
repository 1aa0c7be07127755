//! # auth Routes Module
//!
//! Defines and wires up routes for the `/auth` endpoint group.
//!
//! ## Structure
//! - `post.rs` — POST handlers (login)
//!
//! ## Usage
//! The `auth_routes()` function returns a `Router` which is nested under
//! `/auth` in the main application.

pub mod post;

use axum::{Router, routing::post};
use util::state::AppState;

use post::login;

/// Builds the `/auth` route group, mapping HTTP methods to handlers.
///
/// - `POST /auth/login` → `login`
pub fn auth_routes() -> Router<AppState> {
    Router::new().route("/login", post(login))
}
