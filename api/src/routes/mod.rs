//! HTTP route entry point for `/api/...`.
//!
//! This module defines all HTTP entry points under the `/api` namespace.
//! Routes are organized by domain, each protected via appropriate access
//! control middleware.
//!
//! Route groups include:
//! - `/health` → Health check endpoint (public)
//! - `/auth` → Authentication endpoints (login, public)
//! - `/modules` → Per-module attendance session management (authenticated users)
//! - `/attendance` → Student check-in endpoints (authenticated users)

use crate::auth::guards::allow_authenticated;
use crate::routes::{
    auth::auth_routes, checkin::checkin_routes, health::health_routes, modules::modules_routes,
};
use axum::{Router, middleware::from_fn};
use util::state::AppState;

pub mod auth;
pub mod checkin;
pub mod health;
pub mod modules;

/// Builds the complete application router for all HTTP endpoints.
///
/// # Route Structure:
/// - `/health` → Health check endpoint (no authentication required).
/// - `/auth` → Login and token issuance.
/// - `/modules` → Attendance session management, nested per module
///   (requires authentication; per-route role guards inside).
/// - `/attendance` → Check-in endpoints for students (requires
///   authentication; enrollment is enforced by the admission logic).
///
/// State is applied here so `main` and the integration tests can mount the
/// returned router directly with `Router::new().nest("/api", routes(state))`.
pub fn routes(app_state: AppState) -> Router {
    Router::new()
        .nest("/health", health_routes())
        .nest("/auth", auth_routes())
        .nest(
            "/modules",
            modules_routes(app_state.clone()).route_layer(from_fn(allow_authenticated)),
        )
        .nest(
            "/attendance",
            checkin_routes().route_layer(from_fn(allow_authenticated)),
        )
        .with_state(app_state)
}
