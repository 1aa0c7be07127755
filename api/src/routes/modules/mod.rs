//! # Modules Routes Module
//!
//! Defines and wires up routes for the `/api/modules` endpoint group.
//!
//! Modules themselves are managed out of band; this group exists to scope
//! attendance sessions to the module identified in the path.
//!
//! ## Structure
//! - `attendance/` — nested attendance session routes under
//!   `/modules/{module_id}/attendance`

use axum::Router;
use util::state::AppState;

use attendance::attendance_routes;

pub mod attendance;

/// Builds and returns the `/modules` route group.
///
/// - Nested attendance routes under `/modules/{module_id}/attendance`
pub fn modules_routes(app_state: AppState) -> Router<AppState> {
    Router::new().nest("/{module_id}/attendance", attendance_routes(app_state))
}
