//! Attendance session routes, nested under `/modules/{module_id}/attendance`.
//!
//! Session management (create, end, QR payload, attendee view) is limited to
//! the module's lecturer or assistant lecturer; the active-session lookup is
//! open to anyone assigned to the module so student clients can discover the
//! current session.

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post, put},
};
use util::state::AppState;

mod common;
mod get;
mod post;
mod put;

pub use get::{get_active_session, get_session, get_session_qr, list_attendees, list_sessions};
pub use post::create_session;
pub use put::end_session;

use crate::auth::guards::{allow_assigned_to_module, allow_assistant_lecturer};

pub fn attendance_routes(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/sessions",
            get(list_sessions).route_layer(from_fn_with_state(
                app_state.clone(),
                allow_assistant_lecturer,
            )),
        )
        .route(
            "/sessions",
            post(create_session).route_layer(from_fn_with_state(
                app_state.clone(),
                allow_assistant_lecturer,
            )),
        )
        .route(
            "/sessions/{session_id}",
            get(get_session).route_layer(from_fn_with_state(
                app_state.clone(),
                allow_assistant_lecturer,
            )),
        )
        .route(
            "/sessions/{session_id}/end",
            put(end_session).route_layer(from_fn_with_state(
                app_state.clone(),
                allow_assistant_lecturer,
            )),
        )
        .route(
            "/sessions/{session_id}/qr",
            get(get_session_qr).route_layer(from_fn_with_state(
                app_state.clone(),
                allow_assistant_lecturer,
            )),
        )
        .route(
            "/sessions/{session_id}/attendees",
            get(list_attendees).route_layer(from_fn_with_state(
                app_state.clone(),
                allow_assistant_lecturer,
            )),
        )
        .route(
            "/active",
            get(get_active_session).route_layer(from_fn_with_state(
                app_state.clone(),
                allow_assigned_to_module,
            )),
        )
        .with_state(app_state)
}
