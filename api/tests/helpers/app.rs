use std::sync::Once;

use api::routes::routes;
use axum::Router;
use util::state::AppState;

static ENV_INIT: Once = Once::new();

/// Sets the JWT environment once for the whole test binary. Tests must not
/// override these afterwards; `generate_jwt` and the extractor read them on
/// every call.
pub fn ensure_test_env() {
    ENV_INIT.call_once(|| {
        unsafe {
            std::env::set_var("JWT_SECRET", "test-secret-not-for-production");
            std::env::set_var("JWT_DURATION_MINUTES", "60");
        }
    });
}

/// Builds the full `/api` router over a fresh in-memory database.
///
/// The request-logging layer is left off so tests can drive the router with
/// plain `oneshot` requests and no `ConnectInfo`.
pub async fn make_test_app() -> (Router, AppState) {
    ensure_test_env();
    let db = db::test_utils::setup_test_db().await;
    let app_state = AppState::new(db);
    let app = Router::new().nest("/api", routes(app_state.clone()));
    (app, app_state)
}
