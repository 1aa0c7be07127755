use crate::auth::claims::AuthUser;
use crate::response::ApiResponse;
use axum::{
    Json,
    body::Body,
    extract::{FromRequestParts, Path, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use db::models::user_module_role::{self, Role};
use sea_orm::DatabaseConnection;
use std::collections::HashMap;
use util::state::AppState;

#[derive(serde::Serialize, Default)]
pub struct Empty;

/// Authenticates the request and stashes the verified claims in the request
/// extensions for downstream handlers.
async fn extract_and_insert_authuser(
    req: Request<Body>,
) -> Result<(Request<Body>, AuthUser), (StatusCode, Json<ApiResponse<Empty>>)> {
    let (mut parts, body) = req.into_parts();
    let Ok(user) = AuthUser::from_request_parts(&mut parts, &()).await else {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(ApiResponse::error("Authentication required")),
        ));
    };
    let mut req = Request::from_parts(parts, body);
    req.extensions_mut().insert(user.clone());
    Ok((req, user))
}

/// Whether the user's role in the module is one of `allowed`.
///
/// A user holds at most one role per module, so this is a single keyed
/// lookup. Lookup failures deny.
async fn holds_module_role(
    db: &DatabaseConnection,
    user_id: i64,
    module_id: i64,
    allowed: &[Role],
) -> bool {
    match user_module_role::Model::find_role(db, user_id, module_id).await {
        Ok(Some(role)) => allowed.contains(&role),
        Ok(None) => false,
        Err(e) => {
            tracing::warn!(
                error = %e,
                user_id,
                module_id,
                "role lookup failed; denying access"
            );
            false
        }
    }
}

/// Basic guard to ensure the request is authenticated.
pub async fn allow_authenticated(
    req: Request<Body>,
    next: Next,
) -> Result<Response, (StatusCode, Json<ApiResponse<Empty>>)> {
    let (req, _user) = extract_and_insert_authuser(req).await?;

    Ok(next.run(req).await)
}

/// Base role-based access guard that the named guards build upon.
///
/// Admins pass every module-level gate; everyone else must hold one of
/// `required_roles` in the module named by the path.
async fn allow_role_base(
    State(app_state): State<AppState>,
    Path(params): Path<HashMap<String, String>>,
    req: Request<Body>,
    next: Next,
    required_roles: &[Role],
    failure_msg: &str,
) -> Result<Response, (StatusCode, Json<ApiResponse<Empty>>)> {
    let db: &DatabaseConnection = app_state.db();

    let (req, user) = extract_and_insert_authuser(req).await?;

    let module_id = params
        .get("module_id")
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or((
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("Missing or invalid module_id")),
        ))?;

    if user.0.admin {
        return Ok(next.run(req).await);
    }

    if holds_module_role(db, user.0.sub, module_id, required_roles).await {
        Ok(next.run(req).await)
    } else {
        Err((StatusCode::FORBIDDEN, Json(ApiResponse::error(failure_msg))))
    }
}

/// Roles "higher or equal" in privilege to the given role.
///
/// Hierarchy (high to low): Lecturer > AssistantLecturer > Tutor > Student.
/// Allowing a role implicitly allows all roles above it.
fn roles_higher_or_equal(role: Role) -> &'static [Role] {
    match role {
        Role::Lecturer => &[Role::Lecturer],
        Role::AssistantLecturer => &[Role::Lecturer, Role::AssistantLecturer],
        Role::Tutor => &[Role::Lecturer, Role::AssistantLecturer, Role::Tutor],
        Role::Student => &[
            Role::Lecturer,
            Role::AssistantLecturer,
            Role::Tutor,
            Role::Student,
        ],
    }
}

/// Guard for session management: assistant lecturer and higher.
pub async fn allow_assistant_lecturer(
    State(app_state): State<AppState>,
    Path(params): Path<HashMap<String, String>>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, (StatusCode, Json<ApiResponse<Empty>>)> {
    allow_role_base(
        State(app_state),
        Path(params),
        req,
        next,
        roles_higher_or_equal(Role::AssistantLecturer),
        "Lecturer or assistant lecturer access required for this module",
    )
    .await
}

/// Guard for member-facing reads: any role assigned to the module.
pub async fn allow_assigned_to_module(
    State(app_state): State<AppState>,
    Path(params): Path<HashMap<String, String>>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, (StatusCode, Json<ApiResponse<Empty>>)> {
    allow_role_base(
        State(app_state),
        Path(params),
        req,
        next,
        roles_higher_or_equal(Role::Student),
        "User not assigned to this module",
    )
    .await
}
