use crate::auth::claims::AuthUser;
use axum::{
    body::Body,
    extract::{ConnectInfo, FromRequestParts},
    http::{Method, Request, StatusCode, header},
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;

/// Request log line for every call that reaches the API.
///
/// Records method, path, caller IP, the authenticated user id when a valid
/// bearer token is present (`0` otherwise), and the identifying headers
/// browsers and scanner builds send. CORS preflights pass through unlogged.
pub async fn log_request(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    if req.method() == Method::OPTIONS {
        return Ok(next.run(req).await);
    }

    let (mut parts, body) = req.into_parts();

    let user = match AuthUser::from_request_parts(&mut parts, &()).await {
        Ok(AuthUser(claims)) => claims.sub,
        Err(_) => 0,
    };
    let header_str = |name: header::HeaderName| {
        parts
            .headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("unknown")
            .to_owned()
    };

    tracing::info!(
        method = %parts.method,
        path = %parts.uri.path(),
        ip = %addr.ip(),
        user,
        origin = %header_str(header::ORIGIN),
        user_agent = %header_str(header::USER_AGENT),
        "Incoming request"
    );

    Ok(next.run(Request::from_parts(parts, body)).await)
}
