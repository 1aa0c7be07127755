use serde::{Deserialize, Serialize};

/// JWT claim set carried by every authenticated request.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Authenticated user id.
    pub sub: i64,
    /// Expiry as a Unix timestamp; the decoder rejects tokens past it.
    pub exp: usize,
    /// Admins bypass the module-role gates on staff endpoints.
    pub admin: bool,
}

/// A request whose bearer token verified, with its decoded claims.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);
