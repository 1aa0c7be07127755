//! HTTP API for the attendance service.
//!
//! The crate is split into:
//! - `auth`: JWT claims, extractor, role guards, and request logging.
//! - `response`: the standard `ApiResponse` envelope all handlers return.
//! - `routes`: the `/api` route tree and its handlers.

pub mod auth;
pub mod response;
pub mod routes;
