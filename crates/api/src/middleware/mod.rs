//! HTTP middleware and extractors.
//!
//! # Layer Order (bottom to top in Router)
//!
//! 1. Sentry layers (hub per request, HTTP context)
//! 2. `TraceLayer` (request tracing)
//! 3. `CorsLayer` (any origin, method and header)
//!
//! Authorization is enforced per handler by the extractors in [`auth`].

pub mod auth;

pub use auth::{AuthRejection, RequireAdmin, RequireAuth};
