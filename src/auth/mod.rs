//! Authentication
//!
//! JWT bearer validation. Tokens are issued by the external auth service;
//! this server only validates them (HS256 shared secret) and resolves the
//! trusted owner identity for each request.

mod extractor;
pub mod jwt;
pub mod middleware;

pub use jwt::{Claims, CurrentUser, JwtConfig, JwtError, JwtService};
pub use middleware::require_auth;
