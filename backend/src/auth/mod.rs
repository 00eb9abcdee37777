//! Authentication module
//!
//! End users authenticate with JWT access tokens issued by the identity
//! service. Internal activity modules authenticate with a shared service token.

mod jwt;
mod middleware;
mod service;

pub use jwt::{Claims, JwtService};
pub use middleware::AuthUser;
pub use service::{ServiceCaller, SERVICE_TOKEN_HEADER};
