//! Authentication: accounts, JWT issuing and the bearer middleware

pub mod jwt;
pub mod middleware;
pub mod routes;
pub mod service;

pub use jwt::{JwtKeys, TokenType};
pub use middleware::auth_middleware;
pub use service::{AuthService, BillingTarget, BillingUpdate};
