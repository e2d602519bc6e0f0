//! Accounts, bearer tokens and the middleware that guards protected routes.

pub mod middleware;
pub mod password;
pub mod service;
pub mod token;

pub use middleware::require_auth;
pub use token::{Claims, Identity};
