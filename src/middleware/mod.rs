pub mod auth;
pub mod guards;

pub use auth::{init_jwt, verify_jwt, Claims};
pub use guards::AuthenticatedUser;
