//! Authentication module
//!
//! JWT sessions for patrons and staff terminals, argon2 PIN hashing, and
//! the axum middleware that guards the API surface.

pub mod jwt;
pub mod middleware;
pub mod pin;

pub use jwt::{Claims, CurrentUser, JwtConfig, JwtService};
pub use middleware::{require_auth, require_staff};
pub use pin::{hash_pin, verify_pin};
