//! Credentials and sessions: argon2 password hashes, HS256 bearer tokens and
//! the `AuthUser` extractor that guards every resume route.

pub mod extractor;
pub mod handlers;
pub mod jwt;
pub mod password;
pub mod validation;

pub use extractor::AuthUser;
pub use jwt::JwtService;
pub use password::{Argon2Hasher, PasswordHasher};
