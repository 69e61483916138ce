//! Authentication implementations.

mod jwt;
mod password;
mod revocation;

pub use jwt::{DEFAULT_SECRET, JwtConfig, JwtTokenService};
pub use password::{Argon2PasswordService, PasswordConfig};
pub use revocation::InMemoryRevocationList;

#[cfg(feature = "redis")]
pub use revocation::RedisRevocationList;
