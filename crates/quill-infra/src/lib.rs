//! # Quill Infrastructure
//!
//! Concrete implementations of the ports defined in `quill-core`:
//! repositories, auth, rate limiting, file storage and seeding.
//!
//! ## Feature Flags
//!
//! - `postgres` (default) - PostgreSQL repositories via SeaORM
//! - `redis` - Redis-backed token revocation and rate limiting
//!
//! Every port also has an in-memory implementation that needs no services.

pub mod auth;
pub mod database;
pub mod rate_limit;
pub mod seed;
pub mod storage;

#[cfg(feature = "redis")]
mod redis_conn;

pub use auth::{
    Argon2PasswordService, InMemoryRevocationList, JwtConfig, JwtTokenService, PasswordConfig,
};
pub use database::InMemoryRepositories;
pub use rate_limit::{InMemoryRateLimiter, RateLimitConfig};
pub use storage::{InMemoryStorage, LocalDiskStorage};

#[cfg(feature = "postgres")]
pub use database::{DatabaseConfig, PostgresRepositories};

#[cfg(feature = "redis")]
pub use auth::RedisRevocationList;
#[cfg(feature = "redis")]
pub use rate_limit::RedisRateLimiter;
#[cfg(feature = "redis")]
pub use redis_conn::RedisConfig;
