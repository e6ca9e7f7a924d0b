//! # Quill Infrastructure
//!
//! Concrete implementations of the ports defined in `quill-core`: the
//! relational store, the in-memory store, cache backends, authentication and
//! media handling.
//!
//! ## Feature Flags
//!
//! - `full` (default) - All features enabled
//! - `minimal` - No external services, in-memory store and cache only
//! - `postgres` - PostgreSQL repositories and migrations via SeaORM
//! - `auth` - JWT + Argon2 authentication
//! - `redis` - Redis cache backend

pub mod cache;
pub mod database;
pub mod media;

#[cfg(feature = "auth")]
pub mod auth;

// Re-exports - In-Memory
pub use cache::InMemoryCache;
pub use database::InMemoryStore;
pub use media::{ImagesizeProbe, LocalMediaStorage};

#[cfg(feature = "postgres")]
pub use database::{DatabaseConfig, DatabaseConnections, Migrator, postgres_repositories};

#[cfg(feature = "auth")]
pub use auth::{Argon2PasswordService, JwtConfig, JwtTokenService};

// Re-exports - Redis
#[cfg(feature = "redis")]
pub use cache::{RedisCache, RedisConfig};
