//! Application configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use quill_infra::JwtConfig;
use quill_infra::auth::DEFAULT_SECRET;
#[cfg(feature = "postgres")]
use quill_infra::database::DatabaseConfig;
#[cfg(feature = "redis")]
use quill_infra::cache::RedisConfig;

use crate::telemetry::TelemetryConfig;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// `None` runs on the in-memory store.
    #[cfg(feature = "postgres")]
    pub database: Option<DatabaseConfig>,
    /// `None` runs on the in-memory cache.
    #[cfg(feature = "redis")]
    pub redis: Option<RedisConfig>,
    pub jwt: JwtConfig,
    /// Directory uploaded images are written under.
    pub media_root: PathBuf,
    /// Lifetime of a cached home-feed page.
    pub index_cache_ttl: Duration,
    pub telemetry: TelemetryConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            #[cfg(feature = "postgres")]
            database: None,
            #[cfg(feature = "redis")]
            redis: None,
            jwt: JwtConfig::default(),
            media_root: PathBuf::from("media"),
            index_cache_ttl: Duration::from_secs(20),
            telemetry: TelemetryConfig::default(),
        }
    }
}

fn parsed<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(default)
}

#[cfg(any(feature = "postgres", feature = "redis"))]
fn flag(key: &str, default: bool) -> bool {
    env::var(key)
        .map(|v| v == "true" || v == "1")
        .unwrap_or(default)
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        #[cfg(feature = "postgres")]
        let database = env::var("DATABASE_URL").ok().map(|url| DatabaseConfig {
            url,
            max_connections: parsed("DB_MAX_CONNECTIONS", 100),
            min_connections: parsed("DB_MIN_CONNECTIONS", 10),
            run_migrations: flag("RUN_MIGRATIONS", false),
        });

        #[cfg(feature = "redis")]
        let redis = env::var("REDIS_URL").ok().map(|url| RedisConfig {
            url,
            connect_timeout: Duration::from_secs(parsed("REDIS_CONNECT_TIMEOUT_SECS", 5)),
            fallback_to_memory: flag("REDIS_FALLBACK_TO_MEMORY", true),
        });

        Self {
            host: env::var("HOST").unwrap_or(defaults.host),
            port: parsed("PORT", defaults.port),
            #[cfg(feature = "postgres")]
            database,
            #[cfg(feature = "redis")]
            redis,
            jwt: JwtConfig {
                secret: env::var("JWT_SECRET").unwrap_or_else(|_| DEFAULT_SECRET.to_string()),
                expiration_hours: parsed("JWT_EXPIRATION_HOURS", defaults.jwt.expiration_hours),
                issuer: env::var("JWT_ISSUER").unwrap_or(defaults.jwt.issuer),
            },
            media_root: env::var("MEDIA_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.media_root),
            index_cache_ttl: Duration::from_secs(parsed(
                "INDEX_CACHE_TTL_SECS",
                defaults.index_cache_ttl.as_secs(),
            )),
            telemetry: TelemetryConfig::from_env(),
        }
    }
}
