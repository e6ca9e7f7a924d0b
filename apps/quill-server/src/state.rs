//! Application state - shared across all handlers.

use std::io;
use std::sync::Arc;

use quill_core::ports::{Cache, ImageProbe, MediaStorage, PasswordService, TokenService};
use quill_core::services::{
    AccountService, CommentService, FeedService, FollowService, GroupService, PostService,
    Repositories,
};
use quill_infra::{
    Argon2PasswordService, ImagesizeProbe, InMemoryCache, InMemoryStore, JwtTokenService,
    LocalMediaStorage,
};

#[cfg(feature = "postgres")]
use quill_infra::{DatabaseConnections, postgres_repositories};
#[cfg(feature = "redis")]
use quill_infra::RedisCache;

use crate::config::AppConfig;
use crate::page_cache::PageCache;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub feed: FeedService,
    pub posts: PostService,
    pub comments: CommentService,
    pub follows: FollowService,
    pub accounts: AccountService,
    pub groups: GroupService,
    pub page_cache: PageCache,
    pub tokens: Arc<dyn TokenService>,
}

impl AppState {
    /// Build the application state with the backends the configuration asks
    /// for, falling back to in-memory ones where allowed.
    pub async fn new(config: &AppConfig) -> io::Result<Self> {
        let repos = repositories(config).await;
        let cache = cache(config).await?;

        let state = Self::build(repos, cache, config)?;
        tracing::info!("Application state initialized");
        Ok(state)
    }

    /// State over the in-memory store and cache. Used by tests and `minimal`
    /// builds.
    pub fn in_memory(config: &AppConfig) -> io::Result<Self> {
        Self::build(in_memory_repositories(), Arc::new(InMemoryCache::new()), config)
    }

    pub fn build(
        repos: Repositories,
        cache: Arc<dyn Cache>,
        config: &AppConfig,
    ) -> io::Result<Self> {
        let media: Arc<dyn MediaStorage> = Arc::new(LocalMediaStorage::new(&config.media_root)?);
        let probe: Arc<dyn ImageProbe> = Arc::new(ImagesizeProbe);
        let passwords: Arc<dyn PasswordService> = Arc::new(Argon2PasswordService::new());
        let tokens: Arc<dyn TokenService> = Arc::new(JwtTokenService::new(config.jwt.clone()));

        Ok(Self {
            feed: FeedService::new(repos.clone()),
            posts: PostService::new(repos.clone(), media, probe),
            comments: CommentService::new(repos.clone()),
            follows: FollowService::new(repos.clone()),
            accounts: AccountService::new(repos.clone(), passwords),
            groups: GroupService::new(repos),
            page_cache: PageCache::new(cache, config.index_cache_ttl),
            tokens,
        })
    }
}

fn in_memory_repositories() -> Repositories {
    Repositories::from_store(Arc::new(InMemoryStore::new()))
}

#[cfg(feature = "postgres")]
async fn repositories(config: &AppConfig) -> Repositories {
    let Some(db_config) = &config.database else {
        tracing::warn!("DATABASE_URL not set. Running without database (in-memory mode).");
        return in_memory_repositories();
    };

    match DatabaseConnections::init(db_config).await {
        Ok(connections) => postgres_repositories(connections.main),
        Err(e) => {
            tracing::error!(
                "Failed to connect to database: {}. Using in-memory fallback.",
                e
            );
            in_memory_repositories()
        }
    }
}

#[cfg(not(feature = "postgres"))]
async fn repositories(_config: &AppConfig) -> Repositories {
    tracing::info!("Running without postgres feature - using in-memory repository");
    in_memory_repositories()
}

#[cfg(feature = "redis")]
async fn cache(config: &AppConfig) -> io::Result<Arc<dyn Cache>> {
    let Some(redis_config) = &config.redis else {
        tracing::info!("REDIS_URL not set. Using in-memory page cache.");
        return Ok(Arc::new(InMemoryCache::new()));
    };

    match RedisCache::connect(redis_config).await {
        Ok(cache) => Ok(Arc::new(cache)),
        Err(e) if redis_config.fallback_to_memory => {
            tracing::warn!("Failed to connect to Redis: {}. Using in-memory cache.", e);
            Ok(Arc::new(InMemoryCache::new()))
        }
        Err(e) => Err(io::Error::other(e)),
    }
}

#[cfg(not(feature = "redis"))]
async fn cache(_config: &AppConfig) -> io::Result<Arc<dyn Cache>> {
    Ok(Arc::new(InMemoryCache::new()))
}
