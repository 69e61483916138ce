//! Application state - shared across all handlers.

use std::sync::Arc;

use quill_core::ports::{
    AuthError, CategoryRepository, CommentRepository, FileStorage, PasswordService,
    PostRepository, RateLimitError, RateLimiter, RevocationList, TagRepository, TokenService,
    UserRepository,
};
use quill_infra::{
    Argon2PasswordService, InMemoryRateLimiter, InMemoryRepositories, InMemoryRevocationList,
    JwtTokenService, LocalDiskStorage,
};

use crate::config::AppConfig;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("rate limiter: {0}")]
    RateLimiter(#[from] RateLimitError),

    #[error("password hashing: {0}")]
    Passwords(#[from] AuthError),
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub categories: Arc<dyn CategoryRepository>,
    pub tags: Arc<dyn TagRepository>,
    pub comments: Arc<dyn CommentRepository>,
    pub storage: Arc<dyn FileStorage>,
    pub tokens: Arc<dyn TokenService>,
    pub passwords: Arc<dyn PasswordService>,
    pub revocations: Arc<dyn RevocationList>,
    pub limiter: Arc<dyn RateLimiter>,
}

struct Repositories {
    users: Arc<dyn UserRepository>,
    posts: Arc<dyn PostRepository>,
    categories: Arc<dyn CategoryRepository>,
    tags: Arc<dyn TagRepository>,
    comments: Arc<dyn CommentRepository>,
}

impl From<InMemoryRepositories> for Repositories {
    fn from(repos: InMemoryRepositories) -> Self {
        Self {
            users: Arc::new(repos.users),
            posts: Arc::new(repos.posts),
            categories: Arc::new(repos.categories),
            tags: Arc::new(repos.tags),
            comments: Arc::new(repos.comments),
        }
    }
}

#[cfg(feature = "postgres")]
impl From<quill_infra::PostgresRepositories> for Repositories {
    fn from(repos: quill_infra::PostgresRepositories) -> Self {
        Self {
            users: Arc::new(repos.users),
            posts: Arc::new(repos.posts),
            categories: Arc::new(repos.categories),
            tags: Arc::new(repos.tags),
            comments: Arc::new(repos.comments),
        }
    }
}

impl AppState {
    /// Build the application state with appropriate implementations.
    pub async fn new(config: &AppConfig) -> Result<Self, StartupError> {
        let repos = repositories(config).await;
        let (revocations, limiter) = shared_stores(config).await?;

        let storage = LocalDiskStorage::new(&config.storage_path, &config.app_url);
        tracing::info!(root = %storage.root().display(), "Public disk ready");

        tracing::info!("Application state initialized");

        Ok(Self {
            users: repos.users,
            posts: repos.posts,
            categories: repos.categories,
            tags: repos.tags,
            comments: repos.comments,
            storage: Arc::new(storage),
            tokens: Arc::new(JwtTokenService::new(config.jwt.clone())),
            passwords: Arc::new(Argon2PasswordService::new(config.password)?),
            revocations,
            limiter,
        })
    }

    /// Everything in memory; nothing outlives the process.
    #[cfg(test)]
    pub fn in_memory(
        jwt: quill_infra::JwtConfig,
        password: quill_infra::PasswordConfig,
        limits: quill_infra::RateLimitConfig,
    ) -> Result<Self, StartupError> {
        let repos = Repositories::from(InMemoryRepositories::new());

        Ok(Self {
            users: repos.users,
            posts: repos.posts,
            categories: repos.categories,
            tags: repos.tags,
            comments: repos.comments,
            storage: Arc::new(quill_infra::InMemoryStorage::new("http://localhost")),
            tokens: Arc::new(JwtTokenService::new(jwt)),
            passwords: Arc::new(Argon2PasswordService::new(password)?),
            revocations: Arc::new(InMemoryRevocationList::new()),
            limiter: Arc::new(InMemoryRateLimiter::new(limits)?),
        })
    }
}

#[cfg(feature = "postgres")]
async fn repositories(config: &AppConfig) -> Repositories {
    use migration::{Migrator, MigratorTrait};
    use quill_infra::database::{self, DatabaseConfig};

    let Some(settings) = &config.database else {
        tracing::warn!("DATABASE_URL not set. Running without database (in-memory mode).");
        return InMemoryRepositories::new().into();
    };

    let db_config = DatabaseConfig {
        url: settings.url.clone(),
        max_connections: settings.max_connections,
        min_connections: settings.min_connections,
    };
    let conn = match database::connect(&db_config).await {
        Ok(conn) => conn,
        Err(e) => {
            tracing::error!(
                "Failed to connect to database: {}. Using in-memory fallback.",
                e
            );
            return InMemoryRepositories::new().into();
        }
    };

    if settings.run_migrations {
        match Migrator::up(&conn, None).await {
            Ok(()) => tracing::info!("Migrations applied"),
            Err(e) => tracing::error!(error = %e, "Migrations failed"),
        }
    }

    quill_infra::PostgresRepositories::new(conn).into()
}

#[cfg(not(feature = "postgres"))]
async fn repositories(_config: &AppConfig) -> Repositories {
    tracing::info!("Running without postgres feature - using in-memory repositories");
    InMemoryRepositories::new().into()
}

#[cfg(feature = "redis")]
async fn shared_stores(
    config: &AppConfig,
) -> Result<(Arc<dyn RevocationList>, Arc<dyn RateLimiter>), StartupError> {
    use quill_infra::{RedisConfig, RedisRateLimiter, RedisRevocationList};

    if let Some(url) = &config.redis_url {
        let redis = RedisConfig::new(url.clone());
        match (
            RedisRevocationList::connect(&redis).await,
            RedisRateLimiter::connect(&redis, config.rate_limit).await,
        ) {
            (Ok(revocations), Ok(limiter)) => return Ok((Arc::new(revocations), Arc::new(limiter))),
            (Err(e), _) => tracing::error!(error = %e, "Redis unavailable, using in-memory stores"),
            (_, Err(e)) => tracing::error!(error = %e, "Redis unavailable, using in-memory stores"),
        }
    }

    memory_stores(config)
}

#[cfg(not(feature = "redis"))]
async fn shared_stores(
    config: &AppConfig,
) -> Result<(Arc<dyn RevocationList>, Arc<dyn RateLimiter>), StartupError> {
    if config.redis_url.is_some() {
        tracing::warn!("REDIS_URL set but the redis feature is off; using in-memory stores");
    }
    memory_stores(config)
}

fn memory_stores(
    config: &AppConfig,
) -> Result<(Arc<dyn RevocationList>, Arc<dyn RateLimiter>), StartupError> {
    Ok((
        Arc::new(InMemoryRevocationList::new()),
        Arc::new(InMemoryRateLimiter::new(config.rate_limit)?),
    ))
}
