//! Persistence layer.
//!
//! Handlers only see the repository traits; [`Database`] bundles one
//! implementation of each.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use crate::error::Result;
use crate::user::{BirthYearRange, PasswordResetToken, User};

pub const DEFAULT_CREDENTIALS: &str = "postgres";
pub const DEFAULT_DATABASE_NAME: &str = "accounts";
pub const DEFAULT_POOL_SIZE: u32 = 10;

/// Storage of [`User`].
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user, returning it with its `id`.
    async fn insert(&self, user: &User) -> Result<User>;

    /// Save every column of an existing user.
    async fn update(&self, user: &User) -> Result<()>;

    /// Delete user, with its tokens and sessions.
    async fn delete(&self, user_id: i64) -> Result<()>;

    async fn find_by_id(&self, user_id: i64) -> Result<Option<User>>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Most recently joined user owning `email`.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn username_exists(&self, username: &str) -> Result<bool>;

    /// Active users, most recently joined first.
    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<User>>;
}

/// Storage of [`PasswordResetToken`].
#[async_trait]
pub trait ResetTokenRepository: Send + Sync {
    /// Insert a new token, returning it with its `id`.
    async fn insert(
        &self,
        token: &PasswordResetToken,
    ) -> Result<PasswordResetToken>;

    /// Latest token issued to user.
    async fn find_latest_for_user(
        &self,
        user_id: i64,
    ) -> Result<Option<PasswordResetToken>>;

    async fn find_by_token(
        &self,
        token: Uuid,
    ) -> Result<Option<PasswordResetToken>>;

    async fn mark_verified(&self, id: i64) -> Result<()>;

    async fn delete(&self, id: i64) -> Result<()>;
}

/// Storage of opaque session tokens.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn insert(&self, token: &str, user_id: i64) -> Result<()>;

    async fn find_user_id(&self, token: &str) -> Result<Option<i64>>;

    async fn revoke(&self, token: &str) -> Result<()>;

    async fn revoke_all_for_user(&self, user_id: i64) -> Result<()>;
}

/// Custom db structure to pass to Axum.
#[derive(Clone)]
pub struct Database {
    pub users: Arc<dyn UserRepository>,
    pub reset_tokens: Arc<dyn ResetTokenRepository>,
    pub sessions: Arc<dyn SessionRepository>,
}

impl Database {
    /// Open a PostgreSQL pool.
    pub async fn connect(
        hostname: &str,
        username: &str,
        password: &str,
        db: &str,
        pool: u32,
    ) -> std::result::Result<PgPool, sqlx::Error> {
        let addr = format!("postgres://{username}:{password}@{hostname}/{db}");
        let pool = PgPoolOptions::new().max_connections(pool);
        let postgres = pool.connect(&addr).await?;

        tracing::info!(%hostname, %db, "postgres connected");

        Ok(postgres)
    }

    /// Use PostgreSQL for every repository.
    pub fn postgres(pool: PgPool) -> Self {
        let store = Arc::new(PostgresStore::new(pool));

        Self {
            users: store.clone(),
            reset_tokens: store.clone(),
            sessions: store,
        }
    }

    /// Use a process-local store, lost on restart.
    pub fn memory(birth_year: BirthYearRange) -> Self {
        let store = Arc::new(MemoryStore::new(birth_year));

        Self {
            users: store.clone(),
            reset_tokens: store.clone(),
            sessions: store,
        }
    }
}
