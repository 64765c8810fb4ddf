//! Process-local storage, mirroring PostgreSQL constraints.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::database::{ResetTokenRepository, SessionRepository, UserRepository};
use crate::error::{Result, ServerError};
use crate::schema::{CHECK_BIRTH_YEAR_RANGE, USERNAME_UNIQUE};
use crate::user::{BirthYearRange, PasswordResetToken, User};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    reset_tokens: Vec<PasswordResetToken>,
    sessions: HashMap<String, i64>,
    user_sequence: i64,
    token_sequence: i64,
}

impl Tables {
    /// Enforce `check_birth_year_range` and `users_username_key`.
    fn check(&self, user: &User, birth_year: &BirthYearRange) -> Result<()> {
        if user.birth_year.is_some_and(|year| !birth_year.contains(year)) {
            return Err(ServerError::Constraint(CHECK_BIRTH_YEAR_RANGE.into()));
        }

        if self
            .users
            .iter()
            .any(|u| u.username == user.username && u.id != user.id)
        {
            return Err(ServerError::Constraint(USERNAME_UNIQUE.into()));
        }

        Ok(())
    }
}

/// Repositories kept in memory.
pub struct MemoryStore {
    birth_year: BirthYearRange,
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Create a new empty [`MemoryStore`].
    pub fn new(birth_year: BirthYearRange) -> Self {
        Self {
            birth_year,
            tables: RwLock::new(Tables::default()),
        }
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn insert(&self, user: &User) -> Result<User> {
        let mut tables = self.tables.write().await;

        let mut user = user.clone();
        user.id = 0;
        tables.check(&user, &self.birth_year)?;

        tables.user_sequence += 1;
        user.id = tables.user_sequence;
        tables.users.push(user.clone());

        Ok(user)
    }

    async fn update(&self, user: &User) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.check(user, &self.birth_year)?;

        if let Some(saved) = tables.users.iter_mut().find(|u| u.id == user.id) {
            *saved = user.clone();
        }

        Ok(())
    }

    async fn delete(&self, user_id: i64) -> Result<()> {
        let mut tables = self.tables.write().await;

        tables.users.retain(|u| u.id != user_id);
        tables.reset_tokens.retain(|t| t.user_id != user_id);
        tables.sessions.retain(|_, owner| *owner != user_id);

        Ok(())
    }

    async fn find_by_id(&self, user_id: i64) -> Result<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.id == user_id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.username == username).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        if email.is_empty() {
            return Ok(None);
        }

        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .filter(|u| u.email == email)
            .max_by_key(|u| (u.date_joined, u.id))
            .cloned())
    }

    async fn username_exists(&self, username: &str) -> Result<bool> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().any(|u| u.username == username))
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<User>> {
        let tables = self.tables.read().await;

        let mut users: Vec<User> = tables.users.iter().filter(|u| u.is_active).cloned().collect();
        users.sort_by(|a, b| (b.date_joined, b.id).cmp(&(a.date_joined, a.id)));

        Ok(users
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }
}

#[async_trait]
impl ResetTokenRepository for MemoryStore {
    async fn insert(
        &self,
        token: &PasswordResetToken,
    ) -> Result<PasswordResetToken> {
        let mut tables = self.tables.write().await;

        if !tables.users.iter().any(|u| u.id == token.user_id) {
            return Err(ServerError::Constraint(
                "password_reset_tokens_user_id_fkey".into(),
            ));
        }

        tables.token_sequence += 1;
        let mut token = token.clone();
        token.id = tables.token_sequence;
        tables.reset_tokens.push(token.clone());

        Ok(token)
    }

    async fn find_latest_for_user(
        &self,
        user_id: i64,
    ) -> Result<Option<PasswordResetToken>> {
        let tables = self.tables.read().await;
        Ok(tables
            .reset_tokens
            .iter()
            .filter(|t| t.user_id == user_id)
            .max_by_key(|t| (t.created_at, t.id))
            .cloned())
    }

    async fn find_by_token(
        &self,
        token: Uuid,
    ) -> Result<Option<PasswordResetToken>> {
        let tables = self.tables.read().await;
        Ok(tables.reset_tokens.iter().find(|t| t.token == token).cloned())
    }

    async fn mark_verified(&self, id: i64) -> Result<()> {
        let mut tables = self.tables.write().await;
        if let Some(token) = tables.reset_tokens.iter_mut().find(|t| t.id == id) {
            token.verified = true;
        }
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.reset_tokens.retain(|t| t.id != id);
        Ok(())
    }
}

#[async_trait]
impl SessionRepository for MemoryStore {
    async fn insert(&self, token: &str, user_id: i64) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.sessions.insert(token.to_owned(), user_id);
        Ok(())
    }

    async fn find_user_id(&self, token: &str) -> Result<Option<i64>> {
        let tables = self.tables.read().await;
        Ok(tables.sessions.get(token).copied())
    }

    async fn revoke(&self, token: &str) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.sessions.remove(token);
        Ok(())
    }

    async fn revoke_all_for_user(&self, user_id: i64) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.sessions.retain(|_, owner| *owner != user_id);
        Ok(())
    }
}
