//! Handle PostgreSQL requests.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::{ResetTokenRepository, SessionRepository, UserRepository};
use crate::error::{Result, ServerError};
use crate::schema::USERS_ORDERING;
use crate::user::{PasswordResetToken, User};

const USER_COLUMNS: &str = "id, username, first_name, last_name, middle_name, email, password, \
    avatar, birth_year, is_active, last_login, date_joined";
const TOKEN_COLUMNS: &str = "id, user_id, token, otp_secret, created_at, verified";

/// Repositories backed by PostgreSQL.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new [`PostgresStore`].
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Report violated unique or check constraints by name.
fn map_constraint(err: sqlx::Error) -> ServerError {
    let constraint = err
        .as_database_error()
        .filter(|e| e.is_check_violation() || e.is_unique_violation())
        .and_then(|e| e.constraint())
        .map(str::to_owned);

    match constraint {
        Some(name) => ServerError::Constraint(name),
        None => err.into(),
    }
}

#[async_trait]
impl UserRepository for PostgresStore {
    async fn insert(&self, user: &User) -> Result<User> {
        let query = format!(
            r#"INSERT INTO users (username, first_name, last_name, middle_name, email, password, avatar, birth_year, is_active, date_joined)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                RETURNING {USER_COLUMNS}"#
        );

        sqlx::query_as::<_, User>(&query)
            .bind(&user.username)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.middle_name)
            .bind(&user.email)
            .bind(&user.password)
            .bind(&user.avatar)
            .bind(user.birth_year)
            .bind(user.is_active)
            .bind(user.date_joined)
            .fetch_one(&self.pool)
            .await
            .map_err(map_constraint)
    }

    async fn update(&self, user: &User) -> Result<()> {
        sqlx::query(
            r#"UPDATE users
                SET username = $1, first_name = $2, last_name = $3, middle_name = $4, email = $5,
                    password = $6, avatar = $7, birth_year = $8, is_active = $9, last_login = $10
                WHERE id = $11"#,
        )
        .bind(&user.username)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.middle_name)
        .bind(&user.email)
        .bind(&user.password)
        .bind(&user.avatar)
        .bind(user.birth_year)
        .bind(user.is_active)
        .bind(user.last_login)
        .bind(user.id)
        .execute(&self.pool)
        .await
        .map_err(map_constraint)?;

        Ok(())
    }

    async fn delete(&self, user_id: i64) -> Result<()> {
        // Tokens and sessions are removed by `ON DELETE CASCADE`.
        sqlx::query(r#"DELETE FROM users WHERE id = $1"#)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn find_by_id(&self, user_id: i64) -> Result<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");

        Ok(sqlx::query_as::<_, User>(&query)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");

        Ok(sqlx::query_as::<_, User>(&query)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        if email.is_empty() {
            return Ok(None);
        }

        let query = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1 ORDER BY {USERS_ORDERING}, id DESC LIMIT 1"
        );

        Ok(sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn username_exists(&self, username: &str) -> Result<bool> {
        let (exists,): (bool,) =
            sqlx::query_as(r#"SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)"#)
                .bind(username)
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<User>> {
        let query = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE is_active ORDER BY {USERS_ORDERING}, id DESC LIMIT $1 OFFSET $2"
        );

        Ok(sqlx::query_as::<_, User>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?)
    }
}

#[async_trait]
impl ResetTokenRepository for PostgresStore {
    async fn insert(
        &self,
        token: &PasswordResetToken,
    ) -> Result<PasswordResetToken> {
        let query = format!(
            r#"INSERT INTO password_reset_tokens (user_id, token, otp_secret, created_at, verified)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING {TOKEN_COLUMNS}"#
        );

        Ok(sqlx::query_as::<_, PasswordResetToken>(&query)
            .bind(token.user_id)
            .bind(token.token)
            .bind(&token.otp_secret)
            .bind(token.created_at)
            .bind(token.verified)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn find_latest_for_user(
        &self,
        user_id: i64,
    ) -> Result<Option<PasswordResetToken>> {
        let query = format!(
            "SELECT {TOKEN_COLUMNS} FROM password_reset_tokens WHERE user_id = $1 ORDER BY created_at DESC, id DESC LIMIT 1"
        );

        Ok(sqlx::query_as::<_, PasswordResetToken>(&query)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_by_token(
        &self,
        token: Uuid,
    ) -> Result<Option<PasswordResetToken>> {
        let query = format!(
            "SELECT {TOKEN_COLUMNS} FROM password_reset_tokens WHERE token = $1"
        );

        Ok(sqlx::query_as::<_, PasswordResetToken>(&query)
            .bind(token)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn mark_verified(&self, id: i64) -> Result<()> {
        sqlx::query(r#"UPDATE password_reset_tokens SET verified = TRUE WHERE id = $1"#)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        sqlx::query(r#"DELETE FROM password_reset_tokens WHERE id = $1"#)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[async_trait]
impl SessionRepository for PostgresStore {
    async fn insert(&self, token: &str, user_id: i64) -> Result<()> {
        sqlx::query(r#"INSERT INTO sessions (token, user_id) VALUES ($1, $2)"#)
            .bind(token)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn find_user_id(&self, token: &str) -> Result<Option<i64>> {
        let record = sqlx::query_as::<_, (i64,)>(
            r#"SELECT user_id FROM sessions WHERE token = $1"#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(|(user_id,)| user_id))
    }

    async fn revoke(&self, token: &str) -> Result<()> {
        sqlx::query(r#"DELETE FROM sessions WHERE token = $1"#)
            .bind(token)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn revoke_all_for_user(&self, user_id: i64) -> Result<()> {
        sqlx::query(r#"DELETE FROM sessions WHERE user_id = $1"#)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{CHECK_BIRTH_YEAR_RANGE, TableSchema, USERNAME_UNIQUE};
    use crate::user::BirthYearRange;

    async fn store(pool: PgPool) -> PostgresStore {
        TableSchema::users(&BirthYearRange::new(1900, 2010))
            .apply(&pool)
            .await
            .unwrap();
        PostgresStore::new(pool)
    }

    fn user(username: &str) -> User {
        User {
            first_name: "Jane".into(),
            last_name: "Doe".into(),
            email: format!("{username}@example.com"),
            password: "$argon2id$v=19$m=1024,t=1,p=1$c2FsdA$aGFzaA".into(),
            ..User::new(username)
        }
    }

    #[sqlx::test]
    #[ignore = "requires a PostgreSQL instance (DATABASE_URL)"]
    async fn test_check_constraint(pool: PgPool) {
        let store = store(pool).await;

        let mut jane = user("jane");
        jane.birth_year = Some(2010);
        let err = UserRepository::insert(&store, &jane).await.unwrap_err();
        assert!(matches!(err, ServerError::Constraint(name) if name == CHECK_BIRTH_YEAR_RANGE));

        jane.birth_year = Some(1955);
        let saved = UserRepository::insert(&store, &jane).await.unwrap();
        assert!(saved.id > 0);

        let err = UserRepository::insert(&store, &jane).await.unwrap_err();
        assert!(matches!(err, ServerError::Constraint(name) if name == USERNAME_UNIQUE));
    }

    #[sqlx::test]
    #[ignore = "requires a PostgreSQL instance (DATABASE_URL)"]
    async fn test_delete_cascades(pool: PgPool) {
        let store = store(pool).await;
        let jane = UserRepository::insert(&store, &user("jane")).await.unwrap();

        let token = ResetTokenRepository::insert(
            &store,
            &PasswordResetToken::new(jane.id, "SECRET"),
        )
        .await
        .unwrap();
        SessionRepository::insert(&store, "abc", jane.id).await.unwrap();

        UserRepository::delete(&store, jane.id).await.unwrap();

        assert!(store.find_by_token(token.token).await.unwrap().is_none());
        assert!(store.find_user_id("abc").await.unwrap().is_none());
    }
}
