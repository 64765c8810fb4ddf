//! Indexes and constraints declared on the `users` table.
//!
//! Tables themselves are created by `migrations/`. Indexes and the birth
//! year check constraint depend on configuration, so they are rendered here
//! and applied on start.

use std::fmt;

use sqlx::PgPool;

use crate::user::BirthYearRange;

pub const USERS_TABLE: &str = "users";
pub const CHECK_BIRTH_YEAR_RANGE: &str = "check_birth_year_range";
pub const USERNAME_UNIQUE: &str = "users_username_key";
/// Default listing order: most recently joined first.
pub const USERS_ORDERING: &str = "date_joined DESC";

/// Index access method.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IndexMethod {
    /// Ordinary index, supports ordering and range queries.
    BTree,
    /// Equality lookups only.
    Hash,
}

impl fmt::Display for IndexMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexMethod::BTree => write!(f, "btree"),
            IndexMethod::Hash => write!(f, "hash"),
        }
    }
}

/// Single column index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Index {
    pub name: String,
    pub table: &'static str,
    pub column: &'static str,
    pub method: IndexMethod,
}

impl Index {
    fn new(table: &'static str, column: &'static str, method: IndexMethod) -> Self {
        let name = match method {
            IndexMethod::Hash => format!("{table}_{column}_hash_idx"),
            IndexMethod::BTree => format!("{table}_{column}_idx"),
        };

        Self {
            name,
            table,
            column,
            method,
        }
    }

    pub fn to_sql(&self) -> String {
        format!(
            "CREATE INDEX IF NOT EXISTS {} ON {} USING {} ({})",
            self.name, self.table, self.method, self.column
        )
    }
}

/// `CHECK` constraint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckConstraint {
    pub name: &'static str,
    pub table: &'static str,
    pub check: String,
}

impl CheckConstraint {
    /// Statements replacing any previous definition of the constraint.
    pub fn to_sql(&self) -> [String; 2] {
        [
            format!(
                "ALTER TABLE {} DROP CONSTRAINT IF EXISTS {}",
                self.table, self.name
            ),
            format!(
                "ALTER TABLE {} ADD CONSTRAINT {} CHECK ({})",
                self.table, self.name, self.check
            ),
        ]
    }
}

/// Metadata of a table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableSchema {
    pub table: &'static str,
    pub ordering: &'static str,
    pub indexes: Vec<Index>,
    pub constraints: Vec<CheckConstraint>,
}

impl TableSchema {
    /// Declarations of the `users` table.
    pub fn users(birth_year: &BirthYearRange) -> Self {
        Self {
            table: USERS_TABLE,
            ordering: USERS_ORDERING,
            indexes: vec![
                Index::new(USERS_TABLE, "first_name", IndexMethod::Hash),
                Index::new(USERS_TABLE, "last_name", IndexMethod::Hash),
                Index::new(USERS_TABLE, "middle_name", IndexMethod::Hash),
                Index::new(USERS_TABLE, "username", IndexMethod::BTree),
            ],
            constraints: vec![CheckConstraint {
                name: CHECK_BIRTH_YEAR_RANGE,
                table: USERS_TABLE,
                check: birth_year.sql_predicate("birth_year"),
            }],
        }
    }

    /// Every statement needed to install this schema, in order.
    pub fn statements(&self) -> Vec<String> {
        self.indexes
            .iter()
            .map(Index::to_sql)
            .chain(self.constraints.iter().flat_map(CheckConstraint::to_sql))
            .collect()
    }

    /// Install indexes and constraints in one transaction.
    pub async fn apply(&self, pool: &PgPool) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;

        for statement in self.statements() {
            sqlx::query(&statement).execute(&mut *tx).await?;
        }

        tx.commit().await?;

        tracing::info!(
            table = self.table,
            indexes = self.indexes.len(),
            constraints = self.constraints.len(),
            "schema applied"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_users_declarations() {
        let schema = TableSchema::users(&BirthYearRange::new(1900, 2010));

        let names: Vec<&str> = schema.indexes.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "users_first_name_hash_idx",
                "users_last_name_hash_idx",
                "users_middle_name_hash_idx",
                "users_username_idx",
            ]
        );
        assert_eq!(
            schema
                .indexes
                .iter()
                .filter(|i| i.method == IndexMethod::Hash)
                .count(),
            3
        );

        assert_eq!(schema.constraints.len(), 1);
        assert_eq!(schema.constraints[0].name, "check_birth_year_range");
        assert_eq!(schema.ordering, "date_joined DESC");
    }

    #[test]
    fn test_statements() {
        let schema = TableSchema::users(&BirthYearRange::new(1900, 2010));
        let statements = schema.statements();

        assert_eq!(statements.len(), 6);
        assert_eq!(
            statements[0],
            "CREATE INDEX IF NOT EXISTS users_first_name_hash_idx ON users USING hash (first_name)"
        );
        assert_eq!(
            statements[3],
            "CREATE INDEX IF NOT EXISTS users_username_idx ON users USING btree (username)"
        );
        assert_eq!(
            statements[5],
            "ALTER TABLE users ADD CONSTRAINT check_birth_year_range CHECK (birth_year > 1900 AND birth_year < 2010)"
        );
    }

    #[sqlx::test]
    #[ignore = "requires a PostgreSQL instance (DATABASE_URL)"]
    async fn test_apply_is_idempotent(pool: PgPool) {
        let schema = TableSchema::users(&BirthYearRange::new(1900, 2010));
        schema.apply(&pool).await.unwrap();
        schema.apply(&pool).await.unwrap();

        // Indexes not backing a primary key or unique constraint.
        let names: Vec<String> = sqlx::query_scalar(
            r#"SELECT i.relname::text FROM pg_index x
            JOIN pg_class i ON i.oid = x.indexrelid
            JOIN pg_class t ON t.oid = x.indrelid
            WHERE t.relname = 'users'
            AND NOT EXISTS (SELECT 1 FROM pg_constraint c WHERE c.conindid = x.indexrelid)
            ORDER BY 1"#,
        )
        .fetch_all(&pool)
        .await
        .unwrap();
        assert_eq!(
            names,
            vec![
                "users_first_name_hash_idx",
                "users_last_name_hash_idx",
                "users_middle_name_hash_idx",
                "users_username_idx",
            ]
        );
    }
}
