use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;

use super::DatabaseError;

const USER_COLUMNS: &str = "id, name, email, password_hash, created_at";

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

/// Account storage
pub struct UserRepo;

impl UserRepo {
    pub async fn create(pool: &SqlitePool, input: &NewUser) -> Result<User, DatabaseError> {
        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            name: input.name.clone(),
            email: input.email.clone(),
            password_hash: input.password_hash.clone(),
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO users (id, name, email, password_hash, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .execute(pool)
        .await?;

        Ok(user)
    }

    pub async fn find_by_id(pool: &SqlitePool, id: &str) -> Result<Option<User>, DatabaseError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
        Ok(sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?)
    }

    /// Emails are matched case-insensitively
    pub async fn find_by_email(
        pool: &SqlitePool,
        email: &str,
    ) -> Result<Option<User>, DatabaseError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ? COLLATE NOCASE");
        Ok(sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(pool)
            .await?)
    }

    pub async fn list(pool: &SqlitePool) -> Result<Vec<User>, DatabaseError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at ASC");
        Ok(sqlx::query_as::<_, User>(&query).fetch_all(pool).await?)
    }

    /// Remove an account and, through the foreign key, its watermark texts
    pub async fn delete_by_email(pool: &SqlitePool, email: &str) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM users WHERE email = ? COLLATE NOCASE")
            .bind(email)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
