use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;

use super::DatabaseError;

const TEXT_COLUMNS: &str = "id, user_id, text, created_at";

/// A reusable watermark string owned by one account
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct WatermarkText {
    pub id: String,
    #[serde(skip_serializing)]
    pub user_id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Watermark text storage. Every query is scoped to the owning account.
pub struct WatermarkTextRepo;

impl WatermarkTextRepo {
    /// All texts owned by `user_id`, newest first
    pub async fn list_for_owner(
        pool: &SqlitePool,
        user_id: &str,
    ) -> Result<Vec<WatermarkText>, DatabaseError> {
        let query = format!(
            "SELECT {TEXT_COLUMNS} FROM watermark_text
             WHERE user_id = ?
             ORDER BY created_at DESC, rowid DESC"
        );
        Ok(sqlx::query_as::<_, WatermarkText>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await?)
    }

    /// Insert a text. Callers are expected to have trimmed and checked it.
    pub async fn create(
        pool: &SqlitePool,
        user_id: &str,
        text: &str,
    ) -> Result<WatermarkText, DatabaseError> {
        let row = WatermarkText {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            text: text.to_string(),
            created_at: Utc::now(),
        };

        sqlx::query("INSERT INTO watermark_text (id, user_id, text, created_at) VALUES (?, ?, ?, ?)")
            .bind(&row.id)
            .bind(&row.user_id)
            .bind(&row.text)
            .bind(row.created_at)
            .execute(pool)
            .await?;

        Ok(row)
    }

    /// Look a text up by id, only if `user_id` owns it
    pub async fn find_for_owner(
        pool: &SqlitePool,
        id: &str,
        user_id: &str,
    ) -> Result<Option<WatermarkText>, DatabaseError> {
        let query = format!("SELECT {TEXT_COLUMNS} FROM watermark_text WHERE id = ? AND user_id = ?");
        Ok(sqlx::query_as::<_, WatermarkText>(&query)
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await?)
    }

    /// Returns false when no text with that id belongs to `user_id`
    pub async fn delete_for_owner(
        pool: &SqlitePool,
        id: &str,
        user_id: &str,
    ) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM watermark_text WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
