// Database module - SQLite storage for accounts and watermark texts
mod error;
mod users;
mod watermark_texts;

pub use error::DatabaseError;
pub use users::{NewUser, User, UserRepo};
pub use watermark_texts::{WatermarkText, WatermarkTextRepo};

use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
};
use std::path::Path;
use tracing::info;

/// Handle to the application database.
///
/// Opened once at startup and cloned into request state; clones share the
/// same connection pool.
#[derive(Clone, Debug)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn connect(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        info!("Database opened at {:?}", path);
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Write a consistent snapshot of the whole database to `destination`
    pub async fn backup_to(&self, destination: &Path) -> Result<(), DatabaseError> {
        let destination = destination.to_string_lossy().to_string();
        sqlx::query("VACUUM INTO ?")
            .bind(destination)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_connect_creates_missing_directories() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("data").join("app.db");

        let db = Database::connect(&path).await.unwrap();
        assert!(path.exists());

        let tables: Vec<(String,)> =
            sqlx::query_as("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
                .fetch_all(db.pool())
                .await
                .unwrap();
        let names: Vec<&str> = tables.iter().map(|(name,)| name.as_str()).collect();
        assert!(names.contains(&"users"));
        assert!(names.contains(&"watermark_text"));

        db.close().await;
    }

    #[tokio::test]
    async fn test_reopen_keeps_data() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("app.db");

        let db = Database::connect(&path).await.unwrap();
        let user = UserRepo::create(
            db.pool(),
            &NewUser {
                name: "Ada".to_string(),
                email: "ada@example.com".to_string(),
                password_hash: "hash".to_string(),
            },
        )
        .await
        .unwrap();
        db.close().await;

        let db = Database::connect(&path).await.unwrap();
        let found = UserRepo::find_by_id(db.pool(), &user.id).await.unwrap();
        assert_eq!(found.map(|u| u.email), Some("ada@example.com".to_string()));
        db.close().await;
    }

    #[tokio::test]
    async fn test_backup_to_writes_a_usable_copy() {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::connect(&temp_dir.path().join("app.db")).await.unwrap();
        let user = UserRepo::create(
            db.pool(),
            &NewUser {
                name: "Ada".to_string(),
                email: "ada@example.com".to_string(),
                password_hash: "hash".to_string(),
            },
        )
        .await
        .unwrap();
        WatermarkTextRepo::create(db.pool(), &user.id, "Atelier Ada")
            .await
            .unwrap();

        let backup_path = temp_dir.path().join("backup.db");
        db.backup_to(&backup_path).await.unwrap();
        assert!(backup_path.exists());

        let copy = Database::connect(&backup_path).await.unwrap();
        let texts = WatermarkTextRepo::list_for_owner(copy.pool(), &user.id)
            .await
            .unwrap();
        assert_eq!(texts.len(), 1);
        assert_eq!(texts[0].text, "Atelier Ada");

        copy.close().await;
        db.close().await;
    }
}
