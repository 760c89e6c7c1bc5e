use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("SQL error: {0}")]
    SqlError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),
}

impl DatabaseError {
    /// True when the error is a UNIQUE constraint violation
    pub fn is_unique_violation(&self) -> bool {
        match self {
            DatabaseError::SqlError(sqlx::Error::Database(db_err)) => db_err.is_unique_violation(),
            _ => false,
        }
    }
}
