use thiserror::Error;

use crate::database::DatabaseError;

#[derive(Debug, Error)]
pub enum LoginError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("An account with this email already exists")]
    EmailTaken,

    #[error("{0}")]
    Invalid(String),

    #[error("Password hashing failed: {0}")]
    PasswordHash(String),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

impl From<argon2::password_hash::Error> for LoginError {
    fn from(e: argon2::password_hash::Error) -> Self {
        LoginError::PasswordHash(e.to_string())
    }
}
