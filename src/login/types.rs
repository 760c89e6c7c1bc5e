use serde::{Deserialize, Serialize};

use crate::database::User;

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl SignupRequest {
    /// Trimmed copy with a lowercased email, or the first validation problem
    pub fn normalized(&self) -> Result<SignupRequest, String> {
        let name = self.name.trim();
        let email = self.email.trim().to_lowercase();

        if name.is_empty() {
            return Err("Name is required".to_string());
        }
        if !is_plausible_email(&email) {
            return Err("A valid email address is required".to_string());
        }
        super::password::validate_password_strength(&self.password)?;

        Ok(SignupRequest {
            name: name.to_string(),
            email,
            password: self.password.clone(),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Public view of an account
#[derive(Debug, Clone, Serialize)]
pub struct SessionUser {
    pub id: String,
    pub name: String,
    pub email: String,
}

impl From<&User> for SessionUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user: SessionUser,
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    }
}
