use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Public user profile record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Profile {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// Profile registration form
#[derive(Debug, Clone, Deserialize)]
pub struct NewProfile {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
}

impl NewProfile {
    /// Checks the registration form, returning a user-facing message on failure
    pub fn validate(&self) -> crate::error::AppResult<()> {
        use crate::error::AppError;

        if self.full_name.trim().is_empty() {
            return Err(AppError::InvalidInput("Full name is required".to_string()));
        }

        let email = self.email.trim();
        let valid_email = match email.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
            }
            None => false,
        };
        if !valid_email {
            return Err(AppError::InvalidInput(
                "A valid email address is required".to_string(),
            ));
        }

        Ok(())
    }
}
