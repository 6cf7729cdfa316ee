//! User model. Users are never physically removed: `is_alive` is cleared instead.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// User record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct User {
    pub id: i32,
    /// Login - required and unique
    pub login: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// Cleared on deactivation
    pub is_alive: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Create user request
#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct CreateUser {
    #[validate(length(min = 3, message = "Login must be at least 3 characters"))]
    pub login: String,
    pub display_name: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Update user request; absent fields are left untouched
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate, ToSchema)]
pub struct UpdateUser {
    #[validate(length(min = 3, message = "Login must be at least 3 characters"))]
    pub login: Option<String>,
    pub display_name: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Row about to be inserted
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub login: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NewUser {
    pub fn from_request(data: &CreateUser, created_at: DateTime<Utc>) -> Self {
        Self {
            login: data.login.clone(),
            display_name: data.display_name.clone(),
            email: data.email.clone(),
            phone: data.phone.clone(),
            created_at,
        }
    }
}

impl UpdateUser {
    /// Field-by-field merge of the provided values onto `user`.
    /// `id`, `is_alive` and timestamps are never touched.
    pub fn merge_into(&self, user: &mut User) {
        if let Some(ref login) = self.login {
            user.login = login.clone();
        }
        if let Some(ref display_name) = self.display_name {
            user.display_name = Some(display_name.clone());
        }
        if let Some(ref email) = self.email {
            user.email = Some(email.clone());
        }
        if let Some(ref phone) = self.phone {
            user.phone = Some(phone.clone());
        }
    }
}
