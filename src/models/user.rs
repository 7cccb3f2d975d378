use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

use super::errors::AppError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
pub enum UserRole {
    #[serde(rename = "User")]
    User,
    #[serde(rename = "Moderator")]
    #[sqlx(rename = "moder")]
    Moderator,
    #[serde(rename = "Administrator")]
    Admin,
}

impl UserRole {
    pub fn label(&self) -> &'static str {
        match self {
            UserRole::User => "User",
            UserRole::Moderator => "Moderator",
            UserRole::Admin => "Administrator",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A row of the `users` table
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password: String,
    pub avatar: Option<String>,
    pub created_at: DateTime<Utc>,
    pub role: UserRole,
    pub refresh_token: Option<String>,
    pub is_active: bool,
    pub is_verify: bool,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// Signup payload
#[derive(Debug, Clone, Deserialize)]
pub struct UserModel {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub avatar: Option<String>,
}

impl UserModel {
    pub fn validate(&self) -> Result<(), AppError> {
        validate_username(&self.username)?;
        validate_email(&self.email)?;

        let len = self.password.chars().count();
        if !(6..=30).contains(&len) {
            return Err(AppError::validation_failed(
                "Password must be between 6 and 30 characters",
            ));
        }

        Ok(())
    }
}

/// OAuth2 password form: `username` carries the email
#[derive(Debug, Clone, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RequestEmail {
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RequestRole {
    pub email: String,
    pub role: UserRole,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDb {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub avatar: Option<String>,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserDb {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            avatar: user.avatar,
            role: user.role,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponseModel {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponseModel {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            is_active: user.is_active,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfileModel {
    pub username: String,
    pub email: String,
    pub avatar: Option<String>,
    pub foto_count: i64,
    pub comment_count: i64,
    pub rates_count: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub user: UserDb,
    pub detail: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenModel {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
}

impl TokenModel {
    pub fn bearer(access_token: String, refresh_token: String) -> Self {
        Self {
            access_token,
            refresh_token,
            token_type: "bearer".to_string(),
        }
    }
}

pub fn validate_username(username: &str) -> Result<(), AppError> {
    let len = username.chars().count();
    if !(5..=25).contains(&len) {
        return Err(AppError::validation_failed(
            "Username must be between 5 and 25 characters",
        ));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), AppError> {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    let re = EMAIL.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}$")
            .expect("email pattern is valid")
    });

    if email.len() > 250 || !re.is_match(email) {
        return Err(AppError::validation_failed("Value is not a valid email address"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signup(username: &str, email: &str, password: &str) -> UserModel {
        UserModel {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            avatar: None,
        }
    }

    #[test]
    fn test_signup_validation() {
        assert!(signup("testovik", "testovik@test.com", "123456789").validate().is_ok());
        assert!(signup("tiny", "testovik@test.com", "123456789").validate().is_err());
        assert!(signup("testovik", "not-an-email", "123456789").validate().is_err());
        assert!(signup("testovik", "testovik@test.com", "123").validate().is_err());
    }

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_string(&UserRole::Admin).unwrap(), "\"Administrator\"");
        let role: UserRole = serde_json::from_str("\"Moderator\"").unwrap();
        assert_eq!(role, UserRole::Moderator);
        assert_eq!(role.to_string(), "Moderator");
    }
}
