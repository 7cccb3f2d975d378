use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::AppError;

#[derive(Debug, Clone, Deserialize)]
pub struct CommentBase {
    pub text: String,
}

impl CommentBase {
    pub fn validate(&self) -> Result<(), AppError> {
        let len = self.text.chars().count();
        if !(1..=500).contains(&len) {
            return Err(AppError::validation_failed(
                "Comment must be between 1 and 500 characters",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: i64,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub user_id: i64,
    pub foto_id: i64,
    pub update_status: bool,
}
