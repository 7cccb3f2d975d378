use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::AppError;

/// Tag title as embedded in foto responses and accepted on create/update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TagBase {
    pub title: String,
}

impl TagBase {
    pub fn validate(&self) -> Result<(), AppError> {
        let len = self.title.trim().chars().count();
        if len == 0 || len > 50 {
            return Err(AppError::validation_failed(
                "Tag title must be between 1 and 50 characters",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tag {
    pub id: i64,
    pub title: String,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_title_bounds() {
        assert!(TagBase { title: "sunset".into() }.validate().is_ok());
        assert!(TagBase { title: "   ".into() }.validate().is_err());
        assert!(TagBase { title: "t".repeat(51) }.validate().is_err());
    }
}
