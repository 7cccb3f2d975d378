use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::AppError;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Rating {
    pub id: i64,
    pub rate: i64,
    pub created_at: DateTime<Utc>,
    pub foto_id: i64,
    pub user_id: i64,
}

pub fn validate_rate(rate: i64) -> Result<(), AppError> {
    if !(1..=5).contains(&rate) {
        return Err(AppError::validation_failed("Rate must be between 1 and 5"));
    }
    Ok(())
}
