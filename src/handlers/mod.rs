// HTTP request handlers, one module per router prefix

pub mod auth;
pub mod comments;
pub mod fotos;
pub mod health;
pub mod media;
pub mod multipart;
pub mod ratings;
pub mod tags;
pub mod transformations;
pub mod users;

use serde::{Deserialize, Serialize};

use crate::models::errors::AppError;
use crate::models::messages;

/// `?skip=&limit=` query parameters
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Pagination {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

impl Pagination {
    /// Returns `(skip, limit)`; negative values are clamped
    pub fn resolve(&self, default_limit: i64) -> (i64, i64) {
        let skip = self.skip.unwrap_or(0).max(0);
        let limit = self.limit.unwrap_or(default_limit).max(0);
        (skip, limit)
    }
}

/// `{"message": ...}` body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Search endpoints answer 404 instead of an empty list
pub(crate) fn non_empty<T>(items: Vec<T>) -> Result<Vec<T>, AppError> {
    if items.is_empty() {
        Err(AppError::not_found(messages::NOT_FOUND))
    } else {
        Ok(items)
    }
}

/// Converts a repository `Option` into a 404
pub(crate) fn found<T>(item: Option<T>) -> Result<T, AppError> {
    item.ok_or_else(|| AppError::not_found(messages::NOT_FOUND))
}
